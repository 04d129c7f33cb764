//! Parse options threaded into every component.
//!
//! There is no global strict flag: the cursor, lexer, parser, index and page
//! walker each receive these options (or the fields they need) when built.

/// Order in which a hybrid-reference revision merges its `/XRefStm` section
/// relative to the older revisions reached through `/Prev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HybridPrecedence {
    /// Merge `/XRefStm` of a revision before following its `/Prev`.
    #[default]
    XRefStmBeforePrev,
    /// Walk the whole `/Prev` chain first, then merge every `/XRefStm`.
    PrevBeforeXRefStm,
}

/// Options controlling how tolerant ingestion is.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    /// Turn recoverable anomalies (wrong `/Length`, missing `%%EOF`,
    /// mismatched collection close, bad dictionary key, repositioned xref
    /// offset) into fatal errors.
    pub strict: bool,

    /// Cache materialized indirect objects for the lifetime of the document.
    /// When disabled every access re-parses from the cursor.
    pub caching: bool,

    /// Upper bound for any forward recovery scan, in bytes. `None` means the
    /// scan may run to end of file.
    pub max_scan_distance: Option<u64>,

    /// How far past an xref offset to look for the expected `N G obj` header.
    pub object_search_window: u64,

    /// Merge order for hybrid-reference files.
    pub hybrid_precedence: HybridPrecedence,

    /// Size of the cursor's read buffer.
    pub buffer_size: usize,

    /// Bound on nested resolution (object stream containers, indirect
    /// stream lengths, reference chains).
    pub max_resolve_depth: usize,

    /// Deepest allowed nesting of arrays and dictionaries (the enclosing
    /// indirect object counts as one level).
    pub max_nesting_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict: false,
            caching: true,
            max_scan_distance: None,
            object_search_window: 1024,
            hybrid_precedence: HybridPrecedence::default(),
            buffer_size: 8192,
            max_resolve_depth: 64,
            max_nesting_depth: 256,
        }
    }
}

impl ParseOptions {
    /// Options that reject non-conforming input instead of repairing it.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Clamp a desired scan length to `max_scan_distance`.
    pub fn scan_limit(&self, wanted: u64) -> u64 {
        match self.max_scan_distance {
            Some(limit) => wanted.min(limit),
            None => wanted,
        }
    }

    /// Clamped scan length, plus whether `max_scan_distance` cut it short.
    pub fn bounded_scan(&self, wanted: u64) -> (u64, bool) {
        let limit = self.scan_limit(wanted);
        (limit, limit < wanted)
    }
}
