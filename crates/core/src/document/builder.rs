//! Builder for opening documents with non-default options or collaborators.
//!
//! # Example
//! ```ignore
//! use strata_core::Document;
//!
//! let doc = Document::builder()
//!     .strict(true)
//!     .max_scan_distance(Some(1 << 20))
//!     .open_path("report.pdf")?;
//! ```

use super::catalog::Document;
use super::security::Decryptor;
use crate::codec::{StandardDecoder, StreamDecoder};
use crate::config::{HybridPrecedence, ParseOptions};
use crate::cursor::{ByteCursor, ByteSource};
use crate::error::Result;
use bytes::Bytes;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Options plus the decode and decrypt collaborators.
pub struct DocumentBuilder {
    options: ParseOptions,
    decoder: Box<dyn StreamDecoder>,
    decryptor: Option<Box<dyn Decryptor>>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            options: ParseOptions::default(),
            decoder: Box::new(StandardDecoder),
            decryptor: None,
        }
    }

    /// Replace all options at once.
    pub fn options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn caching(mut self, caching: bool) -> Self {
        self.options.caching = caching;
        self
    }

    pub fn max_scan_distance(mut self, limit: Option<u64>) -> Self {
        self.options.max_scan_distance = limit;
        self
    }

    pub fn hybrid_precedence(mut self, precedence: HybridPrecedence) -> Self {
        self.options.hybrid_precedence = precedence;
        self
    }

    /// Use `decoder` instead of [`StandardDecoder`].
    pub fn decoder(mut self, decoder: impl StreamDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// Decrypt strings and streams of encrypted documents with `decryptor`.
    pub fn decryptor(mut self, decryptor: impl Decryptor + 'static) -> Self {
        self.decryptor = Some(Box::new(decryptor));
        self
    }

    /// Open from a seekable source, read through a buffer of
    /// `options.buffer_size` bytes.
    pub fn open(self, source: impl ByteSource + 'static) -> Result<Document> {
        let cursor = ByteCursor::with_buffer_size(source, self.options.buffer_size)?;
        self.load(cursor)
    }

    pub fn from_bytes(self, data: impl Into<Bytes>) -> Result<Document> {
        self.load(ByteCursor::from_bytes(data))
    }

    pub fn open_path(self, path: impl AsRef<Path>) -> Result<Document> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "opening document");
        self.open(File::open(path)?)
    }

    /// Open a memory-mapped file without copying it.
    pub fn open_mmap(self, mmap: Mmap) -> Result<Document> {
        self.from_bytes(Bytes::from_owner(mmap))
    }

    fn load(self, cursor: ByteCursor) -> Result<Document> {
        Document::load(cursor, self.options, self.decoder, self.decryptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_reach_options() {
        let builder = DocumentBuilder::new()
            .strict(true)
            .caching(false)
            .max_scan_distance(Some(4096))
            .hybrid_precedence(HybridPrecedence::PrevBeforeXRefStm);
        assert!(builder.options.strict);
        assert!(!builder.options.caching);
        assert_eq!(builder.options.max_scan_distance, Some(4096));
        assert_eq!(
            builder.options.hybrid_precedence,
            HybridPrecedence::PrevBeforeXRefStm
        );
        assert!(builder.decryptor.is_none());
    }

    #[test]
    fn garbage_has_no_catalog() {
        let err = DocumentBuilder::new()
            .from_bytes(&b"not a pdf at all"[..])
            .unwrap_err();
        assert!(matches!(err, crate::error::PdfError::MissingCatalog));
    }
}
