//! Health report: the ordered log of recoverable anomalies.
//!
//! Issues are collected, never thrown. Each one is also emitted as a
//! `tracing` warning when it is recorded.

use std::cell::RefCell;
use std::fmt;

/// Category of a recoverable anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// `%PDF-x.y` header missing or unreadable
    MissingHeader,
    /// No `%%EOF` after the last `startxref`
    MissingEof,
    /// `startxref` did not point at an xref section; a nearby one was used
    XRefOffsetAdjusted,
    /// A classic subsection declared start 1 but carried the free-list head
    XRefSubsectionRebased,
    /// An older revision could not be read; the walk stopped there
    BrokenRevision,
    /// The declared xref chain was unusable and the file was scanned
    FallbackScan,
    /// An xref offset did not land on the expected object header
    ObjectHeaderAdjusted,
    /// `/Length` disagreed with the position of `endstream`
    StreamLengthCorrected,
    /// `]` or `>>` closed the wrong collection
    MismatchedClose,
    /// A dictionary key that is not a name
    InvalidDictKey,
    /// Keyword with no meaning in its context
    UnexpectedKeyword,
    /// Collection or indirect object still open at a boundary
    UnterminatedObject,
    /// `#` in a name not followed by two hex digits
    InvalidNameEscape,
    /// Non-hex byte inside `<...>`; the byte was dropped
    InvalidHexDigit,
    /// Arrays or dictionaries nested past the limit; the value became null
    NestingTooDeep,
    /// More than one revision carried `/Info`
    DuplicateInfo,
    /// Catalog `/Count` differs from the number of leaves found
    PageCountMismatch,
    /// Page with no `/MediaBox` on itself or any ancestor
    MissingMediaBox,
    /// Page-tree node reached more than once
    PageTreeCycle,
    /// `/Encrypt` present but no decryptor supplied
    EncryptedWithoutDecryptor,
    /// A recovery scan stopped at `max_scan_distance` without finding its target
    ScanLimitReached,
}

impl IssueKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingHeader => "missing-header",
            Self::MissingEof => "missing-eof",
            Self::XRefOffsetAdjusted => "xref-offset-adjusted",
            Self::XRefSubsectionRebased => "xref-subsection-rebased",
            Self::BrokenRevision => "broken-revision",
            Self::FallbackScan => "fallback-scan",
            Self::ObjectHeaderAdjusted => "object-header-adjusted",
            Self::StreamLengthCorrected => "stream-length-corrected",
            Self::MismatchedClose => "mismatched-close",
            Self::InvalidDictKey => "invalid-dict-key",
            Self::UnexpectedKeyword => "unexpected-keyword",
            Self::UnterminatedObject => "unterminated-object",
            Self::InvalidNameEscape => "invalid-name-escape",
            Self::InvalidHexDigit => "invalid-hex-digit",
            Self::NestingTooDeep => "nesting-too-deep",
            Self::DuplicateInfo => "duplicate-info",
            Self::PageCountMismatch => "page-count-mismatch",
            Self::MissingMediaBox => "missing-mediabox",
            Self::PageTreeCycle => "page-tree-cycle",
            Self::EncryptedWithoutDecryptor => "encrypted-without-decryptor",
            Self::ScanLimitReached => "scan-limit-reached",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded anomaly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthIssue {
    pub kind: IssueKind,
    /// Byte offset the issue was detected at, when there is one.
    pub offset: Option<u64>,
    pub message: String,
}

impl fmt::Display for HealthIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "[{}] @{}: {}", self.kind, offset, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Append-only issue log shared by every component of one document.
#[derive(Debug, Default)]
pub struct HealthReport {
    issues: RefCell<Vec<HealthIssue>>,
}

impl Clone for HealthReport {
    fn clone(&self) -> Self {
        Self {
            issues: RefCell::new(self.issues.borrow().clone()),
        }
    }
}

impl HealthReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an issue and log it.
    pub fn record(&self, kind: IssueKind, offset: Option<u64>, message: impl Into<String>) {
        let issue = HealthIssue {
            kind,
            offset,
            message: message.into(),
        };
        log_issue(&issue);
        self.issues.borrow_mut().push(issue);
    }

    /// Snapshot of the issues in recording order.
    pub fn issues(&self) -> Vec<HealthIssue> {
        self.issues.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.issues.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.borrow().is_empty()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.borrow().iter().filter(|i| i.kind == kind).count()
    }

    pub fn contains(&self, kind: IssueKind) -> bool {
        self.count(kind) > 0
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let issues = self.issues.borrow();
        if issues.is_empty() {
            return writeln!(f, "no issues");
        }
        for issue in issues.iter() {
            writeln!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Log an issue that has no report to land in.
pub(crate) fn log_issue(issue: &HealthIssue) {
    tracing::warn!(
        kind = issue.kind.as_str(),
        offset = issue.offset,
        "{}",
        issue.message
    );
}
