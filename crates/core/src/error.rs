//! Error types for the strata ingestion core.
//!
//! Only fatal conditions live here. Recoverable anomalies are collected in
//! [`crate::document::HealthReport`] instead of being returned.

use thiserror::Error;

/// Primary error type for PDF ingestion.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("stream exhausted at offset {offset}: {msg}")]
    StreamExhausted { offset: u64, msg: String },

    #[error("invalid hex escape at offset {offset}")]
    InvalidHexToken { offset: u64 },

    #[error("collection closed with {got} at offset {offset}, but {expected} is open")]
    MismatchedCollectionClose {
        offset: u64,
        expected: &'static str,
        got: &'static str,
    },

    #[error("invalid dictionary key at offset {offset}: {msg}")]
    InvalidDictionaryKey { offset: u64, msg: String },

    #[error("unexpected keyword {keyword:?} at offset {offset}")]
    UnexpectedKeyword { offset: u64, keyword: String },

    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("document has no catalog (/Root) on any recovery path")]
    MissingCatalog,

    #[error("xref entry for {obj_num} {gen_num} R at offset {offset} does not hold that object")]
    XRefIntegrityError {
        obj_num: u32,
        gen_num: u16,
        offset: u64,
    },

    #[error("stream at offset {offset} declares /Length {declared}, but endstream is not there")]
    StreamLength { offset: u64, declared: u64 },

    #[error("no %%EOF marker after startxref")]
    MissingEof,

    #[error("xref offset {declared} repositioned to {actual}")]
    XRefOffsetMismatch { declared: u64, actual: u64 },

    #[error("no valid xref found")]
    NoValidXRef,

    #[error("object {0} {1} R not found")]
    ObjectNotFound(u32, u16),

    #[error("circular reference detected for {0} {1} R")]
    CircularReference(u32, u16),

    #[error("resolution nested deeper than {0} levels")]
    ResolveDepthExceeded(usize),

    #[error("collections nested deeper than {limit} levels at offset {offset}")]
    NestingTooDeep { offset: u64, limit: usize },

    #[error("forward scan from offset {offset} exceeded {limit} bytes")]
    ScanLimitExceeded { offset: u64, limit: u64 },

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("PDF syntax error: {0}")]
    SyntaxError(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("decrypt error: {0}")]
    DecryptError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
