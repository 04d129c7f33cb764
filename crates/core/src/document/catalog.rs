//! Document - the consumer surface over the cross-reference index.
//!
//! Opening a document:
//! 1. read the `%PDF-x.y` header
//! 2. build the [`XRefIndex`] from the declared chain (or a linear scan)
//! 3. set up decryption from `/Encrypt`
//! 4. pick the catalog from the newest trailer whose `/Root` resolves

use super::builder::DocumentBuilder;
use super::health::{HealthReport, IssueKind};
use super::index::XRefIndex;
use super::page::PageIter;
use super::xref::Trailer;
use crate::codec::StreamDecoder;
use crate::config::ParseOptions;
use crate::cursor::{ByteCursor, ByteSource};
use crate::document::security::Decryptor;
use crate::error::{PdfError, Result};
use crate::model::{Dictionary, IndirectObject, ObjRef, Object, Stream};
use bytes::Bytes;
use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;

/// How far into the file the `%PDF-` header may start.
const HEADER_SEARCH: usize = 1024;

/// An opened document.
///
/// Single-threaded: the cursor sits behind a `RefCell` and every call that
/// reads the file borrows it for the duration of the call.
pub struct Document {
    cursor: RefCell<ByteCursor>,
    index: XRefIndex,
    trailer: Trailer,
    catalog: Dictionary,
    info: Option<Dictionary>,
    version: Option<String>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("version", &self.version)
            .field("index", &self.index)
            .field("root", &self.trailer.root)
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Open with default options from any seekable source.
    pub fn open(source: impl ByteSource + 'static) -> Result<Self> {
        DocumentBuilder::new().open(source)
    }

    /// Open in-memory bytes with default options.
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        DocumentBuilder::new().from_bytes(data)
    }

    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        DocumentBuilder::new().open_path(path)
    }

    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    pub(crate) fn load(
        mut cursor: ByteCursor,
        options: ParseOptions,
        decoder: Box<dyn StreamDecoder>,
        decryptor: Option<Box<dyn Decryptor>>,
    ) -> Result<Self> {
        let health = HealthReport::new();
        let version = read_header(&mut cursor, &health)?;
        let strict = options.strict;

        let index = XRefIndex::build(&mut cursor, options, health, decoder, decryptor)?;
        index.setup_encryption(&mut cursor)?;
        if index.is_fallback() {
            index.expand_object_streams(&mut cursor);
        }

        let found = match find_catalog(&index, &mut cursor) {
            Some(found) => Some(found),
            None if !strict && !index.is_fallback() => {
                index.extend_by_scan(&mut cursor, None)?;
                find_catalog(&index, &mut cursor)
            }
            None => None,
        };
        let Some(catalog) = found else {
            return Err(PdfError::MissingCatalog);
        };

        let trailers = index.trailers();
        let Some(trailer) = trailers.first().cloned() else {
            return Err(PdfError::MissingCatalog);
        };
        let info = select_info(&index, &mut cursor, &trailers);

        tracing::debug!(
            version = version.as_deref().unwrap_or("?"),
            objects = index.object_ids().len(),
            revisions = trailers.len(),
            fallback = index.is_fallback(),
            "document opened"
        );
        Ok(Self {
            cursor: RefCell::new(cursor),
            index,
            trailer,
            catalog,
            info,
            version,
        })
    }

    /// The document catalog (`/Root`).
    pub fn catalog(&self) -> &Dictionary {
        &self.catalog
    }

    /// `/Info` of the newest revision that has one.
    pub fn info(&self) -> Option<&Dictionary> {
        self.info.as_ref()
    }

    /// Newest trailer.
    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    /// All trailers, newest first.
    pub fn trailers(&self) -> Vec<Trailer> {
        self.index.trailers()
    }

    /// Snapshot of the recoverable issues recorded so far.
    pub fn health_report(&self) -> HealthReport {
        self.index.health().clone()
    }

    pub(crate) fn health(&self) -> &HealthReport {
        self.index.health()
    }

    pub fn options(&self) -> &ParseOptions {
        self.index.options()
    }

    /// Version from the `%PDF-x.y` header.
    pub fn header_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// True once any part of the index came from a linear scan.
    pub fn is_fallback(&self) -> bool {
        self.index.is_fallback()
    }

    pub fn is_encrypted(&self) -> bool {
        self.index.encryption().is_some()
    }

    pub fn object_ids(&self) -> Vec<ObjRef> {
        self.index.object_ids()
    }

    /// Materialize `obj_num gen_num R`.
    pub fn resolve(&self, obj_num: u32, gen_num: u16) -> Result<Arc<IndirectObject>> {
        let mut cursor = self.cursor.borrow_mut();
        self.index.resolve_with(&mut cursor, obj_num, gen_num)
    }

    /// Follow references until a direct value. A reference to a free or
    /// missing object reads as null.
    pub fn resolve_object(&self, obj: &Object) -> Result<Object> {
        let mut cursor = self.cursor.borrow_mut();
        match self.index.resolve_value(&mut cursor, obj) {
            Err(PdfError::ObjectNotFound(obj_num, gen_num)) => {
                tracing::debug!(obj_num, gen_num, "reference to missing object reads as null");
                Ok(Object::Null)
            }
            other => other,
        }
    }

    /// Resolve `obj` and require a dictionary (or a stream's dictionary).
    pub fn resolve_dict(&self, obj: &Object) -> Result<Dictionary> {
        match self.resolve_object(obj)? {
            Object::Dict(dict) => Ok(dict),
            Object::Stream(stream) => Ok(stream.dict),
            other => Err(PdfError::TypeError {
                expected: "dict",
                got: other.type_name(),
            }),
        }
    }

    /// Stream payload, decrypted if needed, then decoded through every filter.
    pub fn stream_data(&self, stream: &Stream) -> Result<Bytes> {
        let mut cursor = self.cursor.borrow_mut();
        self.index.decoded_stream(&mut cursor, stream).map(Bytes::from)
    }

    /// Stream payload as stored in the file.
    pub fn raw_stream_data(&self, stream: &Stream) -> Result<Bytes> {
        let mut cursor = self.cursor.borrow_mut();
        self.index.raw_stream(&mut cursor, stream)
    }

    /// `/Count` of the root page-tree node.
    pub fn page_count(&self) -> Option<i64> {
        let pages = self.catalog.get("Pages")?;
        let dict = self.resolve_dict(pages).ok()?;
        let count = dict.get("Count")?;
        self.resolve_object(count).ok()?.as_int().ok()
    }

    /// Lazily walk the page tree.
    pub fn iterate_pages(&self) -> PageIter<'_> {
        PageIter::new(self)
    }
}

/// Find `%PDF-x.y` in the first KiB and return `x.y`.
fn read_header(cursor: &mut ByteCursor, health: &HealthReport) -> Result<Option<String>> {
    let head = cursor.read_at(0, HEADER_SEARCH)?;
    let Some(at) = crate::cursor::find_subslice(&head, b"%PDF-") else {
        health.record(IssueKind::MissingHeader, Some(0), "no %PDF- header");
        return Ok(None);
    };
    let rest = &head[at + 5..];
    let end = rest
        .iter()
        .position(|&b| !(b.is_ascii_digit() || b == b'.'))
        .unwrap_or(rest.len());
    if at > 0 {
        tracing::debug!(offset = at, "header does not start the file");
    }
    Ok(Some(String::from_utf8_lossy(&rest[..end]).into_owned()))
}

/// Newest trailer whose `/Root` resolves to a dictionary.
fn find_catalog(index: &XRefIndex, cursor: &mut ByteCursor) -> Option<Dictionary> {
    for trailer in index.trailers() {
        let Some(root) = trailer.root else { continue };
        match index.resolve_value(cursor, &Object::Ref(root)) {
            Ok(Object::Dict(dict)) => return Some(dict),
            Ok(other) => {
                tracing::debug!(%root, got = other.type_name(), "/Root is not a dictionary");
            }
            Err(e) => tracing::debug!(%root, error = %e, "/Root does not resolve"),
        }
    }
    None
}

/// `/Info` of the newest revision that has one. Distinct `/Info` entries
/// across revisions are recorded.
fn select_info(
    index: &XRefIndex,
    cursor: &mut ByteCursor,
    trailers: &[Trailer],
) -> Option<Dictionary> {
    let mut seen: Vec<&Object> = Vec::new();
    for info in trailers.iter().filter_map(|t| t.info.as_ref()) {
        if !seen.contains(&info) {
            seen.push(info);
        }
    }
    if seen.len() > 1 {
        index.health().record(
            IssueKind::DuplicateInfo,
            None,
            format!("{} distinct /Info entries, using the newest", seen.len()),
        );
    }
    let newest = seen.first()?;
    match index.resolve_value(cursor, newest) {
        Ok(Object::Dict(dict)) => Some(dict),
        _ => None,
    }
}
