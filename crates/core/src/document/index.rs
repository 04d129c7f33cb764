//! The unified cross-reference index and lazy object resolution.

use super::health::{HealthReport, IssueKind};
use super::security::{Decryptor, EncryptionContext, decrypt_strings};
use super::xref::{ScanMarker, ScanResult, Trailer, XRefLocation, XRefReader, XRefRow};
use crate::codec::{StreamDecoder, decode_chain};
use crate::config::ParseOptions;
use crate::cursor::ByteCursor;
use crate::error::{PdfError, Result};
use crate::model::objects::dict_int;
use crate::model::{Dictionary, IndirectObject, ObjRef, Object, Stream};
use crate::parser::{Item, Keyword, Lexer, PdfParser, Resolver, Spanned, Token};
use bytes::Bytes;
use regex::bytes::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::{Cell, RefCell};
use std::sync::{Arc, LazyLock};

static OBJECT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)(\d+)\s+(\d+)\s+obj\b").expect("header pattern is valid"));

type Key = (u32, u16);

/// Decoded payload of an object stream (`/Type /ObjStm`).
#[derive(Debug)]
pub struct ObjectStreamPayload {
    pub data: Bytes,
    /// `(obj_num, offset)` pairs from the stream header, offsets relative to
    /// `first`.
    pub members: Vec<(u32, u64)>,
    pub first: u64,
}

/// Removes its key from the resolving set on every exit path.
struct ResolveGuard<'a> {
    resolving: &'a RefCell<FxHashSet<Key>>,
    key: Key,
}

impl Drop for ResolveGuard<'_> {
    fn drop(&mut self) {
        self.resolving.borrow_mut().remove(&self.key);
    }
}

/// Object locations merged from every revision, plus the resolution caches.
///
/// All methods that read the file take the cursor explicitly and work inside
/// a [`ByteCursor::window`], so the caller's position survives resolution.
pub struct XRefIndex {
    options: ParseOptions,
    health: HealthReport,
    decoder: Box<dyn StreamDecoder>,
    decryptor: Option<Box<dyn Decryptor>>,
    encryption: RefCell<Option<EncryptionContext>>,
    rows: RefCell<FxHashMap<Key, XRefRow>>,
    /// Newest first
    trailers: RefCell<Vec<Trailer>>,
    /// Set once the rows come from (or were extended by) a linear scan.
    fallback: Cell<bool>,
    /// Object streams found by a scan and not yet expanded into rows.
    pending_containers: RefCell<Vec<u32>>,
    objects: RefCell<FxHashMap<Key, Arc<IndirectObject>>>,
    object_streams: RefCell<FxHashMap<u32, Arc<ObjectStreamPayload>>>,
    resolving: RefCell<FxHashSet<Key>>,
}

impl std::fmt::Debug for XRefIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XRefIndex")
            .field("rows", &self.rows.borrow().len())
            .field("trailers", &self.trailers.borrow().len())
            .field("fallback", &self.fallback.get())
            .finish_non_exhaustive()
    }
}

impl XRefIndex {
    /// Build the index from the declared xref chain, or from a linear scan
    /// when the chain is unusable and `options.strict` is off.
    pub fn build(
        cursor: &mut ByteCursor,
        options: ParseOptions,
        health: HealthReport,
        decoder: Box<dyn StreamDecoder>,
        decryptor: Option<Box<dyn Decryptor>>,
    ) -> Result<Self> {
        let index = Self {
            options,
            health,
            decoder,
            decryptor,
            encryption: RefCell::new(None),
            rows: RefCell::new(FxHashMap::default()),
            trailers: RefCell::new(Vec::new()),
            fallback: Cell::new(false),
            pending_containers: RefCell::new(Vec::new()),
            objects: RefCell::new(FxHashMap::default()),
            object_streams: RefCell::new(FxHashMap::default()),
            resolving: RefCell::new(FxHashSet::default()),
        };

        let walked = index.reader().walk(cursor);
        match walked {
            Ok(walk) => {
                tracing::debug!(
                    rows = walk.rows.len(),
                    revisions = walk.trailers.len(),
                    "xref chain loaded"
                );
                *index.rows.borrow_mut() = walk.rows;
                *index.trailers.borrow_mut() = walk.trailers;
            }
            Err(e) if index.options.strict => return Err(e),
            Err(e) => {
                index.health.record(
                    IssueKind::FallbackScan,
                    None,
                    format!("declared xref unusable ({e}), scanning file"),
                );
                index.rebuild_from_scan(cursor)?;
            }
        }
        Ok(index)
    }

    fn reader(&self) -> XRefReader<'_> {
        XRefReader::new(&self.options, &self.health, self.decoder.as_ref())
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn health(&self) -> &HealthReport {
        &self.health
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.get()
    }

    /// Trailers, newest first. After a scan these are the scanned `trailer`
    /// dictionaries and xref-stream dictionaries, latest in the file first.
    pub fn trailers(&self) -> Vec<Trailer> {
        self.trailers.borrow().clone()
    }

    pub fn row(&self, obj_num: u32, gen_num: u16) -> Option<XRefRow> {
        self.rows.borrow().get(&(obj_num, gen_num)).copied()
    }

    /// In-use object references, sorted.
    pub fn object_ids(&self) -> Vec<ObjRef> {
        let mut ids: Vec<ObjRef> = self
            .rows
            .borrow()
            .values()
            .filter(|row| row.location != XRefLocation::Free)
            .map(|row| ObjRef::new(row.obj_num, row.gen_num))
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn encryption(&self) -> Option<EncryptionContext> {
        self.encryption.borrow().clone()
    }

    /// Replace the whole index with the result of a linear scan.
    fn rebuild_from_scan(&self, cursor: &mut ByteCursor) -> Result<()> {
        self.fallback.set(true);
        let scan = self.reader().scan(cursor)?;

        let mut rows = FxHashMap::default();
        for obj in &scan.objects {
            // Later definitions in the file win
            rows.insert(
                (obj.obj_num, obj.gen_num),
                XRefRow {
                    obj_num: obj.obj_num,
                    gen_num: obj.gen_num,
                    location: XRefLocation::Direct(obj.offset),
                },
            );
        }
        let trailers = self.scanned_trailers(cursor, &scan);
        *self.rows.borrow_mut() = rows;
        *self.trailers.borrow_mut() = trailers;
        self.pending_containers.borrow_mut().extend(
            scan.objects_marked(ScanMarker::ObjStm)
                .into_iter()
                .map(|o| o.obj_num),
        );
        self.clear_caches();
        Ok(())
    }

    /// Add scanned rows to a chain-built index once. The row for `failed`
    /// is replaced; every other key only fills a gap.
    pub(crate) fn extend_by_scan(&self, cursor: &mut ByteCursor, failed: Option<Key>) -> Result<()> {
        if self.fallback.replace(true) {
            return Ok(());
        }
        let message = match failed {
            Some((n, g)) => format!("{n} {g} R unresolvable from declared xref, scanning file"),
            None => "declared xref has no usable catalog, scanning file".to_string(),
        };
        self.health.record(IssueKind::FallbackScan, None, message);
        let scan = self.reader().scan(cursor)?;

        let mut scanned = FxHashMap::default();
        for obj in &scan.objects {
            scanned.insert((obj.obj_num, obj.gen_num), obj.offset);
        }
        {
            let mut rows = self.rows.borrow_mut();
            for ((obj_num, gen_num), offset) in scanned {
                let row = XRefRow {
                    obj_num,
                    gen_num,
                    location: XRefLocation::Direct(offset),
                };
                if Some((obj_num, gen_num)) == failed {
                    rows.insert((obj_num, gen_num), row);
                } else {
                    rows.entry((obj_num, gen_num)).or_insert(row);
                }
            }
        }

        let mut trailers = self.scanned_trailers(cursor, &scan);
        {
            let mut known = self.trailers.borrow_mut();
            trailers.retain(|t| !known.iter().any(|k| k.offset == t.offset));
            known.extend(trailers);
        }

        self.pending_containers.borrow_mut().extend(
            scan.objects_marked(ScanMarker::ObjStm)
                .into_iter()
                .map(|o| o.obj_num),
        );
        self.expand_object_streams(cursor);
        Ok(())
    }

    /// Trailer candidates found by a scan, latest in the file first. When none
    /// names a root, the last `/Type /Catalog` object becomes one.
    fn scanned_trailers(&self, cursor: &mut ByteCursor, scan: &ScanResult) -> Vec<Trailer> {
        let reader = self.reader();
        let mut trailers: Vec<Trailer> = scan
            .trailers
            .iter()
            .filter_map(|&offset| match reader.read_trailer_at(cursor, offset) {
                Ok(t) => Some(t),
                Err(e) => {
                    tracing::debug!(offset, error = %e, "skipping unreadable scanned trailer");
                    None
                }
            })
            .collect();

        for obj in scan.objects_marked(ScanMarker::XRef) {
            if let Some(dict) = self.dict_at(cursor, obj.offset) {
                trailers.push(Trailer::from_dict(dict, obj.offset));
            }
        }
        trailers.sort_by(|a, b| b.offset.cmp(&a.offset));

        if !trailers.iter().any(|t| t.root.is_some())
            && let Some(catalog) = scan.objects_marked(ScanMarker::Catalog).last()
        {
            tracing::debug!(
                obj_num = catalog.obj_num,
                "no trailer names a root, using last catalog object"
            );
            let mut dict = Dictionary::new();
            dict.insert(
                "Root".into(),
                Object::Ref(ObjRef::new(catalog.obj_num, catalog.gen_num)),
            );
            trailers.insert(0, Trailer::from_dict(dict, catalog.offset));
        }
        trailers
    }

    /// Dictionary (or stream dictionary) of the indirect object at `offset`.
    fn dict_at(&self, cursor: &mut ByteCursor, offset: u64) -> Option<Dictionary> {
        let mut win = cursor.window();
        win.seek(offset);
        let mut parser = PdfParser::new(&mut win, &self.options).with_health(&self.health);
        match parser.next_item() {
            Ok(Some((_, Item::Indirect(obj)))) => match obj.into_value() {
                Object::Dict(dict) => Some(dict),
                Object::Stream(stream) => Some(stream.dict),
                _ => None,
            },
            _ => None,
        }
    }

    /// Turn every object stream found by a scan into `Compressed` rows for
    /// keys that have no row yet.
    pub(crate) fn expand_object_streams(&self, cursor: &mut ByteCursor) {
        let containers = std::mem::take(&mut *self.pending_containers.borrow_mut());
        for container in containers {
            let payload = match self.object_stream(cursor, container) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::debug!(container, error = %e, "skipping unreadable object stream");
                    continue;
                }
            };
            let mut rows = self.rows.borrow_mut();
            for (index, &(obj_num, _)) in payload.members.iter().enumerate() {
                rows.entry((obj_num, 0)).or_insert(XRefRow {
                    obj_num,
                    gen_num: 0,
                    location: XRefLocation::Compressed {
                        container,
                        index: index as u32,
                    },
                });
            }
        }
    }

    /// Resolve `/Encrypt` from the newest trailer that has one.
    pub(crate) fn setup_encryption(&self, cursor: &mut ByteCursor) -> Result<()> {
        let trailers = self.trailers();
        let Some(encrypt) = trailers.iter().find_map(|t| t.encrypt.clone()) else {
            return Ok(());
        };
        let encrypt_ref = encrypt.as_ref().ok();
        let dict = match self.resolve_value(cursor, &encrypt)? {
            Object::Dict(dict) => dict,
            other => {
                return Err(PdfError::TypeError {
                    expected: "dict",
                    got: other.type_name(),
                });
            }
        };
        let id = trailers
            .iter()
            .map(|t| &t.id)
            .find(|id| !id.is_empty())
            .cloned()
            .unwrap_or_default();

        if self.decryptor.is_none() {
            self.health.record(
                IssueKind::EncryptedWithoutDecryptor,
                None,
                "document declares /Encrypt but no decryptor was supplied",
            );
        }
        *self.encryption.borrow_mut() = Some(EncryptionContext {
            encrypt: dict,
            id,
            encrypt_ref,
        });
        // Anything materialized so far was read without decryption
        self.clear_caches();
        Ok(())
    }

    fn clear_caches(&self) {
        self.objects.borrow_mut().clear();
        self.object_streams.borrow_mut().clear();
    }

    fn enter(&self, key: Key) -> Result<ResolveGuard<'_>> {
        let mut resolving = self.resolving.borrow_mut();
        if resolving.contains(&key) {
            return Err(PdfError::CircularReference(key.0, key.1));
        }
        if resolving.len() >= self.options.max_resolve_depth {
            return Err(PdfError::ResolveDepthExceeded(self.options.max_resolve_depth));
        }
        resolving.insert(key);
        Ok(ResolveGuard {
            resolving: &self.resolving,
            key,
        })
    }

    /// Materialize `obj_num gen_num R`. With caching on, repeated calls return
    /// the same `Arc`.
    pub fn resolve_with(
        &self,
        cursor: &mut ByteCursor,
        obj_num: u32,
        gen_num: u16,
    ) -> Result<Arc<IndirectObject>> {
        let key = (obj_num, gen_num);
        if self.options.caching
            && let Some(obj) = self.objects.borrow().get(&key).cloned()
        {
            return Ok(obj);
        }
        let _guard = self.enter(key)?;
        tracing::trace!(obj_num, gen_num, "cache miss, materializing");

        let obj = match self.materialize(cursor, key) {
            Ok(obj) => obj,
            Err(e) if self.may_extend(key, &e) => {
                tracing::debug!(obj_num, gen_num, error = %e, "retrying after fallback scan");
                self.extend_by_scan(cursor, Some(key))?;
                self.materialize(cursor, key)?
            }
            Err(e) => return Err(e),
        };

        let obj = Arc::new(obj);
        if self.options.caching {
            self.objects.borrow_mut().insert(key, Arc::clone(&obj));
        }
        Ok(obj)
    }

    /// A scan is tried once, only for a chain-built index, and never for a
    /// key the xref explicitly marks free.
    fn may_extend(&self, key: Key, err: &PdfError) -> bool {
        if self.options.strict || self.fallback.get() {
            return false;
        }
        if matches!(
            self.row(key.0, key.1).map(|r| r.location),
            Some(XRefLocation::Free)
        ) {
            return false;
        }
        !matches!(
            err,
            PdfError::CircularReference(..)
                | PdfError::ResolveDepthExceeded(_)
                | PdfError::Io(_)
                | PdfError::DecryptError(_)
        )
    }

    fn materialize(&self, cursor: &mut ByteCursor, key: Key) -> Result<IndirectObject> {
        let Some(row) = self.row(key.0, key.1) else {
            return Err(PdfError::ObjectNotFound(key.0, key.1));
        };
        match row.location {
            XRefLocation::Free => Err(PdfError::ObjectNotFound(key.0, key.1)),
            XRefLocation::Direct(offset) => self.read_direct(cursor, key, offset),
            XRefLocation::Compressed { container, index } => {
                let payload = self.object_stream(cursor, container)?;
                self.read_member(&payload, key, index)
            }
        }
    }

    fn read_direct(&self, cursor: &mut ByteCursor, key: Key, offset: u64) -> Result<IndirectObject> {
        let mut win = cursor.window();
        let header_at = self.locate_header(&mut win, key, offset)?;
        win.seek(header_at);

        let item = PdfParser::new(&mut win, &self.options)
            .with_resolver(self)
            .with_health(&self.health)
            .next_item()?;
        let mut obj = match item {
            Some((_, Item::Indirect(obj))) if (obj.obj_num, obj.gen_num) == key => obj,
            _ => {
                return Err(PdfError::XRefIntegrityError {
                    obj_num: key.0,
                    gen_num: key.1,
                    offset,
                });
            }
        };

        if self.should_decrypt(&obj)
            && let (Some(decryptor), Some(ctx)) =
                (self.decryptor.as_deref(), self.encryption.borrow().as_ref())
            && let Some(inner) = obj.inner.as_mut()
        {
            decrypt_strings(decryptor, ctx, key.0, key.1, inner)?;
        }
        Ok(obj)
    }

    fn should_decrypt(&self, obj: &IndirectObject) -> bool {
        let encryption = self.encryption.borrow();
        let Some(ctx) = encryption.as_ref() else {
            return false;
        };
        if ctx.encrypt_ref == Some(obj.obj_ref()) {
            return false;
        }
        obj.stream().and_then(Stream::type_name) != Some("XRef")
    }

    /// Offset of the `N G obj` header for `key`: `offset` itself, or the
    /// nearest matching header within `object_search_window` bytes after it.
    fn locate_header(&self, cursor: &mut ByteCursor, key: Key, offset: u64) -> Result<u64> {
        if header_at(cursor, offset) == Some(key) {
            return Ok(offset);
        }
        let (window, truncated) = self.options.bounded_scan(self.options.object_search_window);
        let data = cursor.read_at(offset, window as usize + 32)?;
        for caps in OBJECT_HEADER.captures_iter(&data) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() as u64 > window {
                break;
            }
            let at = offset + whole.start() as u64;
            if header_at(cursor, at) == Some(key) {
                self.health.record(
                    IssueKind::ObjectHeaderAdjusted,
                    Some(offset),
                    format!("{} {} obj found at {at}", key.0, key.1),
                );
                return Ok(at);
            }
        }
        if truncated && offset.saturating_add(window) < cursor.len() {
            if self.options.strict {
                return Err(PdfError::ScanLimitExceeded {
                    offset,
                    limit: window,
                });
            }
            self.health.record(
                IssueKind::ScanLimitReached,
                Some(offset),
                format!("header search for {} {} stopped after {window} bytes", key.0, key.1),
            );
        }
        Err(PdfError::XRefIntegrityError {
            obj_num: key.0,
            gen_num: key.1,
            offset,
        })
    }

    /// Decoded object stream `container`, cached unless caching is off.
    fn object_stream(
        &self,
        cursor: &mut ByteCursor,
        container: u32,
    ) -> Result<Arc<ObjectStreamPayload>> {
        if self.options.caching
            && let Some(payload) = self.object_streams.borrow().get(&container).cloned()
        {
            return Ok(payload);
        }
        let holder = self.resolve_with(cursor, container, 0)?;
        let Some(stream) = holder.stream() else {
            return Err(PdfError::TypeError {
                expected: "stream",
                got: holder.value().type_name(),
            });
        };
        let data = Bytes::from(self.decoded_stream(cursor, stream)?);

        let count = dict_int(&stream.dict, "N")
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| PdfError::SyntaxError("missing N in object stream".into()))?;
        let first = dict_int(&stream.dict, "First")
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| PdfError::SyntaxError("missing First in object stream".into()))?
            .min(data.len() as u64);

        let mut header = ByteCursor::from_bytes(data.slice(..first as usize));
        let mut lexer = Lexer::new(&mut header).lenient();
        let mut numbers = Vec::new();
        while numbers.len() < count.saturating_mul(2) {
            match lexer.next_token()? {
                Some(Spanned {
                    token: Token::Int(n),
                    ..
                }) => numbers.push(n),
                _ => break,
            }
        }
        let members = numbers
            .chunks_exact(2)
            .filter_map(|pair| Some((u32::try_from(pair[0]).ok()?, u64::try_from(pair[1]).ok()?)))
            .collect::<Vec<_>>();
        if members.len() < count {
            tracing::debug!(container, declared = count, found = members.len(), "short object stream header");
        }

        let payload = Arc::new(ObjectStreamPayload {
            data,
            members,
            first,
        });
        if self.options.caching {
            self.object_streams
                .borrow_mut()
                .insert(container, Arc::clone(&payload));
        }
        Ok(payload)
    }

    /// Member `index` of an object stream; the header offset is trusted first,
    /// then the index-th object in sequence.
    fn read_member(
        &self,
        payload: &ObjectStreamPayload,
        key: Key,
        index: u32,
    ) -> Result<IndirectObject> {
        let index = index as usize;
        let slot = payload
            .members
            .get(index)
            .filter(|(num, _)| *num == key.0)
            .or_else(|| payload.members.iter().find(|(num, _)| *num == key.0))
            .copied();

        let mut cursor = ByteCursor::from_bytes(payload.data.clone());
        let by_offset = match slot {
            Some((_, offset)) => {
                cursor.seek(payload.first + offset);
                PdfParser::new(&mut cursor, &self.options)
                    .with_health(&self.health)
                    .parse_object()
            }
            None => Err(PdfError::ObjectNotFound(key.0, key.1)),
        };
        let value = match by_offset {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(obj_num = key.0, error = %e, "member offset unusable, counting objects");
                cursor.seek(payload.first);
                let mut parser = PdfParser::new(&mut cursor, &self.options);
                let mut value = parser.parse_object()?;
                for _ in 0..index {
                    value = parser.parse_object()?;
                }
                value
            }
        };

        let mut obj = IndirectObject::new(key.0, key.1, 0);
        obj.inner = Some(value);
        Ok(obj)
    }

    /// Follow `obj` through any chain of references.
    pub fn resolve_value(&self, cursor: &mut ByteCursor, obj: &Object) -> Result<Object> {
        let mut current = obj.clone();
        let mut seen = FxHashSet::default();
        while let Object::Ref(r) = current {
            if !seen.insert(r) {
                return Err(PdfError::CircularReference(r.obj_num, r.gen_num));
            }
            if seen.len() > self.options.max_resolve_depth {
                return Err(PdfError::ResolveDepthExceeded(self.options.max_resolve_depth));
            }
            current = self.resolve_with(cursor, r.obj_num, r.gen_num)?.value().clone();
        }
        Ok(current)
    }

    /// Payload bytes exactly as stored in the file.
    pub fn raw_stream(&self, cursor: &mut ByteCursor, stream: &Stream) -> Result<Bytes> {
        let desc = &stream.descriptor;
        let mut win = cursor.window();
        win.seek(desc.data_offset);
        win.read_exact(desc.length as usize)
    }

    /// Payload decrypted (when the document is encrypted) and then decoded in
    /// declared filter order.
    pub fn decoded_stream(&self, cursor: &mut ByteCursor, stream: &Stream) -> Result<Vec<u8>> {
        let raw = self.raw_stream(cursor, stream)?;
        let mut data = raw.to_vec();
        let is_xref = stream.type_name() == Some("XRef");
        if !is_xref
            && let (Some(decryptor), Some(ctx), Some(owner)) = (
                self.decryptor.as_deref(),
                self.encryption.borrow().as_ref(),
                stream.owner,
            )
            && ctx.encrypt_ref != Some(owner)
        {
            data = decryptor.decrypt(ctx, owner.obj_num, owner.gen_num, &data, Some(&stream.dict))?;
        }
        decode_chain(self.decoder.as_ref(), data, &stream.descriptor.filters)
    }
}

impl Resolver for XRefIndex {
    fn resolve_in(&self, cursor: &mut ByteCursor, obj_ref: ObjRef) -> Result<Object> {
        self.resolve_value(cursor, &Object::Ref(obj_ref))
    }
}

/// The `N G` of an `N G obj` header at `offset`, if there is one.
fn header_at(cursor: &mut ByteCursor, offset: u64) -> Option<Key> {
    let mut win = cursor.window();
    win.seek(offset);
    let mut lexer = Lexer::new(&mut win).lenient();
    let mut next = || lexer.next_token().ok().flatten().map(|s| s.token);
    match (next(), next(), next()) {
        (
            Some(Token::Int(n)),
            Some(Token::Int(g)),
            Some(Token::Keyword(Keyword::Obj)),
        ) => Some((u32::try_from(n).ok()?, u16::try_from(g).ok()?)),
        _ => None,
    }
}
