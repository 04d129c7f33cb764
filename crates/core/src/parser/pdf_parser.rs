//! PDF object parser.
//!
//! Builds objects from lexer tokens with an explicit context stack. Integers
//! are held in a two-slot queue until the next token tells whether they start
//! a reference (`N G R`), an indirect object (`N G obj`), or are plain values.

use super::lexer::{Keyword, Lexer, Spanned, Token};
use crate::config::ParseOptions;
use crate::cursor::ByteCursor;
use crate::document::health::{HealthIssue, HealthReport, IssueKind, log_issue};
use crate::error::{PdfError, Result};
use crate::model::{
    DeclaredLength, Dictionary, FilterSpec, IndirectObject, ObjRef, Object, Stream,
    StreamDescriptor,
};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Resolves references met while a parse is in progress.
///
/// Only an indirect `/Length` needs this. The implementation receives the
/// parser's cursor and must leave its position as it found it.
pub trait Resolver {
    fn resolve_in(&self, cursor: &mut ByteCursor, obj_ref: ObjRef) -> Result<Object>;
}

/// A top-level parse result.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Object(Object),
    Indirect(IndirectObject),
    /// Bare top-level keyword (`xref`, `trailer`, `startxref`, ...)
    Keyword(Keyword),
}

enum Frame {
    Array {
        items: Vec<Object>,
    },
    Dict {
        entries: Dictionary,
        key: Option<String>,
    },
    Indirect(IndirectObject),
}

impl Frame {
    const fn closer(&self) -> &'static str {
        match self {
            Frame::Array { .. } => "]",
            Frame::Dict { .. } => ">>",
            Frame::Indirect(_) => "endobj",
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Closer {
    Array,
    Dict,
}

impl Closer {
    const fn as_str(self) -> &'static str {
        match self {
            Closer::Array => "]",
            Closer::Dict => ">>",
        }
    }

    const fn closes(self, frame: &Frame) -> bool {
        matches!(
            (self, frame),
            (Closer::Array, Frame::Array { .. }) | (Closer::Dict, Frame::Dict { .. })
        )
    }
}

/// Frame plus the offset it was opened at.
type OpenFrame = (u64, Frame);

pub struct PdfParser<'c, 'r> {
    lexer: Lexer<'c>,
    options: &'r ParseOptions,
    resolver: Option<&'r dyn Resolver>,
    health: Option<&'r HealthReport>,
    /// Open contexts. An indirect object, if any, is always at the bottom.
    frames: Vec<OpenFrame>,
    pending: SmallVec<[(u64, i64); 2]>,
    output: VecDeque<(u64, Item)>,
    /// Levels of a too-deeply nested value still being discarded, and
    /// where that value started.
    skipping: Option<(u64, usize)>,
    done: bool,
}

impl<'c, 'r> PdfParser<'c, 'r> {
    pub fn new(cursor: &'c mut ByteCursor, options: &'r ParseOptions) -> Self {
        let lexer = if options.strict {
            Lexer::new(cursor)
        } else {
            Lexer::new(cursor).lenient()
        };
        Self {
            lexer,
            options,
            resolver: None,
            health: None,
            frames: Vec::new(),
            pending: SmallVec::new(),
            output: VecDeque::new(),
            skipping: None,
            done: false,
        }
    }

    /// Resolve indirect `/Length` values through `resolver`.
    pub fn with_resolver(mut self, resolver: &'r dyn Resolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Record recoverable issues in `health` instead of only logging them.
    pub fn with_health(mut self, health: &'r HealthReport) -> Self {
        self.health = Some(health);
        self
    }

    pub fn tell(&self) -> u64 {
        self.lexer.tell()
    }

    /// Reposition and drop any partial state.
    pub fn seek(&mut self, offset: u64) {
        self.lexer.seek(offset);
        self.frames.clear();
        self.pending.clear();
        self.output.clear();
        self.skipping = None;
        self.done = false;
    }

    pub fn cursor(&mut self) -> &mut ByteCursor {
        self.lexer.cursor()
    }

    /// Next top-level item with its start offset, or `None` at end of input.
    pub fn next_item(&mut self) -> Result<Option<(u64, Item)>> {
        loop {
            if let Some(item) = self.output.pop_front() {
                return Ok(Some(item));
            }
            if self.done {
                return Ok(None);
            }
            let token = self.lexer.next_token()?;
            for offset in self.lexer.take_repaired_names() {
                self.issue(
                    IssueKind::InvalidNameEscape,
                    offset,
                    "invalid # escape kept verbatim in name",
                );
            }
            for offset in self.lexer.take_repaired_hex() {
                self.issue(
                    IssueKind::InvalidHexDigit,
                    offset,
                    "non-hex byte dropped from hex string",
                );
            }
            match token {
                Some(spanned) => self.feed(spanned)?,
                None => self.finish()?,
            }
        }
    }

    /// Next top-level direct object, skipping comments. A keyword or the end
    /// of input where an object is required is an error.
    pub fn parse_object(&mut self) -> Result<Object> {
        loop {
            match self.next_item()? {
                Some((_, Item::Object(Object::Comment(_)))) => continue,
                Some((_, Item::Object(obj))) => return Ok(obj),
                Some((offset, Item::Keyword(kw))) => {
                    return Err(PdfError::UnexpectedKeyword {
                        offset,
                        keyword: kw.to_string(),
                    });
                }
                Some((offset, Item::Indirect(obj))) => {
                    return Err(PdfError::SyntaxError(format!(
                        "expected a direct object at {offset}, found {} {} obj",
                        obj.obj_num, obj.gen_num
                    )));
                }
                None => {
                    return Err(PdfError::StreamExhausted {
                        offset: self.tell(),
                        msg: "expected an object".into(),
                    });
                }
            }
        }
    }

    /// Next indirect object, skipping anything before it.
    pub fn next_indirect(&mut self) -> Result<Option<(u64, IndirectObject)>> {
        while let Some((offset, item)) = self.next_item()? {
            if let Item::Indirect(obj) = item {
                return Ok(Some((offset, obj)));
            }
        }
        Ok(None)
    }

    fn issue(&self, kind: IssueKind, offset: u64, message: impl Into<String>) {
        match self.health {
            Some(health) => health.record(kind, Some(offset), message),
            None => log_issue(&HealthIssue {
                kind,
                offset: Some(offset),
                message: message.into(),
            }),
        }
    }

    fn feed(&mut self, spanned: Spanned) -> Result<()> {
        if self.skipping.is_some() {
            return self.skip_nested(spanned);
        }
        let Spanned { start, end, token } = spanned;

        if let Token::Int(n) = token {
            if self.pending.len() == 2 {
                let (at, oldest) = self.pending.remove(0);
                self.push_value(at, Object::Int(oldest))?;
            }
            self.pending.push((start, n));
            return Ok(());
        }

        match token {
            Token::Keyword(Keyword::R) => {
                if let Some((at, obj_ref)) = self.take_pending_ref() {
                    return self.push_value(at, Object::Ref(obj_ref));
                }
                self.flush_pending()?;
                self.keyword(start, Keyword::R)
            }
            Token::Keyword(Keyword::Obj) => {
                if let Some((at, obj_ref)) = self.take_pending_ref() {
                    return self.open_indirect(at, obj_ref);
                }
                self.flush_pending()?;
                self.keyword(start, Keyword::Obj)
            }
            token => {
                self.flush_pending()?;
                match token {
                    Token::Comment(text) => {
                        // Comments only survive at top level
                        if self.frames.is_empty() {
                            self.output.push_back((start, Item::Object(Object::Comment(text))));
                        }
                        Ok(())
                    }
                    Token::ArrayStart | Token::DictStart if self.too_deep(start)? => Ok(()),
                    Token::ArrayStart => {
                        self.frames.push((start, Frame::Array { items: Vec::new() }));
                        Ok(())
                    }
                    Token::DictStart => {
                        self.frames.push((
                            start,
                            Frame::Dict {
                                entries: Dictionary::new(),
                                key: None,
                            },
                        ));
                        Ok(())
                    }
                    Token::ArrayEnd => self.close_collection(start, Closer::Array),
                    Token::DictEnd => self.close_collection(start, Closer::Dict),
                    Token::Keyword(Keyword::Stream) => self.read_stream(start, end),
                    Token::Keyword(kw) => self.keyword(start, kw),
                    Token::Name(name) => self.push_value(start, Object::Name(name)),
                    Token::Bool(b) => self.push_value(start, Object::Bool(b)),
                    Token::Null => self.push_value(start, Object::Null),
                    Token::String(s) | Token::HexString(s) => {
                        self.push_value(start, Object::String(s))
                    }
                    Token::Real(d) => self.push_value(start, Object::Real(d)),
                    Token::Int(n) => self.push_value(start, Object::Int(n)),
                }
            }
        }
    }

    /// Check a new collection against `max_nesting_depth`. Past the limit,
    /// strict parsing fails; otherwise the whole value is skipped and later
    /// read as null.
    fn too_deep(&mut self, start: u64) -> Result<bool> {
        let limit = self.options.max_nesting_depth;
        if self.frames.len() < limit {
            return Ok(false);
        }
        if self.options.strict {
            return Err(PdfError::NestingTooDeep {
                offset: start,
                limit,
            });
        }
        self.issue(
            IssueKind::NestingTooDeep,
            start,
            format!("collections nested deeper than {limit} levels; value read as null"),
        );
        self.skipping = Some((start, 1));
        Ok(true)
    }

    /// Discard tokens of a too-deep value until its closer, or until a
    /// keyword that ends the enclosing object.
    fn skip_nested(&mut self, spanned: Spanned) -> Result<()> {
        let Some((start, depth)) = self.skipping else {
            return Ok(());
        };
        let depth = match &spanned.token {
            Token::ArrayStart | Token::DictStart => depth + 1,
            Token::ArrayEnd | Token::DictEnd => depth - 1,
            Token::Keyword(
                Keyword::EndObj | Keyword::Xref | Keyword::Trailer | Keyword::StartXref,
            ) => 0,
            _ => depth,
        };
        if depth > 0 {
            self.skipping = Some((start, depth));
            return Ok(());
        }
        self.skipping = None;
        self.push_value(start, Object::Null)?;
        match spanned.token {
            Token::ArrayEnd | Token::DictEnd => Ok(()),
            _ => self.feed(spanned),
        }
    }

    /// Pop both queued integers as an object reference, if they form one.
    fn take_pending_ref(&mut self) -> Option<(u64, ObjRef)> {
        if self.pending.len() != 2 {
            return None;
        }
        let (at, num) = self.pending[0];
        let (_, gen_num) = self.pending[1];
        let obj_num = u32::try_from(num).ok()?;
        let gen_num = u16::try_from(gen_num).ok()?;
        self.pending.clear();
        Some((at, ObjRef::new(obj_num, gen_num)))
    }

    fn flush_pending(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        for (at, n) in pending {
            self.push_value(at, Object::Int(n))?;
        }
        Ok(())
    }

    /// Hand a finished value to the innermost context.
    fn push_value(&mut self, start: u64, value: Object) -> Result<()> {
        let Some((_, frame)) = self.frames.last_mut() else {
            self.output.push_back((start, Item::Object(value)));
            return Ok(());
        };
        let rejected_key = match frame {
            Frame::Array { items } => {
                items.push(value);
                None
            }
            Frame::Dict { entries, key } => match (key.take(), value) {
                (Some(k), value) => {
                    entries.insert(k, value);
                    None
                }
                (None, Object::Name(name)) => {
                    *key = Some(name);
                    None
                }
                (None, other) => Some(format!(
                    "{} where a name key was expected",
                    other.type_name()
                )),
            },
            Frame::Indirect(obj) => {
                if obj.inner.is_none() {
                    obj.inner = Some(value);
                } else {
                    tracing::trace!(offset = start, "extra value in indirect object ignored");
                }
                None
            }
        };
        if let Some(msg) = rejected_key {
            if self.options.strict {
                return Err(PdfError::InvalidDictionaryKey { offset: start, msg });
            }
            self.issue(IssueKind::InvalidDictKey, start, format!("{msg}; dropped"));
        }
        Ok(())
    }

    fn finish_collection(frame: Frame) -> Option<Object> {
        match frame {
            Frame::Array { items } => Some(Object::Array(items)),
            Frame::Dict { entries, key } => {
                if let Some(k) = key {
                    tracing::trace!(key = %k, "dictionary key without value dropped");
                }
                Some(Object::Dict(entries))
            }
            Frame::Indirect(_) => None,
        }
    }

    /// Pop the top frame and deliver it: collections go to their parent,
    /// indirect objects are sealed and emitted.
    fn pop_frame(&mut self) -> Result<()> {
        let Some((start, frame)) = self.frames.pop() else {
            return Ok(());
        };
        match frame {
            Frame::Indirect(obj) => {
                self.output.push_back((start, Item::Indirect(obj)));
                Ok(())
            }
            collection => match Self::finish_collection(collection) {
                Some(value) => self.push_value(start, value),
                None => Ok(()),
            },
        }
    }

    fn close_collection(&mut self, offset: u64, closer: Closer) -> Result<()> {
        match self.frames.last() {
            Some((_, frame)) if closer.closes(frame) => return self.pop_frame(),
            top => {
                let expected = top.map_or("nothing", |(_, f)| f.closer());
                if self.options.strict {
                    return Err(PdfError::MismatchedCollectionClose {
                        offset,
                        expected,
                        got: closer.as_str(),
                    });
                }
                self.issue(
                    IssueKind::MismatchedClose,
                    offset,
                    format!("{} while {} is open", closer.as_str(), expected),
                );
            }
        }

        // Close through to a matching opener inside the current object, or
        // discard the stray closer.
        let depth = self
            .frames
            .iter()
            .rev()
            .take_while(|(_, f)| !matches!(f, Frame::Indirect(_)))
            .position(|(_, f)| closer.closes(f));
        if let Some(depth) = depth {
            for _ in 0..=depth {
                self.pop_frame()?;
            }
        }
        Ok(())
    }

    /// Close every open frame. Used when a boundary arrives before the
    /// object was finished.
    fn unwind(&mut self, offset: u64, reason: &str) -> Result<()> {
        if self.frames.is_empty() {
            return Ok(());
        }
        self.issue(IssueKind::UnterminatedObject, offset, reason.to_string());
        while !self.frames.is_empty() {
            self.pop_frame()?;
        }
        Ok(())
    }

    fn open_indirect(&mut self, start: u64, obj_ref: ObjRef) -> Result<()> {
        if !self.frames.is_empty() {
            if self.options.strict {
                return Err(PdfError::UnexpectedKeyword {
                    offset: start,
                    keyword: "obj".into(),
                });
            }
            self.unwind(start, "object header before the previous object was closed")?;
        }
        self.frames.push((
            start,
            Frame::Indirect(IndirectObject::new(obj_ref.obj_num, obj_ref.gen_num, start)),
        ));
        Ok(())
    }

    fn keyword(&mut self, offset: u64, kw: Keyword) -> Result<()> {
        if self.frames.is_empty() {
            self.output.push_back((offset, Item::Keyword(kw)));
            return Ok(());
        }

        if kw == Keyword::EndObj {
            if let Some((_, Frame::Indirect(_))) = self.frames.first()
                && self.frames.len() == 1
            {
                return self.pop_frame();
            }
            if self.options.strict {
                return Err(PdfError::UnexpectedKeyword {
                    offset,
                    keyword: kw.to_string(),
                });
            }
            return self.unwind(offset, "endobj inside an open collection");
        }

        if self.options.strict {
            return Err(PdfError::UnexpectedKeyword {
                offset,
                keyword: kw.to_string(),
            });
        }
        match kw {
            Keyword::Xref | Keyword::Trailer | Keyword::StartXref => {
                self.unwind(offset, &format!("{kw} before the object was closed"))?;
                self.output.push_back((offset, Item::Keyword(kw)));
            }
            _ => {
                self.issue(
                    IssueKind::UnexpectedKeyword,
                    offset,
                    format!("{kw} ignored inside an object"),
                );
            }
        }
        Ok(())
    }

    /// Handle `stream`: capture the payload range and step past `endstream`.
    fn read_stream(&mut self, start: u64, keyword_end: u64) -> Result<()> {
        let owner = match self.frames.as_slice() {
            [(_, Frame::Indirect(obj))] => Some(obj.obj_ref()),
            _ => None,
        };
        let Some(owner) = owner else {
            return self.keyword(start, Keyword::Stream);
        };
        let inner = match self.frames.last_mut() {
            Some((_, Frame::Indirect(obj))) => obj.inner.take(),
            _ => None,
        };
        let dict = match inner {
            Some(Object::Dict(dict)) => dict,
            other => {
                if self.options.strict {
                    return Err(PdfError::UnexpectedKeyword {
                        offset: start,
                        keyword: "stream".into(),
                    });
                }
                let got = other.as_ref().map_or("nothing", Object::type_name);
                self.issue(
                    IssueKind::UnexpectedKeyword,
                    start,
                    format!("stream follows {got}, not a dictionary"),
                );
                Dictionary::new()
            }
        };

        // Data starts after one end-of-line marker
        let cursor = self.lexer.cursor();
        cursor.seek(keyword_end);
        while let Some(b' ' | b'\t') = cursor.peek_byte()? {
            cursor.next_byte()?;
        }
        match cursor.peek_byte()? {
            Some(b'\r') => {
                cursor.next_byte()?;
                if cursor.peek_byte()? == Some(b'\n') {
                    cursor.next_byte()?;
                }
            }
            Some(b'\n') => {
                cursor.next_byte()?;
            }
            _ => {}
        }
        let data_offset = cursor.tell();

        let declared_length = match dict.get("Length") {
            Some(Object::Int(n)) => DeclaredLength::Direct(*n),
            Some(Object::Ref(r)) => DeclaredLength::Indirect(*r),
            _ => DeclaredLength::Missing,
        };
        let declared = match declared_length {
            DeclaredLength::Direct(n) => u64::try_from(n).ok(),
            DeclaredLength::Indirect(r) => self.resolve_length(r)?,
            DeclaredLength::Missing => None,
        };

        let length = self.locate_stream_end(data_offset, declared)?;
        let filters = filter_chain(&dict);
        let stream = Stream {
            dict,
            descriptor: StreamDescriptor {
                data_offset,
                declared_length,
                length,
                filters,
            },
            owner: Some(owner),
        };
        if let Some((_, Frame::Indirect(obj))) = self.frames.last_mut() {
            obj.inner = Some(Object::Stream(Box::new(stream)));
        }
        Ok(())
    }

    fn resolve_length(&mut self, obj_ref: ObjRef) -> Result<Option<u64>> {
        let Some(resolver) = self.resolver else {
            tracing::debug!(%obj_ref, "indirect /Length without a resolver");
            return Ok(None);
        };
        match resolver.resolve_in(self.lexer.cursor(), obj_ref) {
            Ok(Object::Int(n)) => Ok(u64::try_from(n).ok()),
            Ok(other) => {
                tracing::debug!(%obj_ref, got = other.type_name(), "/Length is not an integer");
                Ok(None)
            }
            Err(e) if self.options.strict => Err(e),
            Err(e) => {
                tracing::debug!(%obj_ref, error = %e, "indirect /Length unresolvable");
                Ok(None)
            }
        }
    }

    /// Check `endstream` follows the declared length; otherwise search for
    /// it. Leaves the cursor after `endstream` and returns the payload length.
    fn locate_stream_end(&mut self, data_offset: u64, declared: Option<u64>) -> Result<u64> {
        let strict = self.options.strict;
        let cursor = self.lexer.cursor();

        if let Some(len) = declared
            && let Some(after) = endstream_at(cursor, data_offset.saturating_add(len))?
        {
            cursor.seek(after);
            return Ok(len);
        }

        cursor.seek(data_offset);
        let (limit, truncated) = self
            .options
            .bounded_scan(cursor.len().saturating_sub(data_offset));
        let found = cursor.find_forward(b"endstream", limit)?;

        let Some(keyword_at) = found else {
            if truncated {
                if strict {
                    return Err(PdfError::ScanLimitExceeded {
                        offset: data_offset,
                        limit,
                    });
                }
                self.issue(
                    IssueKind::ScanLimitReached,
                    data_offset,
                    format!("endstream search stopped after {limit} bytes"),
                );
            }
            let cursor = self.lexer.cursor();
            if strict {
                return Err(PdfError::StreamExhausted {
                    offset: data_offset,
                    msg: "no endstream after stream data".into(),
                });
            }
            let end = data_offset.saturating_add(limit).min(cursor.len());
            cursor.seek(end);
            self.issue(
                IssueKind::StreamLengthCorrected,
                data_offset,
                format!("no endstream found; stream runs to offset {end}"),
            );
            return Ok(end - data_offset);
        };

        let mut end = keyword_at;
        let back = (keyword_at - data_offset).min(2);
        let tail = cursor.read_at(keyword_at - back, back as usize)?;
        if tail.ends_with(b"\r\n") {
            end -= 2;
        } else if tail.ends_with(b"\n") || tail.ends_with(b"\r") {
            end -= 1;
        }
        let length = end - data_offset;
        cursor.seek(keyword_at + b"endstream".len() as u64);

        if strict {
            return Err(PdfError::StreamLength {
                offset: data_offset,
                declared: declared.unwrap_or(0),
            });
        }
        let msg = match declared {
            Some(d) => format!("/Length {d} corrected to {length}"),
            None => format!("/Length missing; measured {length}"),
        };
        self.issue(IssueKind::StreamLengthCorrected, data_offset, msg);
        Ok(length)
    }

    fn finish(&mut self) -> Result<()> {
        self.done = true;
        if let Some((start, _)) = self.skipping.take() {
            self.push_value(start, Object::Null)?;
        }
        self.flush_pending()?;
        if let Some((start, _)) = self.frames.first() {
            let start = *start;
            if self.options.strict {
                return Err(PdfError::StreamExhausted {
                    offset: start,
                    msg: "input ended inside an object".into(),
                });
            }
            self.unwind(start, "input ended inside an object")?;
        }
        Ok(())
    }
}

/// Position just past `endstream` if it follows `at` after optional
/// whitespace.
fn endstream_at(cursor: &mut ByteCursor, at: u64) -> Result<Option<u64>> {
    let head = cursor.read_at(at, 32)?;
    let skip = head
        .iter()
        .take_while(|&&b| super::lexer::is_whitespace(b))
        .count();
    if head[skip..].starts_with(b"endstream") {
        Ok(Some(at + skip as u64 + b"endstream".len() as u64))
    } else {
        Ok(None)
    }
}

/// Normalize `/Filter` and `/DecodeParms` into an ordered chain.
pub fn filter_chain(dict: &Dictionary) -> Vec<FilterSpec> {
    let names: Vec<String> = match dict.get("Filter") {
        Some(Object::Name(n)) => vec![n.clone()],
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|f| f.as_name().ok().map(str::to_owned))
            .collect(),
        _ => Vec::new(),
    };
    let params = dict.get("DecodeParms");
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let params = match params {
                Some(Object::Dict(d)) if i == 0 => Some(d.clone()),
                Some(Object::Array(arr)) => match arr.get(i) {
                    Some(Object::Dict(d)) => Some(d.clone()),
                    _ => None,
                },
                _ => None,
            };
            FilterSpec { name, params }
        })
        .collect()
}

/// Write `obj` back as source text. Parsing the output yields an equal
/// object; a stream is written as its dictionary followed by `stream`.
pub fn serialize_object(obj: &Object) -> Vec<u8> {
    let mut out = Vec::new();
    write_object(&mut out, obj);
    out
}

fn write_object(out: &mut Vec<u8>, obj: &Object) {
    let token = match obj {
        Object::Null => Token::Null,
        Object::Bool(b) => Token::Bool(*b),
        Object::Int(n) => Token::Int(*n),
        Object::Real(d) => Token::Real(*d),
        Object::Name(n) => Token::Name(n.clone()),
        Object::String(s) => Token::String(s.clone()),
        Object::Comment(text) => {
            out.extend_from_slice(&Token::Comment(text.clone()).to_bytes());
            out.push(b'\n');
            return;
        }
        Object::Ref(r) => {
            out.extend_from_slice(format!("{} {} R", r.obj_num, r.gen_num).as_bytes());
            return;
        }
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(out, item);
            }
            out.push(b']');
            return;
        }
        Object::Dict(dict) => {
            write_dict(out, dict);
            return;
        }
        Object::Stream(stream) => {
            write_dict(out, &stream.dict);
            out.extend_from_slice(b" stream");
            return;
        }
    };
    out.extend_from_slice(&token.to_bytes());
}

fn write_dict(out: &mut Vec<u8>, dict: &Dictionary) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict {
        out.extend_from_slice(&Token::Name(key.clone()).to_bytes());
        out.push(b' ');
        write_object(out, value);
        out.push(b' ');
    }
    out.extend_from_slice(b">>");
}
