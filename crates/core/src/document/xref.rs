//! Cross-reference sections, trailers and the revision chain.
//!
//! A [`XRefReader`] reads classic `xref` tables and xref streams, walks the
//! `/Prev` chain newest to oldest, and provides the linear-scan recovery used
//! when no declared table can be trusted.

use crate::codec::{StreamDecoder, decode_chain};
use crate::config::{HybridPrecedence, ParseOptions};
use crate::cursor::ByteCursor;
use crate::document::health::{HealthReport, IssueKind};
use crate::error::{PdfError, Result};
use crate::model::objects::{dict_int, dict_ref};
use crate::model::{Dictionary, ObjRef, Object};
use crate::parser::{Item, Keyword, Lexer, PdfParser, Spanned, Token};
use byteorder::{BigEndian, ByteOrder};
use regex::bytes::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::LazyLock;

/// Where an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefLocation {
    /// Byte offset of the `N G obj` header
    Direct(u64),
    /// Member `index` of the object stream `container`
    Compressed { container: u32, index: u32 },
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefRow {
    pub obj_num: u32,
    pub gen_num: u16,
    pub location: XRefLocation,
}

impl XRefRow {
    pub const fn key(&self) -> (u32, u16) {
        (self.obj_num, self.gen_num)
    }
}

/// Trailer dictionary of one revision, with the fields the index uses
/// pulled out.
#[derive(Debug, Clone, PartialEq)]
pub struct Trailer {
    /// Offset of the section (or scanned dictionary) this came from
    pub offset: u64,
    pub dict: Dictionary,
    pub size: Option<i64>,
    pub root: Option<ObjRef>,
    pub prev: Option<u64>,
    pub xref_stm: Option<u64>,
    pub info: Option<Object>,
    pub encrypt: Option<Object>,
    /// `/ID` strings, usually two
    pub id: Vec<Vec<u8>>,
}

impl Trailer {
    pub fn from_dict(dict: Dictionary, offset: u64) -> Self {
        let offset_of = |key: &str| dict_int(&dict, key).and_then(|n| u64::try_from(n).ok());
        let id = dict
            .get("ID")
            .and_then(|v| v.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .filter_map(|s| s.as_string().ok().map(<[u8]>::to_vec))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            offset,
            size: dict_int(&dict, "Size"),
            root: dict_ref(&dict, "Root"),
            prev: offset_of("Prev"),
            xref_stm: offset_of("XRefStm"),
            info: dict.get("Info").cloned().filter(|v| !v.is_null()),
            encrypt: dict.get("Encrypt").cloned().filter(|v| !v.is_null()),
            id,
            dict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Classic,
    Stream,
}

/// One parsed cross-reference section and its trailer.
#[derive(Debug, Clone)]
pub struct XRefSection {
    pub offset: u64,
    pub kind: SectionKind,
    pub rows: Vec<XRefRow>,
    pub trailer: Trailer,
}

/// Rows merged from the declared chain, first seen wins.
#[derive(Debug, Default)]
pub struct ChainWalk {
    pub rows: FxHashMap<(u32, u16), XRefRow>,
    /// Newest first
    pub trailers: Vec<Trailer>,
}

impl ChainWalk {
    fn merge(&mut self, rows: Vec<XRefRow>) -> usize {
        let mut added = 0;
        for row in rows {
            self.rows.entry(row.key()).or_insert_with(|| {
                added += 1;
                row
            });
        }
        added
    }
}

/// Object-type markers seen during a linear scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMarker {
    XRef,
    ObjStm,
    Catalog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedObject {
    pub obj_num: u32,
    pub gen_num: u16,
    pub offset: u64,
}

/// Everything a linear scan found, in file order.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub objects: Vec<ScannedObject>,
    /// Offsets of `trailer` keywords
    pub trailers: Vec<u64>,
    /// `/Type` markers with their offsets
    pub markers: Vec<(u64, ScanMarker)>,
}

impl ScanResult {
    /// The object whose header most closely precedes `pos`.
    pub fn owner_of(&self, pos: u64) -> Option<ScannedObject> {
        let idx = self.objects.partition_point(|o| o.offset <= pos);
        idx.checked_sub(1).map(|i| self.objects[i])
    }

    /// Objects carrying `marker`, deduplicated, in file order.
    pub fn objects_marked(&self, marker: ScanMarker) -> Vec<ScannedObject> {
        let mut seen = FxHashSet::default();
        self.markers
            .iter()
            .filter(|(_, m)| *m == marker)
            .filter_map(|(pos, _)| self.owner_of(*pos))
            .filter(|o| seen.insert(o.offset))
            .collect()
    }
}

/// Object headers, `trailer` keywords and the `/Type` values the scan tracks.
static SCAN_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?-u)(?P<num>\d+)\s+(?P<gen>\d+)\s+obj\b|\btrailer\b|/Type\s*/(?P<ty>ObjStm|XRef|Catalog)\b",
    )
    .expect("scan pattern is valid")
});

const SCAN_CHUNK: usize = 1 << 20;
const SCAN_OVERLAP: usize = 256;
/// Distance searched past `startxref` for `%%EOF`, and the cap on xref
/// offset repositioning.
const TAIL_WINDOW: u64 = 1024;

enum SectionStart {
    Classic,
    Stream,
    Unknown,
}

/// Reads cross-reference structures off a cursor.
pub struct XRefReader<'a> {
    options: &'a ParseOptions,
    health: &'a HealthReport,
    decoder: &'a dyn StreamDecoder,
}

impl<'a> XRefReader<'a> {
    pub fn new(
        options: &'a ParseOptions,
        health: &'a HealthReport,
        decoder: &'a dyn StreamDecoder,
    ) -> Self {
        Self {
            options,
            health,
            decoder,
        }
    }

    /// Offset named by the last `startxref` in the file.
    pub fn find_startxref(&self, cursor: &mut ByteCursor) -> Result<u64> {
        let limit = self.options.scan_limit(cursor.len());
        let Some(at) = cursor.rfind_from_end(b"startxref", limit)? else {
            return Err(PdfError::NoValidXRef);
        };

        let mut win = cursor.window();
        win.seek(at);
        let mut lexer = Lexer::new(&mut win).lenient();
        lexer.next_token()?; // startxref
        let offset = match lexer.next_token()? {
            Some(Spanned {
                token: Token::Int(n),
                ..
            }) if n >= 0 => n as u64,
            _ => return Err(PdfError::NoValidXRef),
        };
        let after = lexer.tell();

        win.seek(after);
        if win.find_forward(b"%%EOF", TAIL_WINDOW)?.is_none() {
            if self.options.strict {
                return Err(PdfError::MissingEof);
            }
            self.health
                .record(IssueKind::MissingEof, Some(after), "no %%EOF after startxref");
        }
        Ok(offset)
    }

    fn section_start(&self, cursor: &mut ByteCursor, offset: u64) -> SectionStart {
        let mut win = cursor.window();
        win.seek(offset);
        let mut lexer = Lexer::new(&mut win).lenient();
        let mut next = || lexer.next_token().ok().flatten().map(|s| s.token);
        match next() {
            Some(Token::Keyword(Keyword::Xref)) => SectionStart::Classic,
            Some(Token::Int(_)) => match (next(), next()) {
                (Some(Token::Int(_)), Some(Token::Keyword(Keyword::Obj))) => SectionStart::Stream,
                _ => SectionStart::Unknown,
            },
            _ => SectionStart::Unknown,
        }
    }

    /// Read the section at `offset`, classic or stream.
    pub fn read_section(&self, cursor: &mut ByteCursor, offset: u64) -> Result<XRefSection> {
        match self.section_start(cursor, offset) {
            SectionStart::Classic => self.read_classic(cursor, offset),
            SectionStart::Stream => self.read_stream_section(cursor, offset),
            SectionStart::Unknown => Err(PdfError::SyntaxError(format!(
                "no xref section at offset {offset}"
            ))),
        }
    }

    /// Read the section `startxref` names, repositioning to a nearby `xref`
    /// keyword when the offset is off.
    fn read_newest(&self, cursor: &mut ByteCursor, offset: u64) -> Result<XRefSection> {
        if !matches!(self.section_start(cursor, offset), SectionStart::Unknown) {
            return self.read_section(cursor, offset);
        }
        let Some(actual) = self.reposition(cursor, offset) else {
            return Err(PdfError::SyntaxError(format!(
                "startxref offset {offset} does not point at an xref section"
            )));
        };
        if self.options.strict {
            return Err(PdfError::XRefOffsetMismatch {
                declared: offset,
                actual,
            });
        }
        self.health.record(
            IssueKind::XRefOffsetAdjusted,
            Some(offset),
            format!("startxref {offset} repositioned to {actual}"),
        );
        self.read_section(cursor, actual)
    }

    /// Lex forward from `offset` looking for an `xref` keyword.
    fn reposition(&self, cursor: &mut ByteCursor, offset: u64) -> Option<u64> {
        let limit = self.options.scan_limit(TAIL_WINDOW);
        let mut win = cursor.window();
        win.seek(offset);
        let mut lexer = Lexer::new(&mut win).lenient();
        while let Ok(Some(spanned)) = lexer.next_token() {
            if spanned.start > offset + limit {
                break;
            }
            if spanned.token == Token::Keyword(Keyword::Xref) {
                return Some(spanned.start);
            }
        }
        None
    }

    /// Classic table: `xref`, subsections of `start count` followed by
    /// `offset gen n|f` rows, then `trailer << … >>`.
    pub fn read_classic(&self, cursor: &mut ByteCursor, offset: u64) -> Result<XRefSection> {
        let mut win = cursor.window();
        win.seek(offset);
        let mut lexer = Lexer::new(&mut win).lenient();

        match lexer.next_token()? {
            Some(Spanned {
                token: Token::Keyword(Keyword::Xref),
                ..
            }) => {}
            _ => {
                return Err(PdfError::SyntaxError(format!(
                    "expected xref at offset {offset}"
                )));
            }
        }

        let mut rows = Vec::new();
        let mut first_subsection = true;
        loop {
            let Some(next) = lexer.peek_token()? else {
                return Err(PdfError::StreamExhausted {
                    offset,
                    msg: "xref table without trailer".into(),
                });
            };
            match next.token {
                Token::Int(_) => {}
                Token::Keyword(Keyword::Trailer) => {
                    lexer.next_token()?;
                    break;
                }
                other => {
                    return Err(PdfError::SyntaxError(format!(
                        "unexpected {other:?} in xref table at offset {}",
                        next.start
                    )));
                }
            }

            let start = expect_index(&mut lexer)?;
            let count = expect_index(&mut lexer)?;
            let mut base = start;
            for i in 0..count {
                let row_offset = expect_int(&mut lexer)?;
                let gen_num = expect_int(&mut lexer)?;
                let flag = match lexer.next_token()? {
                    Some(Spanned {
                        token: Token::Keyword(Keyword::Other(flag)),
                        ..
                    }) if flag == b"n" || flag == b"f" => flag[0],
                    other => {
                        return Err(PdfError::SyntaxError(format!(
                            "bad xref row flag {:?}",
                            other.map(|s| s.token)
                        )));
                    }
                };

                // A first subsection declared as starting at 1 that still
                // carries the free-list head belongs at 0.
                if first_subsection
                    && i == 0
                    && base == 1
                    && flag == b'f'
                    && row_offset == 0
                    && gen_num == 65535
                {
                    base = 0;
                    self.health.record(
                        IssueKind::XRefSubsectionRebased,
                        Some(offset),
                        "subsection starting at 1 re-based to 0",
                    );
                }

                let Some(obj_num) = base.checked_add(i) else {
                    break;
                };
                let gen_num = u16::try_from(gen_num).unwrap_or(u16::MAX);
                let location = match (flag, u64::try_from(row_offset)) {
                    (b'n', Ok(off)) if off > 0 => XRefLocation::Direct(off),
                    _ => XRefLocation::Free,
                };
                rows.push(XRefRow {
                    obj_num,
                    gen_num,
                    location,
                });
            }
            first_subsection = false;
        }

        let trailer_at = lexer.tell();
        win.seek(trailer_at);
        let trailer = PdfParser::new(&mut win, self.options)
            .with_health(self.health)
            .parse_object()?;
        let Object::Dict(dict) = trailer else {
            return Err(PdfError::TypeError {
                expected: "dict",
                got: trailer.type_name(),
            });
        };

        tracing::trace!(offset, rows = rows.len(), "read classic xref section");
        Ok(XRefSection {
            offset,
            kind: SectionKind::Classic,
            rows,
            trailer: Trailer::from_dict(dict, offset),
        })
    }

    /// Xref stream: fixed-width binary records described by `/W` and
    /// `/Index`. The payload is decoded but never decrypted.
    pub fn read_stream_section(&self, cursor: &mut ByteCursor, offset: u64) -> Result<XRefSection> {
        let mut win = cursor.window();
        win.seek(offset);
        let item = PdfParser::new(&mut win, self.options)
            .with_health(self.health)
            .next_item()?;
        let Some((_, Item::Indirect(obj))) = item else {
            return Err(PdfError::SyntaxError(format!(
                "expected xref stream object at offset {offset}"
            )));
        };
        let stream = obj.value().as_stream()?;
        let dict = &stream.dict;
        let desc = &stream.descriptor;

        let raw = win.read_at(desc.data_offset, desc.length as usize)?;
        let data = decode_chain(self.decoder, raw.to_vec(), &desc.filters)?;

        let widths: Vec<usize> = dict
            .get("W")
            .ok_or_else(|| PdfError::SyntaxError("missing W in xref stream".into()))?
            .as_array()?
            .iter()
            .map(|w| {
                w.as_int()
                    .ok()
                    .and_then(|n| usize::try_from(n).ok())
                    .filter(|&n| n <= 8)
                    .ok_or_else(|| PdfError::SyntaxError("bad W entry in xref stream".into()))
            })
            .collect::<Result<_>>()?;
        let [w0, w1, w2] = widths[..] else {
            return Err(PdfError::SyntaxError("W must have 3 elements".into()));
        };
        let entry_size = w0 + w1 + w2;
        if entry_size == 0 {
            return Err(PdfError::SyntaxError("xref stream W sums to 0".into()));
        }

        let size = dict_int(dict, "Size").unwrap_or(0).max(0) as u64;
        let index: Vec<(u64, u64)> = match dict.get("Index").and_then(|i| i.as_array().ok()) {
            Some(arr) => arr
                .chunks_exact(2)
                .filter_map(|pair| {
                    let start = u64::try_from(pair[0].as_int().ok()?).ok()?;
                    let count = u64::try_from(pair[1].as_int().ok()?).ok()?;
                    Some((start, count))
                })
                .collect(),
            None => vec![(0, size)],
        };

        let field = |rec: &[u8], at: usize, width: usize, default: u64| {
            if width == 0 {
                default
            } else {
                BigEndian::read_uint(&rec[at..at + width], width)
            }
        };

        let mut records = data.chunks_exact(entry_size);
        let mut rows = Vec::new();
        'ranges: for (start, count) in index {
            for i in 0..count {
                let Some(rec) = records.next() else {
                    tracing::debug!(offset, "xref stream shorter than its /Index");
                    break 'ranges;
                };
                let Ok(obj_num) = u32::try_from(start + i) else {
                    break 'ranges;
                };
                let kind = field(rec, 0, w0, 1);
                let f2 = field(rec, w0, w1, 0);
                let f3 = field(rec, w0 + w1, w2, 0);
                let (gen_num, location) = match kind {
                    0 => (clamp_gen(f3), XRefLocation::Free),
                    1 => (clamp_gen(f3), XRefLocation::Direct(f2)),
                    2 => (
                        0,
                        XRefLocation::Compressed {
                            container: u32::try_from(f2).unwrap_or(u32::MAX),
                            index: u32::try_from(f3).unwrap_or(u32::MAX),
                        },
                    ),
                    _ => continue,
                };
                rows.push(XRefRow {
                    obj_num,
                    gen_num,
                    location,
                });
            }
        }

        tracing::trace!(offset, rows = rows.len(), "read xref stream section");
        Ok(XRefSection {
            offset,
            kind: SectionKind::Stream,
            rows,
            trailer: Trailer::from_dict(dict.clone(), offset),
        })
    }

    /// Walk the declared chain from `startxref` through every `/Prev`.
    pub fn walk(&self, cursor: &mut ByteCursor) -> Result<ChainWalk> {
        let startxref = self.find_startxref(cursor)?;
        let mut walk = ChainWalk::default();
        let mut visited = FxHashSet::default();
        let mut deferred = Vec::new();
        let mut next = Some(startxref);
        let mut newest = true;

        while let Some(offset) = next.take() {
            if !visited.insert(offset) {
                tracing::debug!(offset, "xref chain revisits an offset, stopping");
                break;
            }
            let section = if newest {
                self.read_newest(cursor, offset)?
            } else {
                match self.read_section(cursor, offset) {
                    Ok(section) => section,
                    Err(e) => {
                        self.health.record(
                            IssueKind::BrokenRevision,
                            Some(offset),
                            format!("older revision unreadable: {e}"),
                        );
                        break;
                    }
                }
            };
            newest = false;

            let added = walk.merge(section.rows);
            tracing::debug!(offset, kind = ?section.kind, added, "merged xref section");

            let trailer = section.trailer;
            if let Some(stm) = trailer.xref_stm {
                match self.options.hybrid_precedence {
                    HybridPrecedence::XRefStmBeforePrev => {
                        self.merge_xref_stm(cursor, stm, &mut walk, &mut visited)
                    }
                    HybridPrecedence::PrevBeforeXRefStm => deferred.push(stm),
                }
            }
            next = trailer.prev;
            walk.trailers.push(trailer);
        }

        for stm in deferred {
            self.merge_xref_stm(cursor, stm, &mut walk, &mut visited);
        }

        if walk.rows.is_empty() {
            return Err(PdfError::NoValidXRef);
        }
        Ok(walk)
    }

    fn merge_xref_stm(
        &self,
        cursor: &mut ByteCursor,
        offset: u64,
        walk: &mut ChainWalk,
        visited: &mut FxHashSet<u64>,
    ) {
        if !visited.insert(offset) {
            return;
        }
        match self.read_stream_section(cursor, offset) {
            Ok(section) => {
                let added = walk.merge(section.rows);
                tracing::debug!(offset, added, "merged hybrid /XRefStm section");
            }
            Err(e) => self.health.record(
                IssueKind::BrokenRevision,
                Some(offset),
                format!("/XRefStm unreadable: {e}"),
            ),
        }
    }

    /// Scan the whole file for object headers, `trailer` keywords and
    /// `/Type` markers.
    pub fn scan(&self, cursor: &mut ByteCursor) -> Result<ScanResult> {
        let len = cursor.len();
        let (end, truncated) = self.options.bounded_scan(len);
        if truncated {
            if self.options.strict {
                return Err(PdfError::ScanLimitExceeded {
                    offset: 0,
                    limit: end,
                });
            }
            self.health.record(
                IssueKind::ScanLimitReached,
                Some(end),
                format!("linear scan stopped after {end} of {len} bytes"),
            );
        }
        let mut result = ScanResult::default();
        let mut win = cursor.window();
        let mut chunk_start = 0u64;

        while chunk_start < end {
            let chunk_end = (chunk_start + SCAN_CHUNK as u64).min(end);
            // One byte of look-behind so a digit run split at the boundary is
            // attributed to the earlier chunk.
            let read_start = chunk_start.saturating_sub(1);
            win.seek(read_start);
            let want = (chunk_end - read_start) as usize + SCAN_OVERLAP;
            let data = win.read(want)?;

            for caps in SCAN_MARKERS.captures_iter(&data) {
                let Some(whole) = caps.get(0) else { continue };
                let pos = read_start + whole.start() as u64;
                if pos < chunk_start || pos >= chunk_end {
                    continue;
                }
                if let (Some(num), Some(gen_num)) = (caps.name("num"), caps.name("gen")) {
                    let obj_num = parse_decimal(num.as_bytes()).and_then(|n| u32::try_from(n).ok());
                    let gen_num =
                        parse_decimal(gen_num.as_bytes()).and_then(|n| u16::try_from(n).ok());
                    if let (Some(obj_num), Some(gen_num)) = (obj_num, gen_num) {
                        result.objects.push(ScannedObject {
                            obj_num,
                            gen_num,
                            offset: pos,
                        });
                    }
                } else if let Some(ty) = caps.name("ty") {
                    let marker = match ty.as_bytes() {
                        b"ObjStm" => ScanMarker::ObjStm,
                        b"XRef" => ScanMarker::XRef,
                        _ => ScanMarker::Catalog,
                    };
                    result.markers.push((pos, marker));
                } else {
                    result.trailers.push(pos);
                }
            }
            chunk_start = chunk_end;
        }

        tracing::debug!(
            objects = result.objects.len(),
            trailers = result.trailers.len(),
            markers = result.markers.len(),
            "linear scan finished"
        );
        Ok(result)
    }

    /// Parse the dictionary following the `trailer` keyword at `offset`.
    pub fn read_trailer_at(&self, cursor: &mut ByteCursor, offset: u64) -> Result<Trailer> {
        let mut win = cursor.window();
        win.seek(offset);
        let mut parser = PdfParser::new(&mut win, self.options).with_health(self.health);
        match parser.next_item()? {
            Some((_, Item::Keyword(Keyword::Trailer))) => {}
            _ => {
                return Err(PdfError::SyntaxError(format!(
                    "expected trailer at offset {offset}"
                )));
            }
        }
        match parser.parse_object()? {
            Object::Dict(dict) => Ok(Trailer::from_dict(dict, offset)),
            other => Err(PdfError::TypeError {
                expected: "dict",
                got: other.type_name(),
            }),
        }
    }
}

fn expect_int(lexer: &mut Lexer<'_>) -> Result<i64> {
    match lexer.next_token()? {
        Some(Spanned {
            token: Token::Int(n),
            ..
        }) => Ok(n),
        Some(other) => Err(PdfError::SyntaxError(format!(
            "expected integer in xref table at offset {}",
            other.start
        ))),
        None => Err(PdfError::StreamExhausted {
            offset: lexer.tell(),
            msg: "xref table truncated".into(),
        }),
    }
}

fn expect_index(lexer: &mut Lexer<'_>) -> Result<u32> {
    let at = lexer.tell();
    let n = expect_int(lexer)?;
    u32::try_from(n)
        .map_err(|_| PdfError::SyntaxError(format!("xref subsection value {n} at offset {at}")))
}

fn clamp_gen(value: u64) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

fn parse_decimal(digits: &[u8]) -> Option<u64> {
    digits.iter().try_fold(0u64, |acc, &d| {
        acc.checked_mul(10)?.checked_add((d - b'0') as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StandardDecoder;

    fn reader_parts() -> (ParseOptions, HealthReport) {
        (ParseOptions::default(), HealthReport::new())
    }

    #[test]
    fn classic_scenario_rows() {
        let data = b"xref\n0 3\n0000000000 65535 f \n0000000010 00000 n \n0000000020 00000 n \ntrailer\n<< /Size 3 /Root 1 0 R >>\n";
        let (options, health) = reader_parts();
        let reader = XRefReader::new(&options, &health, &StandardDecoder);
        let mut cursor = ByteCursor::from_bytes(&data[..]);
        let section = reader.read_classic(&mut cursor, 0).unwrap();
        assert_eq!(
            section.rows,
            vec![
                XRefRow {
                    obj_num: 0,
                    gen_num: 65535,
                    location: XRefLocation::Free
                },
                XRefRow {
                    obj_num: 1,
                    gen_num: 0,
                    location: XRefLocation::Direct(10)
                },
                XRefRow {
                    obj_num: 2,
                    gen_num: 0,
                    location: XRefLocation::Direct(20)
                },
            ]
        );
        assert_eq!(section.trailer.root, Some(ObjRef::new(1, 0)));
        assert_eq!(section.trailer.prev, None);
        assert_eq!(cursor.tell(), 0);
    }

    #[test]
    fn subsection_starting_at_one_is_rebased() {
        let data = b"xref\n1 2\n0000000000 65535 f\r\n0000000017 00000 n\r\ntrailer << /Size 2 >>";
        let (options, health) = reader_parts();
        let reader = XRefReader::new(&options, &health, &StandardDecoder);
        let mut cursor = ByteCursor::from_bytes(&data[..]);
        let section = reader.read_classic(&mut cursor, 0).unwrap();
        assert_eq!(section.rows[1].obj_num, 1);
        assert_eq!(section.rows[1].location, XRefLocation::Direct(17));
        assert!(health.contains(IssueKind::XRefSubsectionRebased));
    }

    #[test]
    fn multiple_subsections() {
        let data = b"xref 0 1\n0000000000 65535 f\n5 2\n0000000100 00000 n\n0000000200 00001 n\ntrailer<</Size 7>>";
        let (options, health) = reader_parts();
        let reader = XRefReader::new(&options, &health, &StandardDecoder);
        let mut cursor = ByteCursor::from_bytes(&data[..]);
        let section = reader.read_classic(&mut cursor, 0).unwrap();
        let keys: Vec<(u32, u16)> = section.rows.iter().map(XRefRow::key).collect();
        assert_eq!(keys, vec![(0, 65535), (5, 0), (6, 1)]);
        assert_eq!(section.trailer.size, Some(7));
    }

    #[test]
    fn startxref_and_missing_eof() {
        let data = b"junk\nstartxref\n1234\n";
        let (options, health) = reader_parts();
        let reader = XRefReader::new(&options, &health, &StandardDecoder);
        let mut cursor = ByteCursor::from_bytes(&data[..]);
        assert_eq!(reader.find_startxref(&mut cursor).unwrap(), 1234);
        assert!(health.contains(IssueKind::MissingEof));

        let strict = ParseOptions::strict();
        let reader = XRefReader::new(&strict, &health, &StandardDecoder);
        assert!(matches!(
            reader.find_startxref(&mut cursor),
            Err(PdfError::MissingEof)
        ));
    }

    #[test]
    fn scan_finds_headers_and_markers() {
        let data = b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\n12 3 obj 5 endobj\ntrailer << /Root 1 0 R >>\n";
        let (options, health) = reader_parts();
        let reader = XRefReader::new(&options, &health, &StandardDecoder);
        let mut cursor = ByteCursor::from_bytes(&data[..]);
        let scan = reader.scan(&mut cursor).unwrap();
        let keys: Vec<(u32, u16)> = scan.objects.iter().map(|o| (o.obj_num, o.gen_num)).collect();
        assert_eq!(keys, vec![(1, 0), (12, 3)]);
        assert_eq!(scan.objects[0].offset, 9);
        assert_eq!(scan.trailers.len(), 1);
        let catalogs = scan.objects_marked(ScanMarker::Catalog);
        assert_eq!(catalogs[0].obj_num, 1);
        let trailer = reader.read_trailer_at(&mut cursor, scan.trailers[0]).unwrap();
        assert_eq!(trailer.root, Some(ObjRef::new(1, 0)));
    }

    #[test]
    fn trailer_fields() {
        let mut dict = Dictionary::new();
        dict.insert("Size".into(), Object::Int(3));
        dict.insert("Prev".into(), Object::Int(400));
        dict.insert(
            "ID".into(),
            Object::Array(vec![
                Object::String(b"ab".to_vec()),
                Object::String(b"cd".to_vec()),
            ]),
        );
        let trailer = Trailer::from_dict(dict, 10);
        assert_eq!(trailer.prev, Some(400));
        assert_eq!(trailer.id, vec![b"ab".to_vec(), b"cd".to_vec()]);
        assert!(trailer.root.is_none());
    }
}
