//! Seekable buffered byte cursor.
//!
//! The cursor keeps a logical position separate from the physical position
//! of the underlying source. Reads refill a single buffer on demand, so a
//! document is never loaded into memory as a whole. [`ByteCursor::window`]
//! hands out a guard that puts the logical position back when dropped, which
//! is what lets a nested resolution seek elsewhere in the middle of parsing an
//! unrelated object.

use crate::error::{PdfError, Result};
use bytes::Bytes;
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::{Deref, DerefMut};

/// Anything the cursor can read from.
pub trait ByteSource: Read + Seek {}

impl<T: Read + Seek> ByteSource for T {}

const DEFAULT_BUFFER_SIZE: usize = 8192;

pub struct ByteCursor {
    source: Box<dyn ByteSource>,
    len: u64,
    pos: u64,
    buf: Vec<u8>,
    buf_start: u64,
    buffer_size: usize,
}

impl std::fmt::Debug for ByteCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteCursor")
            .field("len", &self.len)
            .field("pos", &self.pos)
            .field("buf_start", &self.buf_start)
            .field("buffered", &self.buf.len())
            .finish()
    }
}

impl ByteCursor {
    /// Wrap a seekable source. The source length is measured once.
    pub fn new(source: impl ByteSource + 'static) -> Result<Self> {
        Self::with_buffer_size(source, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(mut source: impl ByteSource + 'static, buffer_size: usize) -> Result<Self> {
        let len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;
        Ok(Self {
            source: Box::new(source),
            len,
            pos: 0,
            buf: Vec::new(),
            buf_start: 0,
            buffer_size: buffer_size.max(64),
        })
    }

    /// Cursor over an in-memory payload (decoded object streams, tests).
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        let len = data.len() as u64;
        let buffer_size = DEFAULT_BUFFER_SIZE.max(data.len().min(1 << 20));
        Self {
            source: Box::new(io::Cursor::new(data)),
            len,
            pos: 0,
            buf: Vec::new(),
            buf_start: 0,
            buffer_size,
        }
    }

    /// Total length of the source in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current logical position.
    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// Move the logical position. Seeking past the end is allowed; reads
    /// from there report end of file.
    pub fn seek(&mut self, offset: u64) {
        self.pos = offset;
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.len
    }

    /// Save the current position; it is restored when the guard drops, on
    /// every exit path including `?` propagation.
    pub fn window(&mut self) -> Window<'_> {
        let saved = self.pos;
        Window {
            cursor: self,
            saved,
        }
    }

    fn buffered(&self) -> bool {
        self.pos >= self.buf_start && self.pos < self.buf_start + self.buf.len() as u64
    }

    fn refill(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf_start = self.pos;
        if self.pos >= self.len {
            return Ok(());
        }
        self.source.seek(SeekFrom::Start(self.pos))?;
        let want = self.buffer_size.min((self.len - self.pos) as usize);
        self.buf.resize(want, 0);
        let mut filled = 0;
        while filled < want {
            match self.source.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.buf.truncate(filled);
        Ok(())
    }

    /// Byte at the current position without advancing.
    pub fn peek_byte(&mut self) -> Result<Option<u8>> {
        if !self.buffered() {
            self.refill()?;
        }
        Ok(self.buf.get((self.pos - self.buf_start) as usize).copied())
    }

    /// Byte at the current position, advancing past it.
    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        let b = self.peek_byte()?;
        if b.is_some() {
            self.pos += 1;
        }
        Ok(b)
    }

    /// Read up to `n` bytes. Short at end of file; empty means end of file.
    pub fn read(&mut self, n: usize) -> Result<Bytes> {
        let available = self.len.saturating_sub(self.pos).min(n as u64) as usize;
        let mut out = Vec::with_capacity(available);
        while out.len() < available {
            if !self.buffered() {
                self.refill()?;
                if self.buf.is_empty() {
                    break;
                }
            }
            let start = (self.pos - self.buf_start) as usize;
            let take = (available - out.len()).min(self.buf.len() - start);
            out.extend_from_slice(&self.buf[start..start + take]);
            self.pos += take as u64;
        }
        Ok(Bytes::from(out))
    }

    /// Read exactly `n` bytes or fail with `StreamExhausted`.
    pub fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        let offset = self.pos;
        let data = self.read(n)?;
        if data.len() < n {
            return Err(PdfError::StreamExhausted {
                offset,
                msg: format!("wanted {} bytes, got {}", n, data.len()),
            });
        }
        Ok(data)
    }

    /// Read `n` bytes at `offset` without disturbing the current position.
    pub fn read_at(&mut self, offset: u64, n: usize) -> Result<Bytes> {
        let mut win = self.window();
        win.seek(offset);
        win.read(n)
    }

    /// Offset of the first occurrence of `needle` within `limit` bytes of the
    /// current position. The position is left untouched.
    pub fn find_forward(&mut self, needle: &[u8], limit: u64) -> Result<Option<u64>> {
        if needle.is_empty() {
            return Ok(Some(self.pos));
        }
        let mut win = self.window();
        let start = win.pos;
        let end = start.saturating_add(limit).min(win.len);
        let chunk = win.buffer_size.max(needle.len() * 2);
        let mut at = start;
        while at < end {
            win.seek(at);
            let want = chunk.min((end - at) as usize);
            let data = win.read(want)?;
            if data.len() < needle.len() {
                break;
            }
            if let Some(i) = find_subslice(&data, needle) {
                return Ok(Some(at + i as u64));
            }
            if at + data.len() as u64 >= end {
                break;
            }
            at += (data.len() - (needle.len() - 1)) as u64;
        }
        Ok(None)
    }

    /// Offset of the last occurrence of `needle` within the final `limit`
    /// bytes of the source. The position is left untouched.
    pub fn rfind_from_end(&mut self, needle: &[u8], limit: u64) -> Result<Option<u64>> {
        if needle.is_empty() || self.len < needle.len() as u64 {
            return Ok(None);
        }
        let mut win = self.window();
        let floor = win.len.saturating_sub(limit);
        let chunk = win.buffer_size.max(needle.len() * 2) as u64;
        let mut end = win.len;
        while end > floor {
            let start = end.saturating_sub(chunk).max(floor);
            win.seek(start);
            let data = win.read((end - start) as usize)?;
            if let Some(i) = rfind_subslice(&data, needle) {
                return Ok(Some(start + i as u64));
            }
            if start == floor {
                break;
            }
            end = start + needle.len() as u64 - 1;
        }
        Ok(None)
    }
}

/// Scoped position guard returned by [`ByteCursor::window`].
pub struct Window<'a> {
    cursor: &'a mut ByteCursor,
    saved: u64,
}

impl Window<'_> {
    /// Position that will be restored on drop.
    pub fn saved_position(&self) -> u64 {
        self.saved
    }
}

impl Deref for Window<'_> {
    type Target = ByteCursor;

    fn deref(&self) -> &ByteCursor {
        self.cursor
    }
}

impl DerefMut for Window<'_> {
    fn deref_mut(&mut self) -> &mut ByteCursor {
        self.cursor
    }
}

impl Drop for Window<'_> {
    fn drop(&mut self) {
        self.cursor.pos = self.saved;
    }
}

pub(crate) fn find_subslice(hay: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    hay.windows(needle.len()).position(|w| w == needle)
}

pub(crate) fn rfind_subslice(hay: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    hay.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(data: &[u8]) -> ByteCursor {
        ByteCursor::with_buffer_size(io::Cursor::new(data.to_vec()), 64).unwrap()
    }

    #[test]
    fn read_is_short_at_eof_and_empty_after() {
        let mut c = cursor(b"hello");
        assert_eq!(&c.read(3).unwrap()[..], b"hel");
        assert_eq!(&c.read(10).unwrap()[..], b"lo");
        assert!(c.read(10).unwrap().is_empty());
        assert!(c.at_eof());
    }

    #[test]
    fn read_exact_reports_stream_exhausted() {
        let mut c = cursor(b"abc");
        c.seek(1);
        let err = c.read_exact(5).unwrap_err();
        assert!(matches!(err, PdfError::StreamExhausted { offset: 1, .. }));
    }

    #[test]
    fn reads_span_buffer_refills() {
        let data: Vec<u8> = (0..200u8).collect();
        let mut c = cursor(&data);
        let all = c.read(200).unwrap();
        assert_eq!(&all[..], &data[..]);
        c.seek(63);
        assert_eq!(c.next_byte().unwrap(), Some(63));
        assert_eq!(c.next_byte().unwrap(), Some(64));
        assert_eq!(c.tell(), 65);
    }

    #[test]
    fn window_restores_position_on_error_path() {
        let mut c = cursor(b"0123456789");
        c.seek(4);
        let result: Result<Bytes> = (|| {
            let mut win = c.window();
            win.seek(8);
            win.read_exact(10)
        })();
        assert!(result.is_err());
        assert_eq!(c.tell(), 4);
    }

    #[test]
    fn nested_windows_unwind_in_order() {
        let mut c = cursor(b"0123456789");
        c.seek(1);
        {
            let mut outer = c.window();
            outer.seek(5);
            {
                let mut inner = outer.window();
                inner.seek(9);
                assert_eq!(inner.next_byte().unwrap(), Some(b'9'));
            }
            assert_eq!(outer.tell(), 5);
        }
        assert_eq!(c.tell(), 1);
    }

    #[test]
    fn find_forward_crosses_chunk_boundaries() {
        let mut data = vec![b'x'; 300];
        data.extend_from_slice(b"endstream");
        let mut c = cursor(&data);
        c.seek(10);
        assert_eq!(c.find_forward(b"endstream", 1000).unwrap(), Some(300));
        assert_eq!(c.find_forward(b"endstream", 100).unwrap(), None);
        assert_eq!(c.tell(), 10);
    }

    #[test]
    fn rfind_from_end_finds_last_occurrence() {
        let mut data = b"startxref 1 ".to_vec();
        data.extend(vec![b' '; 150]);
        data.extend_from_slice(b"startxref 2\n%%EOF");
        let mut c = cursor(&data);
        let last = c.rfind_from_end(b"startxref", 4096).unwrap().unwrap();
        assert_eq!(&c.read_at(last, 11).unwrap()[..], b"startxref 2");
        assert_eq!(c.tell(), 0);
    }
}
