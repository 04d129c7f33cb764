//! PDF tokenizer.
//!
//! Produces one [`Token`] per call straight off a [`ByteCursor`], buffering
//! only the token being scanned. The lexer is a total function over bytes:
//! anything it does not recognize comes back as a one-byte keyword, and it is
//! up to the parser to decide whether that is fatal. Restarting is a matter of
//! seeking the cursor.

use crate::cursor::ByteCursor;
use crate::error::{PdfError, Result};
use crate::model::Decimal;
use std::fmt;

/// Keywords the object layer cares about. Everything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Keyword {
    Obj,
    EndObj,
    Stream,
    EndStream,
    R,
    Xref,
    Trailer,
    StartXref,
    /// Unknown (preserves original bytes)
    Other(Vec<u8>),
}

impl Keyword {
    pub fn from_bytes(b: &[u8]) -> Self {
        match b {
            b"obj" => Keyword::Obj,
            b"endobj" => Keyword::EndObj,
            b"stream" => Keyword::Stream,
            b"endstream" => Keyword::EndStream,
            b"R" => Keyword::R,
            b"xref" => Keyword::Xref,
            b"trailer" => Keyword::Trailer,
            b"startxref" => Keyword::StartXref,
            _ => Keyword::Other(b.to_vec()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Keyword::Obj => b"obj",
            Keyword::EndObj => b"endobj",
            Keyword::Stream => b"stream",
            Keyword::EndStream => b"endstream",
            Keyword::R => b"R",
            Keyword::Xref => b"xref",
            Keyword::Trailer => b"trailer",
            Keyword::StartXref => b"startxref",
            Keyword::Other(bytes) => bytes.as_slice(),
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

/// Lexical tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `%` to end of line, line ending excluded
    Comment(Vec<u8>),
    Keyword(Keyword),
    /// `/Name` with `#xx` escapes decoded
    Name(String),
    Bool(bool),
    Null,
    /// `( … )` literal string
    String(Vec<u8>),
    /// `< … >` hex string
    HexString(Vec<u8>),
    Int(i64),
    Real(Decimal),
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
}

impl Token {
    /// Canonical source text for this token. Lexing the result yields an
    /// equal token.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Token::Comment(text) => {
                let mut out = Vec::with_capacity(text.len() + 1);
                out.push(b'%');
                out.extend_from_slice(text);
                out
            }
            Token::Keyword(kw) => kw.as_bytes().to_vec(),
            Token::Name(name) => encode_name(name),
            Token::Bool(true) => b"true".to_vec(),
            Token::Bool(false) => b"false".to_vec(),
            Token::Null => b"null".to_vec(),
            Token::String(bytes) => encode_literal_string(bytes),
            Token::HexString(bytes) => {
                let mut out = Vec::with_capacity(bytes.len() * 2 + 2);
                out.push(b'<');
                for b in bytes {
                    out.extend_from_slice(format!("{b:02X}").as_bytes());
                }
                out.push(b'>');
                out
            }
            Token::Int(n) => n.to_string().into_bytes(),
            Token::Real(d) => d.to_string().into_bytes(),
            Token::ArrayStart => b"[".to_vec(),
            Token::ArrayEnd => b"]".to_vec(),
            Token::DictStart => b"<<".to_vec(),
            Token::DictEnd => b">>".to_vec(),
        }
    }
}

/// A token with its source byte range.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub start: u64,
    pub end: u64,
    pub token: Token,
}

/// Check if byte is whitespace
pub(crate) const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x00' | b'\x0c')
}

/// Check if byte is delimiter
pub(crate) const fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Check if byte ends a keyword, name or number
const fn is_token_end(b: u8) -> bool {
    is_whitespace(b) || is_delimiter(b)
}

const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

pub struct Lexer<'c> {
    cursor: &'c mut ByteCursor,
    strict: bool,
    /// Offsets of names whose invalid `#` escapes were kept verbatim.
    repaired_names: Vec<u64>,
    /// Offsets of non-hex bytes dropped from `<...>` strings.
    repaired_hex: Vec<u64>,
}

impl<'c> Lexer<'c> {
    /// A strict lexer: invalid `#` escapes in names and non-hex bytes in hex
    /// strings fail with `InvalidHexToken`.
    pub fn new(cursor: &'c mut ByteCursor) -> Self {
        Self {
            cursor,
            strict: true,
            repaired_names: Vec::new(),
            repaired_hex: Vec::new(),
        }
    }

    /// Keep invalid name escapes verbatim and drop non-hex bytes from hex
    /// strings instead of failing. Repairs are reported through
    /// [`Lexer::take_repaired_names`] and [`Lexer::take_repaired_hex`].
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn cursor(&mut self) -> &mut ByteCursor {
        self.cursor
    }

    /// Current position in stream
    pub fn tell(&self) -> u64 {
        self.cursor.tell()
    }

    /// Reposition; the next token is lexed from `offset`.
    pub fn seek(&mut self, offset: u64) {
        self.cursor.seek(offset);
    }

    pub fn take_repaired_names(&mut self) -> Vec<u64> {
        std::mem::take(&mut self.repaired_names)
    }

    pub fn take_repaired_hex(&mut self) -> Vec<u64> {
        std::mem::take(&mut self.repaired_hex)
    }

    /// Next token without consuming it.
    pub fn peek_token(&mut self) -> Result<Option<Spanned>> {
        let strict = self.strict;
        let mut win = self.cursor.window();
        let mut lexer = Lexer::new(&mut win);
        lexer.strict = strict;
        lexer.next_token()
    }

    /// Skip whitespace (comments are tokens and are not skipped)
    fn skip_whitespace(&mut self) -> Result<()> {
        while let Some(b) = self.cursor.peek_byte()? {
            if !is_whitespace(b) {
                break;
            }
            self.cursor.seek(self.cursor.tell() + 1);
        }
        Ok(())
    }

    /// Get next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Spanned>> {
        self.skip_whitespace()?;
        let start = self.cursor.tell();
        let Some(b) = self.cursor.peek_byte()? else {
            return Ok(None);
        };

        let token = match b {
            b'%' => self.lex_comment()?,
            b'/' => self.lex_name(start)?,
            b'(' => self.lex_literal_string(start)?,
            b'<' => {
                self.cursor.seek(start + 1);
                if self.cursor.peek_byte()? == Some(b'<') {
                    self.cursor.seek(start + 2);
                    Token::DictStart
                } else {
                    self.lex_hex_string(start)?
                }
            }
            b'>' => {
                self.cursor.seek(start + 1);
                if self.cursor.peek_byte()? == Some(b'>') {
                    self.cursor.seek(start + 2);
                    Token::DictEnd
                } else {
                    // Lone '>' - shouldn't happen in valid PDF but handle it
                    Token::Keyword(Keyword::Other(b">".to_vec()))
                }
            }
            b'[' => {
                self.cursor.seek(start + 1);
                Token::ArrayStart
            }
            b']' => {
                self.cursor.seek(start + 1);
                Token::ArrayEnd
            }
            b')' | b'{' | b'}' => {
                self.cursor.seek(start + 1);
                Token::Keyword(Keyword::Other(vec![b]))
            }
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.lex_number_or_keyword()?,
            _ => self.lex_keyword()?,
        };

        Ok(Some(Spanned {
            start,
            end: self.cursor.tell(),
            token,
        }))
    }

    /// Parse a comment (`%` to end of line)
    fn lex_comment(&mut self) -> Result<Token> {
        self.cursor.next_byte()?; // Skip '%'
        let mut text = Vec::new();
        while let Some(b) = self.cursor.peek_byte()? {
            if b == b'\r' || b == b'\n' {
                break;
            }
            text.push(b);
            self.cursor.next_byte()?;
        }
        Ok(Token::Comment(text))
    }

    /// Parse a literal name (/Name)
    fn lex_name(&mut self, start: u64) -> Result<Token> {
        self.cursor.next_byte()?; // Skip '/'
        let mut name = Vec::new();
        let mut invalid_escape = false;

        while let Some(b) = self.cursor.peek_byte()? {
            if is_token_end(b) {
                break;
            }
            self.cursor.next_byte()?;
            if b != b'#' {
                name.push(b);
                continue;
            }
            // Hex escape in name - peek ahead to check for valid hex
            let at = self.cursor.tell();
            let h1 = self.cursor.next_byte()?.and_then(hex_value);
            let h2 = self.cursor.next_byte()?.and_then(hex_value);
            match (h1, h2) {
                (Some(hi), Some(lo)) => name.push((hi << 4) | lo),
                _ => {
                    invalid_escape = true;
                    self.cursor.seek(at);
                    name.push(b'#');
                }
            }
        }

        if invalid_escape {
            if self.strict {
                return Err(PdfError::InvalidHexToken { offset: start });
            }
            self.repaired_names.push(start);
        }
        Ok(Token::Name(name_from_bytes(&name)))
    }

    /// Parse a number (integer or real); a sign or dot with no digits is a keyword
    fn lex_number_or_keyword(&mut self) -> Result<Token> {
        let mut text = Vec::with_capacity(16);
        let mut has_dot = false;

        // Handle sign
        if let Some(b @ (b'+' | b'-')) = self.cursor.peek_byte()? {
            text.push(b);
            self.cursor.next_byte()?;
        }

        // Parse digits and at most one dot
        while let Some(b) = self.cursor.peek_byte()? {
            if b.is_ascii_digit() {
                text.push(b);
            } else if b == b'.' && !has_dot {
                has_dot = true;
                text.push(b);
            } else {
                break;
            }
            self.cursor.next_byte()?;
        }

        if !text.iter().any(u8::is_ascii_digit) {
            // "+", "-", "." or "-." followed by something else
            return self.finish_keyword(text);
        }

        if !has_dot && let Some(n) = parse_i64(&text) {
            return Ok(Token::Int(n));
        }
        match Decimal::parse_bytes(&text) {
            Some(d) => Ok(Token::Real(d)),
            None => self.finish_keyword(text),
        }
    }

    /// Parse a keyword
    fn lex_keyword(&mut self) -> Result<Token> {
        self.finish_keyword(Vec::new())
    }

    fn finish_keyword(&mut self, mut bytes: Vec<u8>) -> Result<Token> {
        while let Some(b) = self.cursor.peek_byte()? {
            if is_token_end(b) {
                break;
            }
            bytes.push(b);
            self.cursor.next_byte()?;
        }
        if bytes.is_empty() {
            // Unreachable for well-formed dispatch, but stay total
            if let Some(b) = self.cursor.next_byte()? {
                bytes.push(b);
            }
        }
        Ok(match bytes.as_slice() {
            b"true" => Token::Bool(true),
            b"false" => Token::Bool(false),
            b"null" => Token::Null,
            _ => Token::Keyword(Keyword::from_bytes(&bytes)),
        })
    }

    /// Parse a literal string (...)
    fn lex_literal_string(&mut self, start: u64) -> Result<Token> {
        self.cursor.next_byte()?; // Skip '('
        let mut result = Vec::new();
        let mut depth = 1;

        while depth > 0 {
            match self.next_in_string(start)? {
                b'(' => {
                    depth += 1;
                    result.push(b'(');
                }
                b')' => {
                    depth -= 1;
                    if depth > 0 {
                        result.push(b')');
                    }
                }
                b'\\' => match self.next_in_string(start)? {
                    b'n' => result.push(b'\n'),
                    b'r' => result.push(b'\r'),
                    b't' => result.push(b'\t'),
                    b'b' => result.push(0x08),
                    b'f' => result.push(0x0c),
                    b'(' => result.push(b'('),
                    b')' => result.push(b')'),
                    b'\\' => result.push(b'\\'),
                    b'\r' => {
                        // Line continuation - skip \r and optional \n
                        if self.cursor.peek_byte()? == Some(b'\n') {
                            self.cursor.next_byte()?;
                        }
                    }
                    b'\n' => {
                        // Line continuation - skip newline
                    }
                    c @ b'0'..=b'7' => {
                        // Octal escape (1-3 digits)
                        let mut octal = (c - b'0') as u32;
                        for _ in 0..2 {
                            match self.cursor.peek_byte()? {
                                Some(d @ b'0'..=b'7') => {
                                    self.cursor.next_byte()?;
                                    octal = octal * 8 + (d - b'0') as u32;
                                }
                                _ => break,
                            }
                        }
                        result.push((octal & 0xFF) as u8);
                    }
                    // Unknown escape, just keep the character
                    c => result.push(c),
                },
                c => result.push(c),
            }
        }

        Ok(Token::String(result))
    }

    fn next_in_string(&mut self, start: u64) -> Result<u8> {
        self.cursor
            .next_byte()?
            .ok_or_else(|| PdfError::StreamExhausted {
                offset: start,
                msg: "unterminated string".into(),
            })
    }

    /// Parse a hex string <...>
    fn lex_hex_string(&mut self, start: u64) -> Result<Token> {
        // '<' already consumed by the dispatcher
        let mut result = Vec::new();
        let mut pending: Option<u8> = None;

        loop {
            let Some(c) = self.cursor.peek_byte()? else {
                return Err(PdfError::StreamExhausted {
                    offset: start,
                    msg: "unterminated hex string".into(),
                });
            };
            if c == b'>' {
                self.cursor.next_byte()?;
                break;
            }
            if let Some(nibble) = hex_value(c) {
                if let Some(high) = pending.take() {
                    result.push((high << 4) | nibble);
                } else {
                    pending = Some(nibble);
                }
            } else if !is_whitespace(c) {
                let at = self.cursor.tell();
                if self.strict {
                    return Err(PdfError::InvalidHexToken { offset: at });
                }
                self.repaired_hex.push(at);
            }
            self.cursor.next_byte()?;
        }

        // Odd digit count: the missing low nibble is 0
        if let Some(high) = pending {
            result.push(high << 4);
        }

        Ok(Token::HexString(result))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Spanned>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

fn parse_i64(text: &[u8]) -> Option<i64> {
    let (negative, digits) = match text.first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let mut value: i64 = 0;
    for &d in digits {
        let digit = (d - b'0') as i64;
        value = value.checked_mul(10)?;
        value = if negative {
            value.checked_sub(digit)?
        } else {
            value.checked_add(digit)?
        };
    }
    Some(value)
}

/// Names are byte strings; each byte maps to the char with the same value.
pub(crate) fn name_from_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn encode_name(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len() + 1);
    out.push(b'/');
    for ch in name.chars() {
        let b = u32::from(ch).min(0xFF) as u8;
        if (0x21..=0x7E).contains(&b) && !is_delimiter(b) && b != b'#' {
            out.push(b);
        } else {
            out.extend_from_slice(format!("#{b:02X}").as_bytes());
        }
    }
    out
}

fn encode_literal_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0c => out.extend_from_slice(b"\\f"),
            0x20..=0x7E => out.push(b),
            _ => out.extend_from_slice(format!("\\{b:03o}").as_bytes()),
        }
    }
    out.push(b')');
    out
}
