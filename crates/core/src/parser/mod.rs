//! Tokenizer and object parser.
//!
//! - `lexer`: byte cursor → tokens
//! - `pdf_parser`: tokens → objects and indirect objects

pub mod lexer;
pub mod pdf_parser;

pub use lexer::{Keyword, Lexer, Spanned, Token};
pub use pdf_parser::{Item, PdfParser, Resolver, filter_chain, serialize_object};
