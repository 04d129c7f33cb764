//! strata - tolerant PDF ingestion.
//!
//! Turns a possibly damaged PDF into a navigable object graph: a buffered
//! [`cursor::ByteCursor`], a [`parser::Lexer`], a [`parser::PdfParser`], the
//! cross-reference [`document::XRefIndex`], and the page-tree walker behind
//! [`Document::iterate_pages`].
//!
//! ```ignore
//! use strata_core::Document;
//!
//! let doc = Document::open_path("report.pdf")?;
//! for page in doc.iterate_pages() {
//!     let page = page?;
//!     println!("{} {:?}", page.obj_ref, page.media_box);
//! }
//! print!("{}", doc.health_report());
//! ```

pub mod codec;
pub mod config;
pub mod cursor;
pub mod document;
pub mod error;
pub mod model;
pub mod parser;

pub use config::{HybridPrecedence, ParseOptions};
pub use cursor::ByteCursor;
pub use document::{Document, DocumentBuilder, HealthReport, IssueKind, Page};
pub use error::{PdfError, Result};
pub use model::{Dictionary, IndirectObject, ObjRef, Object};
