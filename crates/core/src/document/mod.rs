//! Document layer: cross-reference index, trailers, pages and health.
//!
//! - `xref` - classic and stream xref sections, the `/Prev` chain walk, linear scan
//! - `index` - `XRefIndex`, lazy object resolution and caches
//! - `catalog` - `Document`, the consumer surface
//! - `builder` - `DocumentBuilder` for options and collaborators
//! - `page` - page tree walking
//! - `health` - recoverable issue log
//! - `security` - decryption collaborator

pub mod builder;
pub mod catalog;
pub mod health;
pub mod index;
pub mod page;
pub mod security;
pub mod xref;

pub use builder::DocumentBuilder;
pub use catalog::Document;
pub use health::{HealthIssue, HealthReport, IssueKind};
pub use index::{ObjectStreamPayload, XRefIndex};
pub use page::{DEFAULT_MEDIA_BOX, Page, PageIter};
pub use security::{Decryptor, EncryptionContext};
pub use xref::{SectionKind, Trailer, XRefLocation, XRefReader, XRefRow, XRefSection};
