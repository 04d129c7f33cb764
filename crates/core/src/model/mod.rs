//! PDF model types.
//!
//! - `objects` - object graph types (Object, ObjRef, Stream, IndirectObject)
//! - `decimal` - exact decimal used for reals

pub mod decimal;
pub mod objects;

// Re-export main types for convenience
pub use decimal::Decimal;
pub use objects::{
    DeclaredLength, Dictionary, FilterSpec, IndirectObject, ObjRef, Object, Stream,
    StreamDescriptor,
};
