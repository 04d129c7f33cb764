//! PDF object types.
//!
//! Objects are immutable once built. Dictionaries preserve insertion order.

use super::decimal::Decimal;
use crate::error::{PdfError, Result};
use indexmap::IndexMap;
use std::fmt;

/// Name → object mapping, in the order keys appeared in the file.
pub type Dictionary = IndexMap<String, Object>;

/// PDF Object types - the fundamental value type in PDF.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Real value, kept as an exact decimal
    Real(Decimal),
    /// Name object (e.g., /Type, /Font)
    Name(String),
    /// String (byte array), from either literal or hex syntax
    String(Vec<u8>),
    /// Array of objects
    Array(Vec<Self>),
    /// Dictionary (name -> object mapping)
    Dict(Dictionary),
    /// Stream (dictionary + byte range in the file)
    Stream(Box<Stream>),
    /// Indirect object reference
    Ref(ObjRef),
    /// Top-level comment
    Comment(Vec<u8>),
}

impl Object {
    /// Check if this is a null object
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get as boolean
    pub const fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(self.type_error("bool")),
        }
    }

    /// Get as integer
    pub const fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            _ => Err(self.type_error("int")),
        }
    }

    /// Get as exact decimal (integers widen losslessly)
    pub fn as_decimal(&self) -> Result<Decimal> {
        match self {
            Self::Int(n) => Ok(Decimal::from_int(*n)),
            Self::Real(d) => Ok(*d),
            _ => Err(self.type_error("number")),
        }
    }

    /// Get numeric value (int or real coerced to f64)
    pub fn as_num(&self) -> Result<f64> {
        match self {
            Self::Int(n) => Ok(*n as f64),
            Self::Real(d) => Ok(d.to_f64()),
            _ => Err(self.type_error("number")),
        }
    }

    /// Get as name string
    pub fn as_name(&self) -> Result<&str> {
        match self {
            Self::Name(s) => Ok(s),
            _ => Err(self.type_error("name")),
        }
    }

    /// Get as byte string
    pub fn as_string(&self) -> Result<&[u8]> {
        match self {
            Self::String(s) => Ok(s),
            _ => Err(self.type_error("string")),
        }
    }

    /// Get as array
    pub fn as_array(&self) -> Result<&[Self]> {
        match self {
            Self::Array(arr) => Ok(arr),
            _ => Err(self.type_error("array")),
        }
    }

    /// Get as dictionary. A stream answers with its dictionary.
    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Self::Dict(d) => Ok(d),
            Self::Stream(s) => Ok(&s.dict),
            _ => Err(self.type_error("dict")),
        }
    }

    /// Get as stream
    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => Err(self.type_error("stream")),
        }
    }

    /// Get as object reference
    pub const fn as_ref(&self) -> Result<ObjRef> {
        match self {
            Self::Ref(r) => Ok(*r),
            _ => Err(self.type_error("ref")),
        }
    }

    /// Get type name for error messages
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Name(_) => "name",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "ref",
            Self::Comment(_) => "comment",
        }
    }

    const fn type_error(&self, expected: &'static str) -> PdfError {
        PdfError::TypeError {
            expected,
            got: self.type_name(),
        }
    }
}

/// PDF indirect object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    pub obj_num: u32,
    pub gen_num: u16,
}

impl ObjRef {
    pub const fn new(obj_num: u32, gen_num: u16) -> Self {
        Self { obj_num, gen_num }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.obj_num, self.gen_num)
    }
}

/// `/Length` as it was declared in the stream dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredLength {
    Direct(i64),
    Indirect(ObjRef),
    Missing,
}

/// One step of a stream's filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub name: String,
    pub params: Option<Dictionary>,
}

/// Where a stream's payload lives. Decoding is deferred until requested.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Offset of the first payload byte, just after the `stream` EOL.
    pub data_offset: u64,
    pub declared_length: DeclaredLength,
    /// Payload length actually used; differs from the declared one when the
    /// parser had to locate `endstream` itself.
    pub length: u64,
    pub filters: Vec<FilterSpec>,
}

/// PDF Stream - dictionary attributes + payload descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub descriptor: StreamDescriptor,
    /// Indirect object that owns this stream (needed for decryption).
    pub owner: Option<ObjRef>,
}

impl Stream {
    /// Get attribute by name.
    pub fn get(&self, name: &str) -> Option<&Object> {
        self.dict.get(name)
    }

    /// Value of `/Type`, if it is a name.
    pub fn type_name(&self) -> Option<&str> {
        self.get("Type").and_then(|t| t.as_name().ok())
    }

    pub fn has_filters(&self) -> bool {
        !self.descriptor.filters.is_empty()
    }
}

/// A numbered top-level object, sealed at `endobj`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    pub obj_num: u32,
    pub gen_num: u16,
    /// Offset of the `N G obj` header (0 for members of object streams).
    pub header_offset: u64,
    pub inner: Option<Object>,
}

static NULL: Object = Object::Null;

impl IndirectObject {
    pub const fn new(obj_num: u32, gen_num: u16, header_offset: u64) -> Self {
        Self {
            obj_num,
            gen_num,
            header_offset,
            inner: None,
        }
    }

    pub const fn obj_ref(&self) -> ObjRef {
        ObjRef::new(self.obj_num, self.gen_num)
    }

    /// The sealed value; an empty `obj … endobj` reads as null.
    pub fn value(&self) -> &Object {
        self.inner.as_ref().unwrap_or(&NULL)
    }

    pub fn into_value(self) -> Object {
        self.inner.unwrap_or(Object::Null)
    }

    pub fn stream(&self) -> Option<&Stream> {
        match &self.inner {
            Some(Object::Stream(s)) => Some(s),
            _ => None,
        }
    }

    pub fn stream_descriptor(&self) -> Option<&StreamDescriptor> {
        self.stream().map(|s| &s.descriptor)
    }
}

/// Look up `key` and require a name.
pub fn dict_name<'a>(dict: &'a Dictionary, key: &str) -> Option<&'a str> {
    dict.get(key).and_then(|v| v.as_name().ok())
}

/// Look up `key` and require an integer.
pub fn dict_int(dict: &Dictionary, key: &str) -> Option<i64> {
    dict.get(key).and_then(|v| v.as_int().ok())
}

/// Look up `key` and require a reference.
pub fn dict_ref(dict: &Dictionary, key: &str) -> Option<ObjRef> {
    dict.get(key).and_then(|v| v.as_ref().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_report_type_errors() {
        let obj = Object::Name("Page".into());
        assert_eq!(obj.as_name().unwrap(), "Page");
        assert!(matches!(
            obj.as_int(),
            Err(PdfError::TypeError {
                expected: "int",
                got: "name"
            })
        ));
    }

    #[test]
    fn numbers_coerce_through_decimal() {
        assert_eq!(Object::Int(7).as_decimal().unwrap(), Decimal::from_int(7));
        let real = Object::Real(Decimal::new(25, 1));
        assert_eq!(real.as_num().unwrap(), 2.5);
        assert!(real.as_int().is_err());
    }

    #[test]
    fn dictionary_keeps_insertion_order() {
        let mut d = Dictionary::new();
        d.insert("Type".into(), Object::Name("Catalog".into()));
        d.insert("Pages".into(), Object::Ref(ObjRef::new(2, 0)));
        d.insert("Lang".into(), Object::String(b"en".to_vec()));
        let keys: Vec<&str> = d.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Type", "Pages", "Lang"]);
        assert_eq!(dict_ref(&d, "Pages"), Some(ObjRef::new(2, 0)));
        assert_eq!(dict_name(&d, "Type"), Some("Catalog"));
    }

    #[test]
    fn empty_indirect_object_reads_as_null() {
        let obj = IndirectObject::new(4, 0, 120);
        assert!(obj.value().is_null());
        assert!(obj.stream().is_none());
        assert_eq!(obj.obj_ref().to_string(), "4 0 R");
    }
}
