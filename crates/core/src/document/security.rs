//! Decryption collaborator.
//!
//! Key derivation and ciphers live outside this crate. A [`Decryptor`] is
//! handed the resolved `/Encrypt` dictionary and file ID through an
//! [`EncryptionContext`] and is called once per string or stream payload.

use crate::error::Result;
use crate::model::{Dictionary, ObjRef, Object};

/// State a decryptor needs to derive per-object keys.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptionContext {
    /// The resolved `/Encrypt` dictionary.
    pub encrypt: Dictionary,
    /// Trailer `/ID` strings; usually two.
    pub id: Vec<Vec<u8>>,
    /// Object holding `/Encrypt`, if it was indirect. Its strings are never
    /// decrypted.
    pub encrypt_ref: Option<ObjRef>,
}

impl EncryptionContext {
    /// First `/ID` entry, the one key derivation uses.
    pub fn file_id(&self) -> &[u8] {
        self.id.first().map(Vec::as_slice).unwrap_or_default()
    }
}

pub trait Decryptor {
    /// Decrypt one payload of object `obj_num gen_num`. `attrs` is the stream
    /// dictionary for stream payloads and `None` for strings.
    fn decrypt(
        &self,
        ctx: &EncryptionContext,
        obj_num: u32,
        gen_num: u16,
        data: &[u8],
        attrs: Option<&Dictionary>,
    ) -> Result<Vec<u8>>;
}

/// Decrypt every string reachable inside `obj`, in place.
///
/// Stream payloads are left alone; they are decrypted when their data is
/// read.
pub fn decrypt_strings(
    decryptor: &dyn Decryptor,
    ctx: &EncryptionContext,
    obj_num: u32,
    gen_num: u16,
    obj: &mut Object,
) -> Result<()> {
    match obj {
        Object::String(data) => {
            *data = decryptor.decrypt(ctx, obj_num, gen_num, data, None)?;
        }
        Object::Array(items) => {
            for item in items {
                decrypt_strings(decryptor, ctx, obj_num, gen_num, item)?;
            }
        }
        Object::Dict(dict) => {
            for value in dict.values_mut() {
                decrypt_strings(decryptor, ctx, obj_num, gen_num, value)?;
            }
        }
        Object::Stream(stream) => {
            for value in stream.dict.values_mut() {
                decrypt_strings(decryptor, ctx, obj_num, gen_num, value)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// XOR with `obj_num` so tests can tell which key was used.
    pub(crate) struct XorDecryptor;

    impl Decryptor for XorDecryptor {
        fn decrypt(
            &self,
            _ctx: &EncryptionContext,
            obj_num: u32,
            _gen_num: u16,
            data: &[u8],
            _attrs: Option<&Dictionary>,
        ) -> Result<Vec<u8>> {
            Ok(data.iter().map(|b| b ^ obj_num as u8).collect())
        }
    }

    fn ctx() -> EncryptionContext {
        EncryptionContext {
            encrypt: Dictionary::new(),
            id: vec![b"first".to_vec(), b"second".to_vec()],
            encrypt_ref: None,
        }
    }

    #[test]
    fn strings_are_decrypted_recursively() {
        let mut inner = Dictionary::new();
        inner.insert("T".into(), Object::String(vec![1 ^ 3, 2 ^ 3]));
        let mut obj = Object::Array(vec![
            Object::Dict(inner),
            Object::Int(7),
            Object::String(vec![b'a' ^ 3]),
        ]);
        decrypt_strings(&XorDecryptor, &ctx(), 3, 0, &mut obj).unwrap();

        let items = obj.as_array().unwrap();
        assert_eq!(
            items[0].as_dict().unwrap()["T"].as_string().unwrap(),
            &[1, 2]
        );
        assert_eq!(items[1], Object::Int(7));
        assert_eq!(items[2].as_string().unwrap(), b"a");
    }

    #[test]
    fn file_id_is_first_entry() {
        assert_eq!(ctx().file_id(), b"first");
        let empty = EncryptionContext {
            id: Vec::new(),
            ..ctx()
        };
        assert!(empty.file_id().is_empty());
    }
}
