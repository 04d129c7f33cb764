//! Stream decoding collaborator.
//!
//! The ingestion core only needs one entry point: decode a payload for one
//! named filter. [`StandardDecoder`] covers Flate and LZW with predictors;
//! callers can plug in their own [`StreamDecoder`] for anything else.

pub mod predictor;

use crate::error::{PdfError, Result};
use crate::model::{Dictionary, FilterSpec, objects::dict_int};
use flate2::{Decompress, FlushDecompress, Status};
use weezl::{BitOrder, decode::Decoder};

pub use predictor::{PredictorParams, apply_predictor};

/// Decodes one filter step.
pub trait StreamDecoder {
    /// Decode `raw` with the filter `filter`. Unknown filters fail with
    /// [`PdfError::UnsupportedFilter`].
    fn decode(&self, raw: &[u8], filter: &str, params: Option<&Dictionary>) -> Result<Vec<u8>>;
}

/// Run a whole filter chain in declared order.
pub fn decode_chain(
    decoder: &dyn StreamDecoder,
    raw: Vec<u8>,
    filters: &[FilterSpec],
) -> Result<Vec<u8>> {
    let mut data = raw;
    for spec in filters {
        data = decoder.decode(&data, &spec.name, spec.params.as_ref())?;
    }
    Ok(data)
}

/// Flate and LZW, each followed by its `/Predictor`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardDecoder;

impl StreamDecoder for StandardDecoder {
    fn decode(&self, raw: &[u8], filter: &str, params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let decoded = match filter {
            "FlateDecode" | "Fl" => flate_decode(raw)?,
            "LZWDecode" | "LZW" => {
                let early_change = params.and_then(|p| dict_int(p, "EarlyChange")).unwrap_or(1);
                lzw_decode(raw, early_change)
            }
            other => return Err(PdfError::UnsupportedFilter(other.to_string())),
        };
        apply_predictor(decoded, params)
    }
}

/// Input fed to the inflater per step. Small steps bound how much decoded
/// output a corrupt block can take down with it.
const INFLATE_STEP: usize = 512;

/// Output of [`inflate`]: the bytes produced, and why decoding stopped
/// early if it did.
#[derive(Debug, Default)]
pub struct Inflated {
    pub data: Vec<u8>,
    pub stopped: Option<String>,
}

/// Inflate a zlib stream step by step, keeping the output produced before
/// any corruption or truncation.
pub fn inflate(data: &[u8]) -> Inflated {
    let mut z = Decompress::new(true);
    let mut out = Inflated {
        data: Vec::with_capacity(data.len().saturating_mul(3).max(64)),
        stopped: None,
    };
    loop {
        let consumed = (z.total_in() as usize).min(data.len());
        let input = &data[consumed..(consumed + INFLATE_STEP).min(data.len())];
        if out.data.len() == out.data.capacity() {
            out.data.reserve(out.data.capacity().max(4096));
        }
        let (in_before, out_before) = (z.total_in(), z.total_out());
        match z.decompress_vec(input, &mut out.data, FlushDecompress::None) {
            Ok(Status::StreamEnd) => return out,
            Ok(_) if z.total_in() != in_before || z.total_out() != out_before => {}
            Ok(_) if out.data.len() == out.data.capacity() => {}
            Ok(_) => {
                out.stopped = Some(if input.is_empty() {
                    "zlib stream truncated".to_string()
                } else {
                    "zlib stream stalled".to_string()
                });
                return out;
            }
            Err(e) => {
                out.stopped = Some(e.to_string());
                return out;
            }
        }
    }
}

/// Inflate a zlib stream. A damaged stream yields what decoded before the
/// damage; one that yields nothing is a `DecodeError`.
pub fn flate_decode(data: &[u8]) -> Result<Vec<u8>> {
    let Inflated { data: out, stopped } = inflate(data);
    match stopped {
        None => Ok(out),
        Some(reason) if out.is_empty() => Err(PdfError::DecodeError(format!(
            "FlateDecode produced no output: {reason}"
        ))),
        Some(reason) => {
            tracing::warn!(
                input = data.len(),
                output = out.len(),
                %reason,
                "FlateDecode stopped early, keeping partial output"
            );
            Ok(out)
        }
    }
}

/// Decode LZW (MSB first, 8-bit). `/EarlyChange 1`, the default, widens
/// codes one entry early, which is weezl's TIFF size switch.
pub fn lzw_decode(data: &[u8], early_change: i64) -> Vec<u8> {
    let mut decoder = if early_change == 0 {
        Decoder::new(BitOrder::Msb, 8)
    } else {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    };
    let mut output = Vec::new();
    // Partial output on corrupt data
    let _ = decoder.into_vec(&mut output).decode(data);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Object;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn flate_round_trip() {
        let packed = deflate(b"BT /F1 12 Tf (Hello) Tj ET");
        let out = StandardDecoder.decode(&packed, "FlateDecode", None).unwrap();
        assert_eq!(out, b"BT /F1 12 Tf (Hello) Tj ET");
    }

    #[test]
    fn truncated_flate_keeps_prefix() {
        let text: Vec<u8> = (0..2000u32).flat_map(|i| i.to_string().into_bytes()).collect();
        let packed = deflate(&text);
        let half = &packed[..packed.len() / 2];
        let inflated = inflate(half);
        assert!(inflated.stopped.is_some());
        let out = flate_decode(half).unwrap();
        assert!(!out.is_empty());
        assert!(text.starts_with(&out));
    }

    #[test]
    fn bad_checksum_keeps_decoded_bytes() {
        let text: Vec<u8> = (0..4000u32).flat_map(|i| i.to_string().into_bytes()).collect();
        let mut packed = deflate(&text);
        let n = packed.len();
        packed[n - 4..].copy_from_slice(&[0, 0, 0, 0]);
        let inflated = inflate(&packed);
        assert!(inflated.stopped.is_some());
        let out = flate_decode(&packed).unwrap();
        assert!(out.len() > text.len() / 2);
        assert!(text.starts_with(&out));
    }

    #[test]
    fn garbage_flate_is_a_decode_error() {
        let err = flate_decode(b"definitely not zlib").unwrap_err();
        assert!(matches!(err, PdfError::DecodeError(_)), "{err}");
        assert!(flate_decode(b"").is_err());
    }

    #[test]
    fn lzw_with_early_change() {
        let mut enc = weezl::encode::Encoder::with_tiff_size_switch(BitOrder::Msb, 8);
        let packed = enc.encode(b"-----A---B").unwrap();
        assert_eq!(lzw_decode(&packed, 1), b"-----A---B");
    }

    #[test]
    fn flate_with_png_predictor() {
        let rows = [2u8, 1, 2, 2, 1, 1];
        let packed = deflate(&rows);
        let mut parms = Dictionary::new();
        parms.insert("Predictor".into(), Object::Int(12));
        parms.insert("Columns".into(), Object::Int(2));
        let out = StandardDecoder
            .decode(&packed, "FlateDecode", Some(&parms))
            .unwrap();
        assert_eq!(out, vec![1, 2, 2, 3]);
    }

    #[test]
    fn unknown_filter_is_unsupported() {
        let err = StandardDecoder.decode(b"", "DCTDecode", None).unwrap_err();
        assert!(matches!(err, PdfError::UnsupportedFilter(name) if name == "DCTDecode"));
    }

    #[test]
    fn chain_applies_in_order() {
        let packed = deflate(&deflate(b"twice"));
        let chain = vec![
            FilterSpec {
                name: "FlateDecode".into(),
                params: None,
            },
            FilterSpec {
                name: "FlateDecode".into(),
                params: None,
            },
        ];
        assert_eq!(decode_chain(&StandardDecoder, packed, &chain).unwrap(), b"twice");
    }
}
