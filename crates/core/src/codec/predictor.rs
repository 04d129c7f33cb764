//! PNG and TIFF predictors (`/DecodeParms /Predictor`).

use crate::error::{PdfError, Result};
use crate::model::{Dictionary, objects::dict_int};

/// Largest decoded row accepted from `/Columns`, `/Colors` and
/// `/BitsPerComponent`.
pub const MAX_ROW_BYTES: usize = 1 << 24;

/// Predictor settings read from a `/DecodeParms` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    pub fn from_dict(parms: &Dictionary) -> Self {
        let positive = |key: &str, default: usize| {
            dict_int(parms, key)
                .and_then(|v| usize::try_from(v).ok())
                .filter(|&v| v > 0)
                .unwrap_or(default)
        };
        Self {
            predictor: dict_int(parms, "Predictor").unwrap_or(1),
            colors: positive("Colors", 1),
            bits_per_component: positive("BitsPerComponent", 8),
            columns: positive("Columns", 1),
        }
    }

    /// Bytes in one row of samples (without the PNG tag byte).
    fn row_bytes(&self) -> Result<usize> {
        let bits = self
            .colors
            .checked_mul(self.columns)
            .and_then(|n| n.checked_mul(self.bits_per_component));
        match bits.map(|b| b.div_ceil(8)) {
            Some(n) if n <= MAX_ROW_BYTES => Ok(n),
            _ => Err(PdfError::DecodeError(format!(
                "predictor row of {} columns x {} colors x {} bits is too large",
                self.columns, self.colors, self.bits_per_component
            ))),
        }
    }

    /// Bytes per complete pixel, at least 1. Only valid once `row_bytes`
    /// has accepted the parameters.
    fn pixel_bytes(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }
}

/// Undo the predictor named in `parms`, if any.
pub fn apply_predictor(data: Vec<u8>, parms: Option<&Dictionary>) -> Result<Vec<u8>> {
    let Some(parms) = parms else {
        return Ok(data);
    };
    let params = PredictorParams::from_dict(parms);
    match params.predictor {
        1 => Ok(data),
        2 => tiff_predictor(data, &params),
        10..=15 => png_predictor(&data, &params),
        other => Err(PdfError::DecodeError(format!("unknown predictor {other}"))),
    }
}

/// Reverse PNG row filters. Each row starts with its own filter tag, so the
/// specific predictor value 10-15 does not matter.
pub fn png_predictor(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    let row_bytes = params.row_bytes()?;
    let bpp = params.pixel_bytes();
    let row_size = row_bytes + 1; // +1 for filter byte

    let mut result = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_bytes];
    let mut current_row = vec![0u8; row_bytes];

    for row in data.chunks(row_size) {
        if row.len() < row_size {
            // Truncated trailing row
            break;
        }
        let filter_type = row[0];
        let row_data = &row[1..];

        match filter_type {
            0 => current_row.copy_from_slice(row_data),
            1 => {
                // Sub - each byte depends on byte to the left
                for i in 0..row_bytes {
                    let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                    current_row[i] = row_data[i].wrapping_add(left);
                }
            }
            2 => {
                // Up - each byte depends on byte above
                for i in 0..row_bytes {
                    current_row[i] = row_data[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                // Average of left and above
                for i in 0..row_bytes {
                    let left = if i >= bpp { current_row[i - bpp] as u16 } else { 0 };
                    let above = prev_row[i] as u16;
                    current_row[i] = row_data[i].wrapping_add(((left + above) / 2) as u8);
                }
            }
            4 => {
                for i in 0..row_bytes {
                    let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                    let above = prev_row[i];
                    let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
                    current_row[i] = row_data[i].wrapping_add(paeth(left, above, upper_left));
                }
            }
            other => {
                return Err(PdfError::DecodeError(format!(
                    "invalid PNG filter type {other}"
                )));
            }
        }

        result.extend_from_slice(&current_row);
        std::mem::swap(&mut prev_row, &mut current_row);
    }

    Ok(result)
}

/// Paeth predictor function used in PNG filtering.
const fn paeth(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i32;
    let b = above as i32;
    let c = upper_left as i32;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

/// TIFF predictor 2: horizontal differencing per component.
pub fn tiff_predictor(mut data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>> {
    let row_bytes = params.row_bytes()?.max(1);
    let colors = params.colors;
    match params.bits_per_component {
        8 => {
            for row in data.chunks_mut(row_bytes) {
                for i in colors..row.len() {
                    row[i] = row[i].wrapping_add(row[i - colors]);
                }
            }
        }
        16 => {
            let step = colors * 2;
            for row in data.chunks_mut(row_bytes) {
                let mut i = step;
                while i + 1 < row.len() {
                    let prev = u16::from_be_bytes([row[i - step], row[i - step + 1]]);
                    let cur = u16::from_be_bytes([row[i], row[i + 1]]);
                    let [hi, lo] = cur.wrapping_add(prev).to_be_bytes();
                    row[i] = hi;
                    row[i + 1] = lo;
                    i += 2;
                }
            }
        }
        bits => {
            return Err(PdfError::DecodeError(format!(
                "TIFF predictor with {bits} bits per component"
            )));
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Object;

    fn params(columns: usize) -> PredictorParams {
        PredictorParams {
            predictor: 12,
            columns,
            ..PredictorParams::default()
        }
    }

    #[test]
    fn png_up_rows_accumulate() {
        // Typical xref stream layout: /Columns 4, Up filter on every row
        let data = [2, 1, 0, 16, 0, 2, 0, 1, 0, 0, 2, 0, 0, 1, 0];
        let out = png_predictor(&data, &params(4)).unwrap();
        assert_eq!(out, vec![1, 0, 16, 0, 1, 1, 16, 0, 1, 1, 17, 0]);
    }

    #[test]
    fn png_sub_and_paeth() {
        let sub = png_predictor(&[1, 5, 1, 1], &params(3)).unwrap();
        assert_eq!(sub, vec![5, 6, 7]);
        let paeth_rows = png_predictor(&[0, 1, 2, 4, 3, 3], &params(2)).unwrap();
        assert_eq!(paeth_rows, vec![1, 2, 4, 7]);
    }

    #[test]
    fn png_truncated_row_is_dropped() {
        let out = png_predictor(&[0, 1, 2, 0, 9], &params(2)).unwrap();
        assert_eq!(out, vec![1, 2]);
    }

    #[test]
    fn png_rejects_unknown_row_filter() {
        assert!(png_predictor(&[7, 1, 2], &params(2)).is_err());
    }

    #[test]
    fn tiff_differencing_per_component() {
        let params = PredictorParams {
            predictor: 2,
            colors: 2,
            columns: 3,
            ..PredictorParams::default()
        };
        let out = tiff_predictor(vec![10, 20, 1, 2, 1, 2], &params).unwrap();
        assert_eq!(out, vec![10, 20, 11, 22, 12, 24]);
    }

    #[test]
    fn oversized_rows_are_rejected() {
        let mut parms = Dictionary::new();
        parms.insert("Predictor".into(), Object::Int(12));
        parms.insert("Columns".into(), Object::Int(1 << 62));
        let err = apply_predictor(vec![0, 1, 2], Some(&parms)).unwrap_err();
        assert!(matches!(err, PdfError::DecodeError(_)), "{err}");

        parms.insert("Predictor".into(), Object::Int(2));
        parms.insert("Colors".into(), Object::Int(1 << 40));
        parms.insert("Columns".into(), Object::Int(1 << 40));
        assert!(apply_predictor(vec![0, 1, 2], Some(&parms)).is_err());
    }

    #[test]
    fn predictor_one_is_identity() {
        let mut parms = Dictionary::new();
        parms.insert("Predictor".into(), Object::Int(1));
        assert_eq!(apply_predictor(vec![1, 2, 3], Some(&parms)).unwrap(), vec![1, 2, 3]);
        assert_eq!(apply_predictor(vec![4], None).unwrap(), vec![4]);
    }
}
