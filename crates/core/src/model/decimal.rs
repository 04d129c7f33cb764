//! Exact decimal numbers for PDF reals.
//!
//! Reals are kept as a base-10 mantissa and scale so that values lexed from
//! the file are never rounded through binary floating point. Conversion to
//! `f64` is available for geometry.

use std::fmt;
use std::str::FromStr;

/// `mantissa * 10^-scale`, normalized so the mantissa carries no trailing
/// zero digits after the decimal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

/// Most fraction digits kept; later digits are dropped.
const MAX_SCALE: u32 = 28;

impl Decimal {
    pub const ZERO: Self = Self {
        mantissa: 0,
        scale: 0,
    };

    pub fn new(mantissa: i128, scale: u32) -> Self {
        let mut d = Self { mantissa, scale };
        d.normalize();
        d
    }

    pub fn from_int(value: i64) -> Self {
        Self {
            mantissa: value as i128,
            scale: 0,
        }
    }

    pub const fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub const fn scale(&self) -> u32 {
        self.scale
    }

    /// True when the value has no fractional part.
    pub const fn is_integer(&self) -> bool {
        self.scale == 0
    }

    /// Integer part, truncated toward zero.
    pub fn trunc(&self) -> i128 {
        self.mantissa / 10i128.pow(self.scale)
    }

    pub fn to_f64(&self) -> f64 {
        // Parsing the canonical text gives the correctly rounded f64.
        self.to_string()
            .parse()
            .unwrap_or(self.mantissa as f64 / 10f64.powi(self.scale as i32))
    }

    /// Parse `[+-]digits[.digits]` (either side may be empty, not both).
    pub fn parse_bytes(text: &[u8]) -> Option<Self> {
        let (negative, body) = match text.first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let mut mantissa: i128 = 0;
        let mut scale = 0u32;
        let mut seen_dot = false;
        let mut digits = 0usize;
        let mut saturated = false;
        for &b in body {
            match b {
                b'.' if !seen_dot => seen_dot = true,
                b'0'..=b'9' => {
                    digits += 1;
                    if saturated || (seen_dot && scale >= MAX_SCALE) {
                        continue;
                    }
                    match mantissa
                        .checked_mul(10)
                        .and_then(|m| m.checked_add((b - b'0') as i128))
                    {
                        Some(m) => {
                            mantissa = m;
                            if seen_dot {
                                scale += 1;
                            }
                        }
                        None if seen_dot => saturated = true,
                        None => {
                            mantissa = i128::MAX;
                            saturated = true;
                        }
                    }
                }
                _ => return None,
            }
        }
        if digits == 0 {
            return None;
        }
        if negative {
            mantissa = -mantissa;
        }
        Some(Self::new(mantissa, scale))
    }

    fn normalize(&mut self) {
        while self.scale > 0 && self.mantissa % 10 == 0 {
            self.mantissa /= 10;
            self.scale -= 1;
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let digits = self.mantissa.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{sign}{digits}.0");
        }
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{sign}{int}.{frac}")
        } else {
            write!(f, "{sign}0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    }
}

impl FromStr for Decimal {
    type Err = crate::error::PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_bytes(s.as_bytes())
            .ok_or_else(|| crate::error::PdfError::SyntaxError(format!("invalid decimal {s:?}")))
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::from_int(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes() {
        let d = Decimal::parse_bytes(b"1.50").unwrap();
        assert_eq!(d, Decimal::new(15, 1));
        assert_eq!(d.to_string(), "1.5");
        assert_eq!(Decimal::parse_bytes(b"-.5").unwrap().to_string(), "-0.5");
        assert_eq!(Decimal::parse_bytes(b"+3.").unwrap().to_string(), "3.0");
        assert_eq!(Decimal::parse_bytes(b"0.001").unwrap().to_string(), "0.001");
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(Decimal::parse_bytes(b".").is_none());
        assert!(Decimal::parse_bytes(b"-").is_none());
        assert!(Decimal::parse_bytes(b"1.2.3").is_none());
        assert!(Decimal::parse_bytes(b"1e5").is_none());
    }

    #[test]
    fn keeps_offsets_exact_beyond_f64_precision() {
        let d = Decimal::parse_bytes(b"12345678901234567890.123456789").unwrap();
        assert_eq!(d.to_string(), "12345678901234567890.123456789");
        assert_eq!(d.trunc(), 12345678901234567890);
    }

    #[test]
    fn converts_to_f64() {
        assert_eq!(Decimal::parse_bytes(b"0.1").unwrap().to_f64(), 0.1);
        assert_eq!(Decimal::parse_bytes(b"-612").unwrap().to_f64(), -612.0);
    }
}
