//! Fixed-point decimal codec.
//!
//! A decimal travels as a signed 128-bit big-endian integer scaled by
//! `(precision, scale)`: `precision` significant digits, `scale` of them
//! after the point.

use std::fmt;

use crate::error::{ErrorKind, Result};

/// A decimal payload: 16 raw big-endian bytes plus its scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    bytes: [u8; 16],
    precision: u32,
    scale: u32,
}

impl Decimal {
    /// Wraps raw wire bytes without validation.
    pub fn from_bytes(bytes: [u8; 16], precision: u32, scale: u32) -> Self {
        Self {
            bytes,
            precision,
            scale,
        }
    }

    /// Encodes `n` as two's-complement big-endian. `n` is the unscaled
    /// integer; callers clamp to `10^precision` per their own policy.
    pub fn from_i128(n: i128, precision: u32, scale: u32) -> Self {
        Self {
            bytes: n.to_be_bytes(),
            precision,
            scale,
        }
    }

    /// Parses a decimal literal such as `-12.345`. The fractional part is
    /// right-padded (or must fit) into `scale` digits; the unscaled result
    /// must stay under `10^precision`.
    pub fn parse(text: &str, precision: u32, scale: u32) -> Result<Self> {
        let (neg, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ErrorKind::Decode(format!("invalid decimal literal: {text:?}")).into());
        }
        if frac_part.len() > scale as usize {
            return Err(ErrorKind::Decode(format!(
                "decimal literal {text:?} has more than {scale} fractional digits"
            ))
            .into());
        }
        let mut unscaled: i128 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let d = c
                .to_digit(10)
                .ok_or_else(|| ErrorKind::Decode(format!("invalid decimal literal: {text:?}")))?;
            unscaled = unscaled
                .checked_mul(10)
                .and_then(|v| v.checked_add(d as i128))
                .ok_or_else(|| ErrorKind::Decode(format!("decimal literal {text:?} overflows")))?;
        }
        for _ in frac_part.len()..scale as usize {
            unscaled = unscaled
                .checked_mul(10)
                .ok_or_else(|| ErrorKind::Decode(format!("decimal literal {text:?} overflows")))?;
        }
        if precision < 39 && unscaled >= 10i128.pow(precision) {
            return Err(ErrorKind::Decode(format!(
                "decimal literal {text:?} does not fit precision {precision}"
            ))
            .into());
        }
        if neg {
            unscaled = -unscaled;
        }
        Ok(Self::from_i128(unscaled, precision, scale))
    }

    /// The unscaled integer.
    pub fn to_i128(&self) -> i128 {
        i128::from_be_bytes(self.bytes)
    }

    pub fn bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }
}

impl fmt::Display for Decimal {
    /// Renders with the point inserted `scale` digits from the right:
    /// `Decimal::from_i128(0, 22, 9)` is `0.000000000`, negatives carry a
    /// leading `-`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.to_i128();
        if n < 0 {
            f.write_str("-")?;
        }
        let digits = n.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&digits);
        }
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{int_part}.{frac_part}")
        } else {
            write!(f, "0.{digits:0>scale$}")
        }
    }
}
