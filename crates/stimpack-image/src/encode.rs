//! Element encoders: turn numeric tensor values into the raw bit patterns
//! the accelerator stores in memory.
//!
//! ## Formats
//!
//! - **Integers** are stored as `width`-bit two's complement.
//! - **Custom floats** have 1 sign bit, `total - mantissa - 1` exponent bits
//!   with bias `2^(e-1) - 1`, and `mantissa` fraction bits with an implicit
//!   leading one. There are no subnormals, infinities or NaNs: exponent 0 is
//!   an ordinary binade, the all-ones exponent is never produced, and the
//!   all-zero pattern means zero.
//!
//! ## Rounding and saturation
//!
//! 1. Mantissas round to nearest, ties away from zero.
//! 2. Magnitudes below the smallest binade become (positive) zero.
//! 3. Magnitudes above the largest finite value, including infinities,
//!    saturate to the largest finite value with the input's sign.

use stimpack::bits::mask;

use crate::errors::EncodeError;

/// Encodes `value` as `width`-bit two's complement.
///
/// Accepts anything representable as either a signed or an unsigned
/// `width`-bit integer, so both `-1` and `0xFFFF` encode to `0xFFFF` at 16 bits.
pub fn twos_complement(value: i64, width: usize) -> Result<u64, EncodeError> {
    if width == 0 || width > 64 {
        return Err(EncodeError::InvalidIntWidth { width });
    }

    let min = -(1i128 << (width - 1));
    let max = (1i128 << width) - 1;
    if (value as i128) < min || (value as i128) > max {
        return Err(EncodeError::IntOutOfRange {
            value: value as i128,
            width,
        });
    }

    Ok(value as u64 & mask(width))
}

/// Encodes every value with [twos_complement].
pub fn twos_complement_all(values: &[i64], width: usize) -> Result<Vec<u64>, EncodeError> {
    values.iter().map(|v| twos_complement(*v, width)).collect()
}

/// Sign-extends the low `width` bits of `raw`.
pub fn sign_extend(raw: u64, width: usize) -> i64 {
    let shift = 64 - width.clamp(1, 64);
    ((raw << shift) as i64) >> shift
}

/// A reduced-precision floating-point format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomFloat {
    mantissa_bits: usize,
    total_bits: usize,
}

const F64_MANTISSA_BITS: usize = 52;

impl CustomFloat {
    /// A format with `mantissa_bits` fraction bits in `total_bits` overall.
    ///
    /// The exponent takes the remaining bits after the sign and must be
    /// between 2 and 11 bits wide; the mantissa may be at most 52 bits.
    pub fn new(mantissa_bits: usize, total_bits: usize) -> Result<Self, EncodeError> {
        let invalid = EncodeError::InvalidFloatFormat {
            mantissa_bits,
            total_bits,
        };

        if total_bits > 64 || mantissa_bits > F64_MANTISSA_BITS {
            return Err(invalid);
        }

        let exponent_bits = total_bits
            .checked_sub(mantissa_bits + 1)
            .ok_or(invalid.clone())?;
        if !(2..=11).contains(&exponent_bits) {
            return Err(invalid);
        }

        Ok(CustomFloat {
            mantissa_bits,
            total_bits,
        })
    }

    /// IEEE half precision layout (10-bit mantissa, 16 bits).
    pub fn fp16() -> Self {
        CustomFloat {
            mantissa_bits: 10,
            total_bits: 16,
        }
    }

    pub fn mantissa_bits(&self) -> usize {
        self.mantissa_bits
    }

    pub fn total_bits(&self) -> usize {
        self.total_bits
    }

    pub fn exponent_bits(&self) -> usize {
        self.total_bits - self.mantissa_bits - 1
    }

    pub fn bias(&self) -> i64 {
        (1i64 << (self.exponent_bits() - 1)) - 1
    }

    /// Largest biased exponent that is produced.
    fn max_exponent(&self) -> i64 {
        (1i64 << self.exponent_bits()) - 2
    }

    fn pack(&self, sign: u64, exponent: u64, mantissa: u64) -> u64 {
        (sign << (self.total_bits - 1)) | (exponent << self.mantissa_bits) | mantissa
    }

    /// Encodes `value`, rounding and saturating as described in the module docs.
    ///
    /// A rounding carry out of the top binade saturates to the largest finite
    /// value. Generators that carry into the all-ones exponent instead emit a
    /// different pattern for these values.
    pub fn encode(&self, value: f64) -> Result<u64, EncodeError> {
        if value.is_nan() {
            return Err(EncodeError::NotANumber);
        }

        let sign = value.is_sign_negative() as u64;
        let saturated = self.pack(sign, self.max_exponent() as u64, mask(self.mantissa_bits));

        if value == 0.0 {
            return Ok(0);
        }
        if value.is_infinite() {
            return Ok(saturated);
        }

        let bits = value.abs().to_bits();
        let raw_exponent = (bits >> F64_MANTISSA_BITS) as i64;
        let fraction = bits & mask(F64_MANTISSA_BITS);

        // f64 subnormals are far below any supported binade
        if raw_exponent == 0 {
            return Ok(0);
        }

        let mut exponent = raw_exponent - 1023 + self.bias();
        if exponent < 0 {
            return Ok(0);
        }
        if exponent > self.max_exponent() {
            return Ok(saturated);
        }

        let drop = F64_MANTISSA_BITS - self.mantissa_bits;
        let mut mantissa = fraction >> drop;
        if drop > 0 && (fraction >> (drop - 1)) & 1 == 1 {
            mantissa += 1;
        }
        if mantissa > mask(self.mantissa_bits) {
            mantissa = 0;
            exponent += 1;
            if exponent > self.max_exponent() {
                return Ok(saturated);
            }
        }

        Ok(self.pack(sign, exponent as u64, mantissa))
    }

    /// Encodes every value with [CustomFloat::encode].
    pub fn encode_all(&self, values: &[f64]) -> Result<Vec<u64>, EncodeError> {
        values.iter().map(|v| self.encode(*v)).collect()
    }

    /// Decodes a raw pattern; the all-zero pattern (either sign) is zero.
    pub fn decode(&self, raw: u64) -> f64 {
        let sign = (raw >> (self.total_bits - 1)) & 1;
        let exponent = (raw >> self.mantissa_bits) & mask(self.exponent_bits());
        let mantissa = raw & mask(self.mantissa_bits);

        if exponent == 0 && mantissa == 0 {
            return 0.0;
        }

        let magnitude = 2f64.powi((exponent as i64 - self.bias()) as i32)
            * (1.0 + mantissa as f64 / 2f64.powi(self.mantissa_bits as i32));

        if sign == 1 { -magnitude } else { magnitude }
    }
}
