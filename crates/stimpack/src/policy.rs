//! What the codecs do with values wider than their declared field width.

use crate::{bits::mask, errors::PackError};

/// Treatment of values that do not fit their declared width.
///
/// Both the register codec and the byte codec honor the same policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Keep only the low `width` bits.
    #[default]
    Truncate,
    /// Fail with [PackError::ValueOverflow].
    Reject,
}

impl OverflowPolicy {
    /// Fits `value` into `width` bits (at most 64) according to the policy.
    pub fn fit(self, field: &str, width: usize, value: u64) -> Result<u64, PackError> {
        let masked = value & mask(width);

        match self {
            OverflowPolicy::Truncate => Ok(masked),
            OverflowPolicy::Reject if masked != value => Err(PackError::ValueOverflow {
                field: field.to_string(),
                width,
                value,
            }),
            OverflowPolicy::Reject => Ok(value),
        }
    }

    /// Fits a little-endian limb value into `width` bits, clearing or rejecting bits above it.
    pub fn fit_limbs(self, field: &str, width: usize, limbs: &[u64]) -> Result<Vec<u64>, PackError> {
        let mut fitted = limbs.to_vec();

        for (i, limb) in fitted.iter_mut().enumerate() {
            let low_bit = i * 64;
            let keep = width.saturating_sub(low_bit).min(64);
            let masked = *limb & mask(keep);
            let excess = *limb & !mask(keep);

            if excess != 0 && self == OverflowPolicy::Reject {
                return Err(PackError::WideValueOverflow {
                    field: field.to_string(),
                    width,
                    bit: low_bit + excess.trailing_zeros() as usize,
                });
            }

            *limb = masked;
        }

        Ok(fitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_masks() {
        assert_eq!(OverflowPolicy::Truncate.fit("f", 3, 0b1101), Ok(0b101));
        assert_eq!(OverflowPolicy::Truncate.fit("f", 64, u64::MAX), Ok(u64::MAX));
    }

    #[test]
    fn test_reject_out_of_range() {
        assert_eq!(
            OverflowPolicy::Reject.fit("thres", 2, 4),
            Err(PackError::ValueOverflow {
                field: "thres".to_string(),
                width: 2,
                value: 4
            })
        );
        assert_eq!(OverflowPolicy::Reject.fit("thres", 2, 3), Ok(3));
    }

    #[test]
    fn test_fit_limbs() {
        let limbs = [u64::MAX, u64::MAX];
        assert_eq!(
            OverflowPolicy::Truncate.fit_limbs("dil", 68, &limbs),
            Ok(vec![u64::MAX, 0xF])
        );
        assert_eq!(
            OverflowPolicy::Reject.fit_limbs("dil", 68, &limbs),
            Err(PackError::WideValueOverflow {
                field: "dil".to_string(),
                width: 68,
                bit: 68
            })
        );
        assert_eq!(
            OverflowPolicy::Reject.fit_limbs("dil", 68, &[1, 0xF, 0, 0x8]),
            Err(PackError::WideValueOverflow {
                field: "dil".to_string(),
                width: 68,
                bit: 195
            })
        );
        assert_eq!(
            OverflowPolicy::Reject.fit_limbs("dil", 68, &[1, 0xF]),
            Ok(vec![1, 0xF])
        );
    }
}
