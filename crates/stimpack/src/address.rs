//! Memory-mapped addresses for packed register words.

use crate::errors::LayoutError;

/// Byte distance between consecutive registers of one region.
pub const REGISTER_STRIDE: u64 = 4;

/// One configuration write: `value` goes to `address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterWrite {
    pub address: u64,
    pub value: u64,
}

/// Assigns addresses to per-region register words.
///
/// Word `i` of region `r` goes to
/// `core_base_address + region_base_offsets[r] + 4 * i`. Output keeps
/// region order, then word order within each region.
pub fn map(
    region_words: &[&[u64]],
    region_base_offsets: &[u64],
    core_base_address: u64,
) -> Result<Vec<RegisterWrite>, LayoutError> {
    if region_words.len() != region_base_offsets.len() {
        return Err(LayoutError::RegionCountMismatch {
            regions: region_words.len(),
            offsets: region_base_offsets.len(),
        });
    }

    let total = region_words.iter().map(|words| words.len()).sum();
    let mut writes = Vec::with_capacity(total);

    for (region, (words, offset)) in region_words.iter().zip(region_base_offsets).enumerate() {
        for (index, value) in words.iter().enumerate() {
            let address = core_base_address
                .checked_add(*offset)
                .and_then(|base| {
                    REGISTER_STRIDE
                        .checked_mul(index as u64)
                        .and_then(|step| base.checked_add(step))
                })
                .ok_or(LayoutError::AddressOverflow { region, index })?;

            writes.push(RegisterWrite {
                address,
                value: *value,
            });
        }
    }

    Ok(writes)
}
