//! Low-level bit helpers shared by the register and byte codecs.
//!
//! Bits are addressed LSB-first: bit 0 is the low bit of the first word or byte.

/// All-ones mask of the low `width` bits. Saturates at 64.
pub fn mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Extracts `n` bits (at most 64) starting at bit `pos` of a little-endian limb slice.
///
/// Bits past the last limb read as zero.
pub fn extract_bits(limbs: &[u64], pos: usize, n: usize) -> u64 {
    if n == 0 {
        return 0;
    }

    let limb = pos / 64;
    let shift = pos % 64;

    let low = limbs.get(limb).copied().unwrap_or(0) >> shift;
    let high = if shift != 0 && shift + n > 64 {
        limbs.get(limb + 1).copied().unwrap_or(0) << (64 - shift)
    } else {
        0
    };

    (low | high) & mask(n)
}

/// ORs the low `n` bits of `value` into a little-endian limb slice at bit `pos`.
///
/// The caller sizes `limbs` to hold `pos + n` bits.
pub fn deposit_bits(limbs: &mut [u64], pos: usize, n: usize, value: u64) {
    if n == 0 {
        return;
    }

    let value = value & mask(n);
    let limb = pos / 64;
    let shift = pos % 64;

    limbs[limb] |= value << shift;
    if shift != 0 && shift + n > 64 {
        limbs[limb + 1] |= value >> (64 - shift);
    }
}

/// Rounds a bit index up to the next byte boundary.
pub fn byte_align(bit_index: usize) -> usize {
    bit_index.div_ceil(8) * 8
}

/// Number of limbs needed to hold `width` bits.
pub fn limbs_for(width: usize) -> usize {
    width.div_ceil(64)
}
