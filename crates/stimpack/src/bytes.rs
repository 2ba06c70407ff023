//! Byte codec: packs equal-width elements densely into a byte buffer.
//!
//! Bit `i` of the stream is bit `i % 8` of byte `i / 8`. Elements are laid
//! out in increasing bit order, least-significant bit first, and may start
//! at any bit. New bits are ORed into the buffer, so the target bit range
//! must be zero and owned by a single writer.

use crate::{
    bits::mask,
    errors::{LayoutError, PackError, ReadError},
    policy::OverflowPolicy,
};

/// Packs `elements` of `element_width` bits into `buffer` starting at `start_bit`.
///
/// Returns the bit index just past the last element. Nothing is written if
/// the span does not fit or a value is rejected by `policy`.
pub fn pack_elements(
    buffer: &mut [u8],
    elements: &[u64],
    start_bit: usize,
    element_width: usize,
    policy: OverflowPolicy,
) -> Result<usize, PackError> {
    let end = check_span(buffer.len(), elements, start_bit, element_width, policy)?;
    write_elements(buffer, elements, start_bit, element_width);
    Ok(end)
}

/// Reads `count` elements of `element_width` bits starting at `start_bit`.
pub fn unpack_elements(
    buffer: &[u8],
    start_bit: usize,
    element_width: usize,
    count: usize,
) -> Result<Vec<u64>, ReadError> {
    validate_width(element_width)?;

    let end = count
        .checked_mul(element_width)
        .and_then(|bits| bits.checked_add(start_bit))
        .ok_or(ReadError::OutOfBounds)?;
    if end > buffer.len() * 8 {
        return Err(ReadError::OutOfBounds);
    }

    let mut values = Vec::with_capacity(count);
    let mut cursor = start_bit;

    for _ in 0..count {
        let mut value = 0u64;
        let mut read = 0;

        while read < element_width {
            let offset = cursor % 8;
            let take = (8 - offset).min(element_width - read);
            let bits = (buffer[cursor / 8] >> offset) as u64 & mask(take);

            value |= bits << read;
            read += take;
            cursor += take;
        }

        values.push(value);
    }

    Ok(values)
}

fn validate_width(element_width: usize) -> Result<(), LayoutError> {
    if element_width == 0 || element_width > 64 {
        return Err(LayoutError::InvalidElementWidth {
            width: element_width,
        });
    }
    Ok(())
}

/// Validates width, bounds and values; returns the end bit index.
fn check_span(
    len: usize,
    elements: &[u64],
    start_bit: usize,
    element_width: usize,
    policy: OverflowPolicy,
) -> Result<usize, PackError> {
    validate_width(element_width)?;

    let end = elements
        .len()
        .checked_mul(element_width)
        .and_then(|bits| bits.checked_add(start_bit))
        .ok_or(PackError::BufferOverflow {
            end_bit: usize::MAX,
            len,
        })?;
    if end > len * 8 {
        return Err(PackError::BufferOverflow { end_bit: end, len });
    }

    if policy == OverflowPolicy::Reject {
        for (i, element) in elements.iter().enumerate() {
            policy.fit(&format!("element[{i}]"), element_width, *element)?;
        }
    }

    Ok(end)
}

/// Writes already-checked elements, truncating each to `element_width` bits.
fn write_elements(buffer: &mut [u8], elements: &[u64], start_bit: usize, element_width: usize) {
    let mut cursor = start_bit;

    for element in elements {
        let mut written = 0;

        while written < element_width {
            let offset = cursor % 8;
            let take = (8 - offset).min(element_width - written);
            let bits = ((element >> written) & mask(take)) as u8;

            buffer[cursor / 8] |= bits << offset;
            written += take;
            cursor += take;
        }
    }
}

/// Owned, zero-initialised byte buffer for [pack_elements].
///
/// Debug builds remember every bit handed out by [BitBuffer::pack] and
/// refuse to pack over them again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitBuffer {
    bytes: Vec<u8>,
    #[cfg(debug_assertions)]
    claimed: Vec<u8>,
}

impl BitBuffer {
    /// A zeroed buffer of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        BitBuffer {
            bytes: vec![0; len],
            #[cfg(debug_assertions)]
            claimed: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Extends the buffer with zero bytes up to `len`. Never shrinks.
    pub fn grow_to(&mut self, len: usize) {
        if len > self.bytes.len() {
            self.bytes.resize(len, 0);
            #[cfg(debug_assertions)]
            self.claimed.resize(len, 0);
        }
    }

    /// Packs `elements` at `start_bit`; see [pack_elements].
    pub fn pack(
        &mut self,
        elements: &[u64],
        start_bit: usize,
        element_width: usize,
        policy: OverflowPolicy,
    ) -> Result<usize, PackError> {
        let end = check_span(self.bytes.len(), elements, start_bit, element_width, policy)?;

        #[cfg(debug_assertions)]
        self.claim(start_bit, end)?;

        write_elements(&mut self.bytes, elements, start_bit, element_width);

        tracing::trace!(
            start_bit,
            end_bit = end,
            elements = elements.len(),
            element_width,
            "packed elements"
        );

        Ok(end)
    }

    /// Reads elements back; see [unpack_elements].
    pub fn unpack(
        &self,
        start_bit: usize,
        element_width: usize,
        count: usize,
    ) -> Result<Vec<u64>, ReadError> {
        unpack_elements(&self.bytes, start_bit, element_width, count)
    }

    #[cfg(debug_assertions)]
    fn claim(&mut self, start_bit: usize, end_bit: usize) -> Result<(), PackError> {
        if let Some(bit) =
            (start_bit..end_bit).find(|bit| self.claimed[bit / 8] & (1 << (bit % 8)) != 0)
        {
            return Err(PackError::OverlappingBits { bit });
        }

        for bit in start_bit..end_bit {
            self.claimed[bit / 8] |= 1 << (bit % 8);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_at_bit_offset() {
        let mut buffer = [0u8; 2];
        let end = pack_elements(&mut buffer, &[0xF], 6, 4, OverflowPolicy::Truncate).unwrap();

        assert_eq!(buffer, [0xC0, 0x03]);
        assert_eq!(end, 10);
    }

    #[test]
    fn test_pack_byte_aligned() {
        let mut buffer = [0u8; 4];
        let end = pack_elements(
            &mut buffer,
            &[0xBEEF, 0x1234],
            0,
            16,
            OverflowPolicy::Truncate,
        )
        .unwrap();

        assert_eq!(buffer, [0xEF, 0xBE, 0x34, 0x12]);
        assert_eq!(end, 32);
    }

    #[test]
    fn test_pack_odd_width_dense() {
        let mut buffer = [0u8; 2];
        pack_elements(&mut buffer, &[0b101, 0b011, 0b111], 0, 3, OverflowPolicy::Truncate)
            .unwrap();

        // 111_011_101 LSB-first
        assert_eq!(buffer, [0b1101_1101, 0b0000_0001]);
    }

    #[test]
    fn test_pack_ors_into_existing_bits() {
        let mut buffer = [0b0000_0011u8];
        pack_elements(&mut buffer, &[0b11], 4, 2, OverflowPolicy::Truncate).unwrap();

        assert_eq!(buffer, [0b0011_0011]);
    }

    #[test]
    fn test_pack_truncates_oversized_values() {
        let mut buffer = [0u8; 1];
        pack_elements(&mut buffer, &[0xFF, 0x0], 0, 4, OverflowPolicy::Truncate).unwrap();

        assert_eq!(buffer, [0x0F]);
    }

    #[test]
    fn test_pack_rejects_oversized_values() {
        let mut buffer = [0u8; 1];
        let result = pack_elements(&mut buffer, &[0x1, 0x1F], 0, 4, OverflowPolicy::Reject);

        assert_eq!(
            result,
            Err(PackError::ValueOverflow {
                field: "element[1]".to_string(),
                width: 4,
                value: 0x1F
            })
        );
        assert_eq!(buffer, [0]);
    }

    #[test]
    fn test_pack_past_end() {
        let mut buffer = [0u8; 1];
        let result = pack_elements(&mut buffer, &[1, 2, 3], 0, 3, OverflowPolicy::Truncate);

        assert_eq!(result, Err(PackError::BufferOverflow { end_bit: 9, len: 1 }));
        assert_eq!(buffer, [0]);
    }

    #[test]
    fn test_pack_invalid_width() {
        let mut buffer = [0u8; 1];
        assert_eq!(
            pack_elements(&mut buffer, &[1], 0, 0, OverflowPolicy::Truncate),
            Err(PackError::Layout(LayoutError::InvalidElementWidth { width: 0 }))
        );
        assert_eq!(
            pack_elements(&mut buffer, &[1], 0, 65, OverflowPolicy::Truncate),
            Err(PackError::Layout(LayoutError::InvalidElementWidth { width: 65 }))
        );
    }

    #[test]
    fn test_pack_empty_returns_start() {
        let mut buffer = [0u8; 0];
        assert_eq!(
            pack_elements(&mut buffer, &[], 0, 8, OverflowPolicy::Truncate),
            Ok(0)
        );
    }

    #[test]
    fn test_unpack_round_trip() {
        let mut buffer = [0u8; 8];
        let values = [0x1FFF, 0x0, 0x1234, 0x0ABC];
        let end = pack_elements(&mut buffer, &values, 3, 13, OverflowPolicy::Truncate).unwrap();

        assert_eq!(end, 3 + 4 * 13);
        assert_eq!(unpack_elements(&buffer, 3, 13, 4).unwrap(), values.to_vec());
    }

    #[test]
    fn test_unpack_out_of_bounds() {
        assert_eq!(unpack_elements(&[0xFF], 4, 8, 1), Err(ReadError::OutOfBounds));
    }

    #[test]
    fn test_bit_buffer_grow_and_pack() {
        let mut buffer = BitBuffer::zeroed(1);
        buffer.grow_to(3);
        let end = buffer
            .pack(&[0xABC, 0xDEF], 0, 12, OverflowPolicy::Truncate)
            .unwrap();

        assert_eq!(end, 24);
        assert_eq!(buffer.as_bytes(), &[0xBC, 0xFA, 0xDE]);
        assert_eq!(buffer.unpack(12, 12, 1).unwrap(), vec![0xDEF]);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_bit_buffer_detects_overlap() {
        let mut buffer = BitBuffer::zeroed(2);
        buffer.pack(&[0x3F], 2, 6, OverflowPolicy::Truncate).unwrap();

        assert_eq!(
            buffer.pack(&[0x1], 7, 4, OverflowPolicy::Truncate),
            Err(PackError::OverlappingBits { bit: 7 })
        );
        assert_eq!(buffer.pack(&[0x1], 8, 4, OverflowPolicy::Truncate), Ok(12));
    }
}
