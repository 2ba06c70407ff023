//! Register codec: packs regions of fields into fixed-width register words.
//!
//! Fields are placed LSB-first, in declaration order, with a cursor of
//! `(register, bit_offset)`. A field that does not fit in the rest of the
//! current register continues at bit 0 of the next one, for as many
//! registers as it needs. Vector lanes are placed one after another as if
//! each lane were its own scalar. After the last field of a region the
//! cursor moves to a fresh register, so regions never share a register.

use std::ops::Range;

use crate::{
    bits::{deposit_bits, extract_bits, limbs_for, mask},
    errors::{LayoutError, PackError, ReadError},
    field::{Field, FieldKind, Region},
    policy::OverflowPolicy,
};

/// How a placed value sits relative to register boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    /// Entirely within one register.
    Contained,
    /// Split across two consecutive registers.
    Crossing,
    /// Covers at least one whole register plus partial ends, three or more registers.
    Spanning,
}

/// Where one field (or one lane of a vector field) landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Index of the region in the packed input.
    pub region: usize,
    /// Index of the field within its region.
    pub field: usize,
    /// Lane index for vector fields.
    pub lane: Option<usize>,
    /// Absolute register index of the lowest bit.
    pub register: usize,
    /// Bit offset of the lowest bit within `register`.
    pub bit_offset: usize,
    pub width: usize,
    pub span: Span,
}

impl Placement {
    /// Absolute bit range in the flattened register stream.
    pub fn bit_range(&self, register_width: usize) -> Range<usize> {
        let start = self.register * register_width + self.bit_offset;
        start..start + self.width
    }
}

/// Output of [RegisterPacker::pack].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRegisters {
    /// All register words, regions back-to-back.
    pub words: Vec<u64>,
    /// Word range of each region within `words`.
    pub regions: Vec<Range<usize>>,
    /// Base offset of each region, copied from the input.
    pub base_offsets: Vec<u64>,
    /// Placement of every field and vector lane, in packing order.
    pub placements: Vec<Placement>,
}

impl PackedRegisters {
    /// Register words of region `index`.
    pub fn region_words(&self, index: usize) -> Option<&[u64]> {
        self.regions.get(index).map(|range| &self.words[range.clone()])
    }

    /// Addressed writes for every word, using each region's own base offset.
    pub fn writes(&self, core_base_address: u64) -> Result<Vec<crate::address::RegisterWrite>, LayoutError> {
        let per_region: Vec<&[u64]> = self
            .regions
            .iter()
            .map(|range| &self.words[range.clone()])
            .collect();

        crate::address::map(&per_region, &self.base_offsets, core_base_address)
    }
}

/// Packs [Region]s into `register_width`-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterPacker {
    register_width: usize,
    policy: OverflowPolicy,
}

impl RegisterPacker {
    /// Creates a packer for registers of `register_width` bits (1..=64), truncating oversized values.
    pub fn new(register_width: usize) -> Result<Self, LayoutError> {
        if register_width == 0 {
            return Err(LayoutError::ZeroRegisterWidth);
        }
        if register_width > 64 {
            return Err(LayoutError::RegisterWidthTooLarge {
                width: register_width,
            });
        }

        Ok(RegisterPacker {
            register_width,
            policy: OverflowPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn register_width(&self) -> usize {
        self.register_width
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Total registers the regions occupy once packed.
    pub fn register_count(&self, regions: &[Region]) -> usize {
        regions
            .iter()
            .map(|region| region.register_count(self.register_width))
            .sum()
    }

    /// Packs `regions` in order into one word stream.
    pub fn pack(&self, regions: &[Region]) -> Result<PackedRegisters, PackError> {
        for field in regions.iter().flat_map(|region| &region.fields) {
            field.validate()?;
        }

        let total = self.register_count(regions);
        let mut cursor = Cursor::new(self.register_width, vec![0u64; total]);
        let mut ranges = Vec::with_capacity(regions.len());
        let mut placements = Vec::new();

        for (r, region) in regions.iter().enumerate() {
            let start = cursor.index;

            for (f, field) in region.fields.iter().enumerate() {
                let first = placements.len();

                match &field.kind {
                    FieldKind::Scalar(value) => {
                        let value = self.policy.fit(&field.name, field.width, *value)?;
                        let placement = cursor.place(&[value], field.width)?;
                        placements.push(placement.located(r, f, None));
                    }
                    FieldKind::Wide(limbs) => {
                        let limbs = self.policy.fit_limbs(&field.name, field.width, limbs)?;
                        let placement = cursor.place(&limbs, field.width)?;
                        placements.push(placement.located(r, f, None));
                    }
                    FieldKind::Vector { values, .. } => {
                        for (lane, value) in values.iter().enumerate() {
                            let value = self
                                .policy
                                .fit(&field.name, field.width, *value)
                                .map_err(|_| PackError::ValueOverflow {
                                    field: format!("{}[{lane}]", field.name),
                                    width: field.width,
                                    value: *value,
                                })?;
                            let placement = cursor.place(&[value], field.width)?;
                            placements.push(placement.located(r, f, Some(lane)));
                        }
                    }
                }

                tracing::debug!(
                    region = %region.name,
                    field = %field.name,
                    width = field.width,
                    start_register = placements.get(first).map(|p| p.register),
                    end_register = cursor.end_register(),
                    "placed field"
                );
            }

            cursor.align();
            ranges.push(start..cursor.index);
        }

        Ok(PackedRegisters {
            words: cursor.words,
            regions: ranges,
            base_offsets: regions.iter().map(|region| region.base_offset).collect(),
            placements,
        })
    }

    /// Reads field values back out of `words`.
    ///
    /// `templates` supplies the layout: field names, widths, kinds and lane
    /// counts. Their values are ignored and replaced by what `words` holds.
    pub fn unpack(&self, words: &[u64], templates: &[Region]) -> Result<Vec<Region>, ReadError> {
        let mut reader = Reader {
            register_width: self.register_width,
            words,
            index: 0,
            offset: 0,
        };
        let mut regions = Vec::with_capacity(templates.len());

        for template in templates {
            let mut fields = Vec::with_capacity(template.fields.len());

            for field in &template.fields {
                field.validate()?;

                let kind = match &field.kind {
                    FieldKind::Scalar(_) => FieldKind::Scalar(reader.take(field.width)?[0]),
                    FieldKind::Wide(limbs) => {
                        let mut value = reader.take(field.width)?;
                        value.resize(limbs.len().max(value.len()), 0);
                        FieldKind::Wide(value)
                    }
                    FieldKind::Vector { lanes, .. } => {
                        let mut values = Vec::with_capacity(*lanes);
                        for _ in 0..*lanes {
                            values.push(reader.take(field.width)?[0]);
                        }
                        FieldKind::Vector {
                            lanes: *lanes,
                            values,
                        }
                    }
                };

                fields.push(Field {
                    name: field.name.clone(),
                    width: field.width,
                    kind,
                });
            }

            reader.align();
            regions.push(Region {
                name: template.name.clone(),
                base_offset: template.base_offset,
                fields,
            });
        }

        Ok(regions)
    }
}

/// Placement before it is attributed to a region and field.
struct Placed {
    register: usize,
    bit_offset: usize,
    width: usize,
    span: Span,
}

impl Placed {
    fn located(self, region: usize, field: usize, lane: Option<usize>) -> Placement {
        Placement {
            region,
            field,
            lane,
            register: self.register,
            bit_offset: self.bit_offset,
            width: self.width,
            span: self.span,
        }
    }
}

/// Write cursor over a pre-sized register buffer.
struct Cursor {
    register_width: usize,
    words: Vec<u64>,
    index: usize,
    offset: usize,
}

impl Cursor {
    fn new(register_width: usize, words: Vec<u64>) -> Self {
        Cursor {
            register_width,
            words,
            index: 0,
            offset: 0,
        }
    }

    /// Places the low `width` bits of `limbs` at the cursor, chunk by chunk.
    ///
    /// The first chunk fills what is left of the current register; every
    /// following chunk starts at bit 0 of the next register.
    fn place(&mut self, limbs: &[u64], width: usize) -> Result<Placed, PackError> {
        let register = self.index;
        let bit_offset = self.offset;
        let mut written = 0;
        let mut touched = 0;

        while written < width {
            let room = self.register_width - self.offset;
            let take = room.min(width - written);
            let chunk = extract_bits(limbs, written, take);

            let len = self.words.len();
            let word = self
                .words
                .get_mut(self.index)
                .ok_or(PackError::RegisterOverflow {
                    index: self.index,
                    len,
                })?;
            *word |= (chunk << self.offset) & mask(self.register_width);

            tracing::trace!(
                register = self.index,
                offset = self.offset,
                bits = take,
                "wrote chunk"
            );

            written += take;
            touched += 1;
            self.offset += take;
            if self.offset == self.register_width {
                self.index += 1;
                self.offset = 0;
            }
        }

        let span = match touched {
            1 => Span::Contained,
            2 => Span::Crossing,
            _ => Span::Spanning,
        };

        Ok(Placed {
            register,
            bit_offset,
            width,
            span,
        })
    }

    /// Register holding the most recently written bit.
    fn end_register(&self) -> usize {
        if self.offset == 0 {
            self.index.saturating_sub(1)
        } else {
            self.index
        }
    }

    /// Moves to a fresh register unless already at the start of one.
    fn align(&mut self) {
        if self.offset != 0 {
            self.index += 1;
            self.offset = 0;
        }
    }
}

/// Read cursor mirroring [Cursor].
struct Reader<'a> {
    register_width: usize,
    words: &'a [u64],
    index: usize,
    offset: usize,
}

impl Reader<'_> {
    /// Reads `width` bits at the cursor as little-endian limbs.
    fn take(&mut self, width: usize) -> Result<Vec<u64>, ReadError> {
        let mut limbs = vec![0u64; limbs_for(width)];
        let mut read = 0;

        while read < width {
            let room = self.register_width - self.offset;
            let take = room.min(width - read);
            let word = *self.words.get(self.index).ok_or(ReadError::OutOfBounds)?;

            deposit_bits(&mut limbs, read, take, (word >> self.offset) & mask(take));

            read += take;
            self.offset += take;
            if self.offset == self.register_width {
                self.index += 1;
                self.offset = 0;
            }
        }

        Ok(limbs)
    }

    fn align(&mut self) {
        if self.offset != 0 {
            self.index += 1;
            self.offset = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_field() {
        let packer = RegisterPacker::new(8).unwrap();
        let regions = vec![Region::new("ctrl", 0, vec![Field::scalar("a", 3, 5)])];

        let packed = packer.pack(&regions).unwrap();
        assert_eq!(packed.words, vec![0b0000_0101]);
    }

    #[test]
    fn test_boundary_crossing() {
        let packer = RegisterPacker::new(8).unwrap();
        let regions = vec![Region::new(
            "ctrl",
            0,
            vec![Field::scalar("a", 5, 0b11111), Field::scalar("b", 5, 0b10101)],
        )];

        let packed = packer.pack(&regions).unwrap();
        assert_eq!(
            packed.words,
            vec![(0x1Fu64 | ((0x15 & 0x07) << 5)) & 0xFF, (0x15u64 >> 3) & 0x03]
        );
        assert_eq!(packed.placements[1].span, Span::Crossing);
        assert_eq!(packed.placements[1].register, 0);
        assert_eq!(packed.placements[1].bit_offset, 5);
    }

    #[test]
    fn test_region_never_reuses_register() {
        let packer = RegisterPacker::new(32).unwrap();
        let regions = vec![
            Region::new(
                "ctrl",
                0x200,
                vec![Field::scalar("a", 16, 0xFFFF), Field::scalar("b", 1, 1)],
            ),
            Region::new("ifmap", 0x400, vec![Field::scalar("c", 4, 0xA)]),
        ];

        let packed = packer.pack(&regions).unwrap();
        assert_eq!(packed.words, vec![0x1_FFFF, 0xA]);
        assert_eq!(packed.regions, vec![0..1, 1..2]);
        assert_eq!(packed.placements[2].register, 1);
        assert_eq!(packed.placements[2].bit_offset, 0);
    }

    #[test]
    fn test_exactly_full_region_is_not_padded() {
        let packer = RegisterPacker::new(8).unwrap();
        let regions = vec![
            Region::new(
                "a",
                0,
                vec![Field::scalar("x", 4, 0x1), Field::scalar("y", 4, 0x2)],
            ),
            Region::new("b", 0, vec![Field::scalar("z", 8, 0xAB)]),
        ];

        let packed = packer.pack(&regions).unwrap();
        assert_eq!(packed.words, vec![0x21, 0xAB]);
        assert_eq!(packed.regions, vec![0..1, 1..2]);
    }

    #[test]
    fn test_wide_scalar_spans_registers() {
        let packer = RegisterPacker::new(32).unwrap();
        let dil_pat = 0x0123_4567_89AB_CDEF;
        let regions = vec![Region::new(
            "ifmap",
            0x400,
            vec![
                Field::scalar("ylim", 20, 0xF_FFFF),
                Field::wide("dil_pat", 64, vec![dil_pat]),
                Field::scalar("rows", 4, 0x5),
            ],
        )];

        let packed = packer.pack(&regions).unwrap();
        assert_eq!(
            packed.words,
            vec![
                0xF_FFFF | ((dil_pat & 0xFFF) << 20),
                (dil_pat >> 12) & 0xFFFF_FFFF,
                (dil_pat >> 44) | (0x5 << 20),
            ]
        );
        assert_eq!(packed.placements[1].span, Span::Spanning);
        assert_eq!(packed.placements[2].register, 2);
        assert_eq!(packed.placements[2].bit_offset, 20);
    }

    #[test]
    fn test_scalar_wider_than_register() {
        let packer = RegisterPacker::new(8).unwrap();
        let regions = vec![Region::new("r", 0, vec![Field::scalar("w", 20, 0xABCDE)])];

        let packed = packer.pack(&regions).unwrap();
        assert_eq!(packed.words, vec![0xDE, 0xBC, 0x0A]);
    }

    #[test]
    fn test_vector_lanes_pack_back_to_back() {
        let packer = RegisterPacker::new(8).unwrap();
        let regions = vec![Region::new(
            "ifmap",
            0,
            vec![Field::vector("loc_woffs", 3, vec![1, 2, 3, 4])],
        )];

        let packed = packer.pack(&regions).unwrap();
        let stream: u64 = 1 | (2 << 3) | (3 << 6) | (4 << 9);
        assert_eq!(packed.words, vec![stream & 0xFF, stream >> 8]);
        assert_eq!(packed.placements.len(), 4);
        assert_eq!(packed.placements[2].lane, Some(2));
        assert_eq!(packed.placements[2].span, Span::Crossing);
    }

    #[test]
    fn test_truncates_by_default() {
        let packer = RegisterPacker::new(8).unwrap();
        let regions = vec![Region::new("r", 0, vec![Field::scalar("t", 2, 0b111)])];

        assert_eq!(packer.pack(&regions).unwrap().words, vec![0b11]);
    }

    #[test]
    fn test_reject_policy() {
        let packer = RegisterPacker::new(8)
            .unwrap()
            .with_policy(OverflowPolicy::Reject);
        let regions = vec![Region::new("r", 0, vec![Field::scalar("t", 2, 0b111)])];

        assert_eq!(
            packer.pack(&regions),
            Err(PackError::ValueOverflow {
                field: "t".to_string(),
                width: 2,
                value: 0b111
            })
        );
    }

    #[test]
    fn test_invalid_register_width() {
        assert_eq!(RegisterPacker::new(0), Err(LayoutError::ZeroRegisterWidth));
        assert_eq!(
            RegisterPacker::new(65),
            Err(LayoutError::RegisterWidthTooLarge { width: 65 })
        );
    }

    #[test]
    fn test_zero_width_field_fails_fast() {
        let packer = RegisterPacker::new(32).unwrap();
        let regions = vec![Region::new("r", 0, vec![Field::scalar("z", 0, 0)])];

        assert_eq!(
            packer.pack(&regions),
            Err(PackError::Layout(LayoutError::ZeroFieldWidth {
                field: "z".to_string()
            }))
        );
    }

    #[test]
    fn test_full_width_registers() {
        let packer = RegisterPacker::new(64).unwrap();
        let regions = vec![Region::new(
            "r",
            0,
            vec![Field::scalar("a", 64, u64::MAX), Field::scalar("b", 1, 1)],
        )];

        assert_eq!(packer.pack(&regions).unwrap().words, vec![u64::MAX, 1]);
    }

    #[test]
    fn test_unpack_round_trip() {
        let packer = RegisterPacker::new(32).unwrap();
        let regions = vec![
            Region::new(
                "ctrl",
                0x200,
                vec![Field::scalar("incntlim", 18, 0x2_0001), Field::scalar("thres", 2, 3)],
            ),
            Region::new(
                "ifmap",
                0x400,
                vec![
                    Field::scalar("xlim", 18, 77),
                    Field::wide("dil_pat", 96, vec![u64::MAX, 0xDEAD_BEEF]),
                    Field::vector("loc_woffs", 8, vec![0, 1, 2, 255]),
                ],
            ),
        ];

        let packed = packer.pack(&regions).unwrap();
        let unpacked = packer.unpack(&packed.words, &regions).unwrap();
        assert_eq!(unpacked, regions);
    }

    #[test]
    fn test_unpack_out_of_bounds() {
        let packer = RegisterPacker::new(8).unwrap();
        let templates = vec![Region::new("r", 0, vec![Field::scalar("a", 12, 0)])];

        assert_eq!(
            packer.unpack(&[0xFF], &templates),
            Err(ReadError::OutOfBounds)
        );
    }

    #[test]
    fn test_writes_use_region_offsets() {
        let packer = RegisterPacker::new(32).unwrap();
        let regions = vec![
            Region::new("ctrl", 0x200, vec![Field::scalar("a", 40, 0xAB_0000_0001)]),
            Region::new("wei", 0x600, vec![Field::scalar("b", 3, 5)]),
        ];

        let writes = packer.pack(&regions).unwrap().writes(0x4420_0000).unwrap();
        let pairs: Vec<(u64, u64)> = writes.iter().map(|w| (w.address, w.value)).collect();
        assert_eq!(
            pairs,
            vec![
                (0x4420_0200, 0x0000_0001),
                (0x4420_0204, 0xAB),
                (0x4420_0600, 5),
            ]
        );
    }

    #[test]
    fn test_writes_address_overflow() {
        let packer = RegisterPacker::new(8).unwrap();
        let regions = vec![Region::new("ctrl", 0x10, vec![Field::scalar("a", 16, 0xABCD)])];

        assert_eq!(
            packer.pack(&regions).unwrap().writes(u64::MAX - 0x10),
            Err(LayoutError::AddressOverflow {
                region: 0,
                index: 1
            })
        );
    }

    #[test]
    fn test_reject_policy_vector_lane() {
        let packer = RegisterPacker::new(8)
            .unwrap()
            .with_policy(OverflowPolicy::Reject);
        let regions = vec![Region::new(
            "ifmap",
            0,
            vec![Field::vector("loc_woffs", 3, vec![1, 7, 8, 2])],
        )];

        assert_eq!(
            packer.pack(&regions),
            Err(PackError::ValueOverflow {
                field: "loc_woffs[2]".to_string(),
                width: 3,
                value: 8
            })
        );
    }

    #[test]
    fn test_reject_policy_wide_field() {
        let packer = RegisterPacker::new(32)
            .unwrap()
            .with_policy(OverflowPolicy::Reject);
        let regions = vec![Region::new(
            "ifmap",
            0,
            vec![Field::wide("dil_pat", 68, vec![u64::MAX, 0x1F])],
        )];

        assert_eq!(
            packer.pack(&regions),
            Err(PackError::WideValueOverflow {
                field: "dil_pat".to_string(),
                width: 68,
                bit: 68
            })
        );
    }
}
