//! Configuration fields and the regions that group them.

use crate::{bits::limbs_for, errors::LayoutError};

/// A single named configuration field with its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Diagnostic name, used in errors and logs.
    pub name: String,
    /// Width in bits of the value, or of each lane for vector fields.
    pub width: usize,
    /// Scalar, wide scalar or per-lane vector, with the value(s).
    pub kind: FieldKind,
}

/// Shape and value of a [Field].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// One value of at most 64 bits.
    Scalar(u64),
    /// One value of arbitrary width, as little-endian 64-bit limbs.
    Wide(Vec<u64>),
    /// One value per lane, each `width` bits, packed back-to-back in lane order.
    Vector { lanes: usize, values: Vec<u64> },
}

impl Field {
    pub fn scalar(name: impl Into<String>, width: usize, value: u64) -> Self {
        Field {
            name: name.into(),
            width,
            kind: FieldKind::Scalar(value),
        }
    }

    pub fn wide(name: impl Into<String>, width: usize, limbs: Vec<u64>) -> Self {
        Field {
            name: name.into(),
            width,
            kind: FieldKind::Wide(limbs),
        }
    }

    /// A vector field whose lane count is taken from `values`.
    pub fn vector(name: impl Into<String>, width: usize, values: Vec<u64>) -> Self {
        Field {
            name: name.into(),
            width,
            kind: FieldKind::Vector {
                lanes: values.len(),
                values,
            },
        }
    }

    /// Total bits this field occupies in a packed region.
    pub fn total_bits(&self) -> usize {
        match &self.kind {
            FieldKind::Vector { lanes, .. } => self.width * lanes,
            FieldKind::Scalar(_) | FieldKind::Wide(_) => self.width,
        }
    }

    /// Checks the field's geometry before any bit is packed.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.width == 0 {
            return Err(LayoutError::ZeroFieldWidth {
                field: self.name.clone(),
            });
        }

        match &self.kind {
            FieldKind::Scalar(_) => {
                if self.width > 64 {
                    return Err(LayoutError::FieldTooWide {
                        field: self.name.clone(),
                        width: self.width,
                    });
                }
            }
            FieldKind::Wide(limbs) => {
                if limbs.len() < limbs_for(self.width) {
                    return Err(LayoutError::WideLimbsTooShort {
                        field: self.name.clone(),
                        width: self.width,
                        limbs: limbs.len(),
                    });
                }
            }
            FieldKind::Vector { lanes, values } => {
                if self.width > 64 {
                    return Err(LayoutError::FieldTooWide {
                        field: self.name.clone(),
                        width: self.width,
                    });
                }
                if *lanes != values.len() {
                    return Err(LayoutError::LaneCountMismatch {
                        field: self.name.clone(),
                        lanes: *lanes,
                        values: values.len(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(feature = "serde")]
impl From<crate::serde::FieldDef> for Field {
    fn from(value: crate::serde::FieldDef) -> Self {
        let kind = match value.kind {
            crate::serde::FieldKindDef::Scalar { value } => FieldKind::Scalar(value),
            crate::serde::FieldKindDef::Wide { limbs } => FieldKind::Wide(limbs),
            crate::serde::FieldKindDef::Vector { lanes, values } => {
                FieldKind::Vector { lanes, values }
            }
        };

        Field {
            name: value.name,
            width: value.width,
            kind,
        }
    }
}

/// An ordered group of fields sharing one base address and one alignment boundary.
///
/// A packed region always ends on a register boundary, so no register holds
/// bits of two regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    /// Offset of the region's first register from the core base address.
    pub base_offset: u64,
    /// Fields in packing order.
    pub fields: Vec<Field>,
}

impl Region {
    pub fn new(name: impl Into<String>, base_offset: u64, fields: Vec<Field>) -> Self {
        Region {
            name: name.into(),
            base_offset,
            fields,
        }
    }

    /// Sum of all field bits, before padding to a register boundary.
    pub fn total_bits(&self) -> usize {
        self.fields.iter().map(Field::total_bits).sum()
    }

    /// Registers occupied once packed. `register_width` comes from a
    /// validated [crate::RegisterPacker], so it is never 0.
    pub(crate) fn register_count(&self, register_width: usize) -> usize {
        self.total_bits().div_ceil(register_width)
    }
}

#[cfg(feature = "serde")]
impl From<crate::serde::RegionDef> for Region {
    fn from(value: crate::serde::RegionDef) -> Self {
        Region {
            name: value.name,
            base_offset: value.base_offset,
            fields: value.fields.into_iter().map(Into::into).collect(),
        }
    }
}
