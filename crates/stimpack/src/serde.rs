//! JSON-deserializable register layout description.
//!
//! A [LayoutDef] describes one accelerator core's configuration interface:
//! register width, the core's base address, and the regions with their
//! fields and values. It is typically produced by the test driver from
//! derived hardware parameters, then converted into core `stimpack` types.

use serde::{Deserialize, Serialize};

use crate::{
    address::RegisterWrite,
    errors::{LayoutError, PackError},
    field::Region,
    policy::OverflowPolicy,
    register::{PackedRegisters, RegisterPacker},
};

/// What to do with values wider than their field.
#[derive(Debug, Deserialize, Serialize, Default, Clone, Copy)]
pub enum OverflowPolicyDef {
    /// Keep the low bits.
    #[default]
    Truncate,
    /// Fail the pack.
    Reject,
}

impl From<OverflowPolicyDef> for OverflowPolicy {
    fn from(value: OverflowPolicyDef) -> Self {
        match value {
            OverflowPolicyDef::Truncate => OverflowPolicy::Truncate,
            OverflowPolicyDef::Reject => OverflowPolicy::Reject,
        }
    }
}

/// Top-level layout: register geometry plus regions in packing order.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LayoutDef {
    /// Width in bits of one configuration register (e.g. the AXI-Lite data width).
    pub register_width: usize,
    /// Address of the core's configuration space.
    pub core_base_address: u64,
    #[serde(default)]
    pub overflow: OverflowPolicyDef,
    pub regions: Vec<RegionDef>,
}

/// One register region.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegionDef {
    pub name: String,
    /// Offset of the region from the core base address.
    pub base_offset: u64,
    pub fields: Vec<FieldDef>,
}

/// One field with its value.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    pub name: String,
    /// Width in bits (per lane for vectors).
    pub width: usize,
    pub kind: FieldKindDef,
}

/// Field shape and value(s).
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type")]
pub enum FieldKindDef {
    /// Value of at most 64 bits.
    Scalar { value: u64 },
    /// Arbitrary-width value as little-endian 64-bit limbs.
    Wide { limbs: Vec<u64> },
    /// One value per lane.
    Vector { lanes: usize, values: Vec<u64> },
}

impl LayoutDef {
    /// Builds a validated packer for this layout's register width and policy.
    pub fn packer(&self) -> Result<RegisterPacker, LayoutError> {
        Ok(RegisterPacker::new(self.register_width)?.with_policy(self.overflow.into()))
    }

    /// The layout's regions as core types.
    pub fn regions(&self) -> Vec<Region> {
        self.regions.iter().cloned().map(Into::into).collect()
    }

    /// Packs every region.
    pub fn pack(&self) -> Result<PackedRegisters, PackError> {
        self.packer()?.pack(&self.regions())
    }

    /// Packs every region and assigns each word its address.
    pub fn writes(&self) -> Result<Vec<RegisterWrite>, PackError> {
        Ok(self.pack()?.writes(self.core_base_address)?)
    }
}
