//! # stimpack
//!
//! Bit-exact serialization of accelerator configuration and tensor data for
//! hardware verification stimuli.
//!
//! Configuration fields of arbitrary width are packed into fixed-width
//! memory-mapped registers, region by region, and paired with their
//! addresses. Tensor elements of arbitrary width are packed densely into
//! byte buffers at any bit offset.
//!
//! ## Example
//!
//! ```
//! use stimpack::field::{Field, Region};
//! use stimpack::register::RegisterPacker;
//!
//! let regions = vec![
//!     Region::new("control", 0x200, vec![
//!         Field::scalar("incntlim", 18, 287),
//!         Field::scalar("thres", 2, 1),
//!     ]),
//!     Region::new("ifmap", 0x400, vec![
//!         Field::wide("dil_pat", 40, vec![0xFF_FFFF_FFFF]),
//!         Field::vector("loc_woffs", 8, vec![3, 4]),
//!     ]),
//! ];
//!
//! let packer = RegisterPacker::new(32).unwrap();
//! let packed = packer.pack(&regions).unwrap();
//! assert_eq!(packed.words.len(), 3);
//!
//! let writes = packed.writes(0x4420_0000).unwrap();
//! assert_eq!(writes[1].address, 0x4420_0400);
//! assert_eq!(writes[1].value, 0xFFFF_FFFF);
//! ```

pub mod address;
pub mod bits;
pub mod bytes;
pub mod errors;
pub mod field;
pub mod policy;
pub mod register;
#[cfg(feature = "serde")]
pub mod serde;

pub use address::RegisterWrite;
pub use bytes::BitBuffer;
pub use policy::OverflowPolicy;
pub use register::RegisterPacker;
