//! Error types for layout validation, packing and unpacking.

use thiserror::Error;

/// Geometry errors: the described layout cannot be packed at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Register width is 0.
    #[error("register width must be at least 1 bit")]
    ZeroRegisterWidth,
    /// Register width does not fit in a 64-bit word.
    #[error("register width {width} exceeds 64 bits")]
    RegisterWidthTooLarge { width: usize },
    /// A field declares a width of 0 bits.
    #[error("field `{field}` has zero width")]
    ZeroFieldWidth { field: String },
    /// A scalar or vector lane is wider than 64 bits; use a wide field instead.
    #[error("field `{field}` is {width} bits wide; scalar and vector fields hold at most 64")]
    FieldTooWide { field: String, width: usize },
    /// A vector field's value count does not match its lane count.
    #[error("vector field `{field}` declares {lanes} lanes but carries {values} values")]
    LaneCountMismatch {
        field: String,
        lanes: usize,
        values: usize,
    },
    /// A wide field's limbs hold fewer bits than its declared width.
    #[error("wide field `{field}` is {width} bits wide but only {limbs} limbs were given")]
    WideLimbsTooShort {
        field: String,
        width: usize,
        limbs: usize,
    },
    /// Packed regions and base offsets do not pair up.
    #[error("{regions} packed regions but {offsets} base offsets")]
    RegionCountMismatch { regions: usize, offsets: usize },
    /// A register address does not fit in 64 bits.
    #[error("address of register {index} in region {region} overflows 64 bits")]
    AddressOverflow { region: usize, index: usize },
    /// Byte-packed element width is 0 or wider than 64 bits.
    #[error("element width {width} is outside 1..=64")]
    InvalidElementWidth { width: usize },
}

/// Errors produced while writing packed output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// A value does not fit its declared width under [crate::OverflowPolicy::Reject].
    #[error("value {value:#x} of `{field}` does not fit in {width} bits")]
    ValueOverflow {
        field: String,
        width: usize,
        value: u64,
    },
    /// A wide value has a set bit at or above its declared width.
    #[error("wide field `{field}` has bit {bit} set but is only {width} bits wide")]
    WideValueOverflow {
        field: String,
        width: usize,
        bit: usize,
    },
    /// A write landed past the pre-sized register buffer.
    #[error("register index {index} is past the end of a {len}-register buffer")]
    RegisterOverflow { index: usize, len: usize },
    /// A bit span ends past the end of the byte buffer.
    #[error("bit span ending at {end_bit} does not fit in a {len}-byte buffer")]
    BufferOverflow { end_bit: usize, len: usize },
    /// A pack would OR into a bit that an earlier pack already owns.
    #[error("bit {bit} was already written by an earlier pack")]
    OverlappingBits { bit: usize },
}

/// Errors produced when reading values back out of packed output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// Requested bits are beyond the end of the data.
    #[error("read past the end of the packed data")]
    OutOfBounds,
    #[error(transparent)]
    Layout(#[from] LayoutError),
}
