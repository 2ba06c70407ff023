//! Error types for tensor encoding and memory image construction.

use stimpack::errors::{LayoutError, PackError, ReadError};
use thiserror::Error;

/// Errors produced when encoding tensor elements to their hardware bit format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Integer width is 0 or greater than 64 bits.
    #[error("integer width {width} is outside 1..=64")]
    InvalidIntWidth { width: usize },
    /// Value fits neither the signed nor the unsigned range of the width.
    #[error("value {value} does not fit in {width} bits")]
    IntOutOfRange { value: i128, width: usize },
    /// Float format has too few exponent bits, too many mantissa bits, or exceeds 64 bits.
    #[error("unsupported float format: {mantissa_bits} mantissa bits in {total_bits} total")]
    InvalidFloatFormat {
        mantissa_bits: usize,
        total_bits: usize,
    },
    /// NaN has no encoding in the custom float formats.
    #[error("NaN cannot be encoded")]
    NotANumber,
}

/// Errors produced while laying out tensors in a memory image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error(transparent)]
    Pack(#[from] PackError),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Value count does not match the product of the shape.
    #[error("shape {shape:?} holds {expected} elements but {actual} values were given")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
    /// The element count of the shape does not fit in `usize`.
    #[error("shape {shape:?} has more elements than fit in memory")]
    ShapeOverflow { shape: Vec<usize> },
    /// Preloads and expected outputs must occupy the same partial-sum region.
    #[error(
        "partial-sum preloads ({preloads} x {preload_width}b) and outputs ({outputs} x {output_width}b) differ"
    )]
    PartialSumMismatch {
        preloads: usize,
        preload_width: usize,
        outputs: usize,
        output_width: usize,
    },
}
