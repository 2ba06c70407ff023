//! # stimpack-image
//!
//! Device and golden memory images for convolution test cases.
//!
//! Tensors are encoded to their hardware element format with [encode],
//! then laid out back to back in a [MemoryImage]. The device image carries
//! the partial-sum preloads and the golden image carries the partial sums
//! the accelerator is expected to leave behind.
//!
//! ## Example
//!
//! ```
//! use stimpack_image::{ConvTensors, MemoryImage, Tensor, encode::twos_complement_all};
//!
//! let tensors = ConvTensors {
//!     activations: Tensor::flat(twos_complement_all(&[-1, 2], 8).unwrap(), 8).unwrap(),
//!     weights: Tensor::new(vec![1, 2], vec![2, 1], 4).unwrap(),
//!     preloads: Tensor::flat(vec![0, 0], 16).unwrap(),
//!     outputs: Tensor::flat(vec![7, 9], 16).unwrap(),
//! };
//!
//! let mut image = MemoryImage::new(0x8000);
//! let placement = image.append(&tensors).unwrap();
//!
//! assert_eq!(placement.weights, 0x8002);
//! assert_eq!(placement.last_byte(), Some(0x8006));
//! assert_eq!(image.device()[..3], [0xFF, 0x02, 0x21]);
//! ```

pub mod encode;
pub mod errors;
pub mod image;
pub mod tensor;

pub use errors::ImageError;
pub use image::{ConvTensors, MemoryImage, TensorPlacement, write_hex};
pub use tensor::Tensor;
