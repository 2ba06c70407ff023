//! Device and golden memory images for one or more convolution test cases.

use std::io;

use stimpack::{BitBuffer, OverflowPolicy, bits::byte_align};

use crate::{errors::ImageError, tensor::Tensor};

/// The encoded tensors of one convolution test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvTensors {
    pub activations: Tensor,
    /// Weights in `[K, ...]` order; the output channel axis is moved
    /// innermost when the image is laid out.
    pub weights: Tensor,
    /// Partial sums loaded before the run (device image).
    pub preloads: Tensor,
    /// Partial sums expected after the run (golden image).
    pub outputs: Tensor,
}

/// Where one test case landed, as absolute byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TensorPlacement {
    pub activations: usize,
    pub weights: usize,
    pub partial_sums: usize,
    /// Bytes spanned from `activations` to the end of the partial sums.
    pub len: usize,
}

impl TensorPlacement {
    /// Exclusive end offset.
    pub fn end(&self) -> usize {
        self.activations + self.len
    }

    /// Inclusive end offset, `None` for a test case with no data.
    pub fn last_byte(&self) -> Option<usize> {
        self.end().checked_sub(1).filter(|_| self.len > 0)
    }
}

/// A pair of growing byte images sharing one layout.
///
/// The device image holds what is loaded before a run and the golden image
/// what memory must contain afterwards. They differ only in the partial-sum
/// regions.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    base_offset: usize,
    policy: OverflowPolicy,
    device: BitBuffer,
    golden: BitBuffer,
}

impl MemoryImage {
    /// An empty image whose first byte sits at `base_offset`.
    pub fn new(base_offset: usize) -> Self {
        MemoryImage {
            base_offset,
            ..Default::default()
        }
    }

    pub fn with_policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds an image holding a single test case.
    pub fn from_tensors(
        base_offset: usize,
        tensors: &ConvTensors,
    ) -> Result<(MemoryImage, TensorPlacement), ImageError> {
        let mut image = MemoryImage::new(base_offset);
        let placement = image.append(tensors)?;
        Ok((image, placement))
    }

    pub fn base_offset(&self) -> usize {
        self.base_offset
    }

    /// Absolute offset where the next test case will start.
    pub fn end_offset(&self) -> usize {
        self.base_offset + self.device.len()
    }

    pub fn device(&self) -> &[u8] {
        self.device.as_bytes()
    }

    pub fn golden(&self) -> &[u8] {
        self.golden.as_bytes()
    }

    /// Consumes the image, returning `(device, golden)`.
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.device.into_bytes(), self.golden.into_bytes())
    }

    /// Appends one test case after everything already in the image.
    ///
    /// Activations, weights and partial sums each start on a fresh byte.
    /// The image is left unchanged if any tensor is rejected.
    pub fn append(&mut self, tensors: &ConvTensors) -> Result<TensorPlacement, ImageError> {
        let ConvTensors {
            activations,
            weights,
            preloads,
            outputs,
        } = tensors;

        if preloads.len() != outputs.len() || preloads.element_width() != outputs.element_width()
        {
            return Err(ImageError::PartialSumMismatch {
                preloads: preloads.len(),
                preload_width: preloads.element_width(),
                outputs: outputs.len(),
                output_width: outputs.element_width(),
            });
        }

        if self.policy == OverflowPolicy::Reject {
            for (name, tensor) in [
                ("activations", activations),
                ("weights", weights),
                ("preloads", preloads),
                ("outputs", outputs),
            ] {
                self.check_values(name, tensor)?;
            }
        }

        let weights = weights.output_channel_innermost();

        let start = self.device.len() * 8;
        let weights_bit = byte_align(start + activations.bit_len());
        let partial_sums_bit = byte_align(weights_bit + weights.bit_len());
        let end = byte_align(partial_sums_bit + preloads.bit_len());

        self.device.grow_to(end / 8);
        self.golden.grow_to(end / 8);

        for buffer in [&mut self.device, &mut self.golden] {
            buffer.pack(
                activations.values(),
                start,
                activations.element_width(),
                self.policy,
            )?;
            buffer.pack(weights.values(), weights_bit, weights.element_width(), self.policy)?;
        }
        self.device.pack(
            preloads.values(),
            partial_sums_bit,
            preloads.element_width(),
            self.policy,
        )?;
        self.golden.pack(
            outputs.values(),
            partial_sums_bit,
            outputs.element_width(),
            self.policy,
        )?;

        let placement = TensorPlacement {
            activations: self.base_offset + start / 8,
            weights: self.base_offset + weights_bit / 8,
            partial_sums: self.base_offset + partial_sums_bit / 8,
            len: (end - start) / 8,
        };

        tracing::debug!(
            activations = placement.activations,
            weights = placement.weights,
            partial_sums = placement.partial_sums,
            len = placement.len,
            "appended test case"
        );

        Ok(placement)
    }

    fn check_values(&self, name: &str, tensor: &Tensor) -> Result<(), ImageError> {
        for (i, value) in tensor.values().iter().enumerate() {
            self.policy
                .fit(&format!("{name}[{i}]"), tensor.element_width(), *value)?;
        }
        Ok(())
    }

    /// Reads `count` elements back from the golden image at an absolute byte offset.
    pub fn read_golden(
        &self,
        offset: usize,
        element_width: usize,
        count: usize,
    ) -> Result<Vec<u64>, ImageError> {
        read(&self.golden, self.base_offset, offset, element_width, count)
    }

    /// Reads `count` elements back from the device image at an absolute byte offset.
    pub fn read_device(
        &self,
        offset: usize,
        element_width: usize,
        count: usize,
    ) -> Result<Vec<u64>, ImageError> {
        read(&self.device, self.base_offset, offset, element_width, count)
    }
}

fn read(
    buffer: &BitBuffer,
    base_offset: usize,
    offset: usize,
    element_width: usize,
    count: usize,
) -> Result<Vec<u64>, ImageError> {
    let relative = offset
        .checked_sub(base_offset)
        .ok_or(stimpack::errors::ReadError::OutOfBounds)?;
    Ok(buffer.unpack(relative * 8, element_width, count)?)
}

/// Writes `bytes` as hex stimulus text: one uppercase, unpadded byte per line.
pub fn write_hex<W: io::Write>(bytes: &[u8], writer: &mut W) -> io::Result<()> {
    for byte in bytes {
        writeln!(writer, "{:X}", byte)?;
    }
    Ok(())
}
