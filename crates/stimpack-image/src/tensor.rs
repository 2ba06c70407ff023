//! Dense tensors of already-encoded elements.

use stimpack::errors::LayoutError;

use crate::errors::ImageError;

/// A row-major tensor whose elements are raw bit patterns of `element_width` bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor {
    values: Vec<u64>,
    shape: Vec<usize>,
    element_width: usize,
}

impl Tensor {
    /// Creates a tensor; `values.len()` must equal the product of `shape`.
    pub fn new(
        values: Vec<u64>,
        shape: Vec<usize>,
        element_width: usize,
    ) -> Result<Self, ImageError> {
        if element_width == 0 || element_width > 64 {
            return Err(LayoutError::InvalidElementWidth {
                width: element_width,
            }
            .into());
        }

        let expected = shape
            .iter()
            .try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
            .ok_or_else(|| ImageError::ShapeOverflow {
                shape: shape.clone(),
            })?;
        if values.len() != expected {
            return Err(ImageError::ShapeMismatch {
                shape,
                expected,
                actual: values.len(),
            });
        }

        Ok(Tensor {
            values,
            shape,
            element_width,
        })
    }

    /// A one-dimensional tensor.
    pub fn flat(values: Vec<u64>, element_width: usize) -> Result<Self, ImageError> {
        let shape = vec![values.len()];
        Tensor::new(values, shape, element_width)
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn element_width(&self) -> usize {
        self.element_width
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bits occupied when packed densely.
    pub fn bit_len(&self) -> usize {
        self.values.len() * self.element_width
    }

    /// Moves the leading (output channel) axis to the innermost position.
    ///
    /// A `[K, C, H, W]` weight tensor becomes `[C, H, W, K]`, which is the
    /// order the weight fetcher streams elements in.
    pub fn output_channel_innermost(&self) -> Tensor {
        let Some((&outer, rest)) = self.shape.split_first() else {
            return self.clone();
        };
        if rest.is_empty() {
            return self.clone();
        }

        let inner: usize = rest.iter().product();
        let mut values = Vec::with_capacity(self.values.len());
        for i in 0..inner {
            for k in 0..outer {
                values.push(self.values[k * inner + i]);
            }
        }

        let mut shape = rest.to_vec();
        shape.push(outer);

        Tensor {
            values,
            shape,
            element_width: self.element_width,
        }
    }
}
