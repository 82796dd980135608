use mrirecon_frame::{Axis, Dimensions};
use serde::Serialize;

use crate::error::{ProtoError, Result};

/// Largest number of `f32` values a single array may hold (1 GiB).
pub const MAX_ARRAY_VALUES: usize = 1 << 28;

/// Dense multi-dimensional sample buffer.
///
/// Column varies fastest, Average slowest. Complex arrays store an
/// interleaved `(re, im)` pair per element. Cloning copies the samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleArray {
    dims: Dimensions,
    complex: bool,
    data: Vec<f32>,
}

/// Shape summary, for reports.
#[derive(Debug, Clone, Serialize)]
pub struct ArraySummary {
    pub dims: Dimensions,
    pub complex: bool,
    pub values: usize,
    pub min: Option<f32>,
    pub max: Option<f32>,
}

impl SampleArray {
    /// Zero-filled array of the given shape.
    pub fn new(dims: Dimensions, complex: bool) -> Result<Self> {
        let len = Self::value_count(&dims, complex)?;
        Ok(Self {
            dims,
            complex,
            data: vec![0.0; len],
        })
    }

    /// Wrap an existing buffer, which must match the shape exactly.
    pub fn from_vec(dims: Dimensions, complex: bool, data: Vec<f32>) -> Result<Self> {
        let expected = Self::value_count(&dims, complex)?;
        if data.len() != expected {
            return Err(ProtoError::LengthMismatch {
                dims,
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            dims,
            complex,
            data,
        })
    }

    /// Number of `f32` values an array of this shape holds.
    pub fn value_count(dims: &Dimensions, complex: bool) -> Result<usize> {
        if !dims.is_materializable() {
            return Err(ProtoError::EmptyAxis(*dims));
        }
        let factor = if complex { 2 } else { 1 };
        dims.element_count()
            .and_then(|n| n.checked_mul(factor))
            .filter(|n| *n <= MAX_ARRAY_VALUES)
            .ok_or(ProtoError::TooLarge {
                dims: *dims,
                max: MAX_ARRAY_VALUES,
            })
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    pub fn is_complex(&self) -> bool {
        self.complex
    }

    /// Values per logical element: 2 for complex, 1 for real.
    pub fn values_per_element(&self) -> usize {
        if self.complex {
            2
        } else {
            1
        }
    }

    /// Number of logical elements.
    pub fn element_count(&self) -> usize {
        self.data.len() / self.values_per_element()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Position of the first value of the element at `index`.
    pub fn offset(&self, index: &Dimensions) -> Option<usize> {
        if !self.dims.contains(index) {
            return None;
        }
        let mut stride = 1usize;
        let mut linear = 0usize;
        for axis in Axis::ALL {
            linear += index.get(axis) as usize * stride;
            stride *= self.dims.get(axis) as usize;
        }
        Some(linear * self.values_per_element())
    }

    /// Values of one readout line: all columns at `index` (column ignored).
    pub fn line(&self, index: &Dimensions) -> Option<&[f32]> {
        let range = self.line_range(index)?;
        Some(&self.data[range])
    }

    pub fn line_mut(&mut self, index: &Dimensions) -> Option<&mut [f32]> {
        let range = self.line_range(index)?;
        Some(&mut self.data[range])
    }

    fn line_range(&self, index: &Dimensions) -> Option<std::ops::Range<usize>> {
        let mut start = *index;
        start.column = 0;
        let offset = self.offset(&start)?;
        Some(offset..offset + self.dims.column as usize * self.values_per_element())
    }

    pub fn summary(&self) -> ArraySummary {
        let finite = self.data.iter().copied().filter(|v| v.is_finite());
        let (min, max) = finite.fold((None, None), |(lo, hi): (Option<f32>, Option<f32>), v| {
            (
                Some(lo.map_or(v, |lo| lo.min(v))),
                Some(hi.map_or(v, |hi| hi.max(v))),
            )
        });
        ArraySummary {
            dims: self.dims,
            complex: self.complex,
            values: self.data.len(),
            min,
            max,
        }
    }
}
