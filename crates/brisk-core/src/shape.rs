use smallvec::SmallVec;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BriskError, Result};

/// Lane width of the channel-vectorized layout.
pub const LANE: usize = 4;

/// Round `n` up to the next multiple of the lane width.
pub fn round_up4(n: usize) -> usize {
    n.div_ceil(LANE) * LANE
}

/// Arbitrary-rank shape of a host array, stack-allocated for ≤4 dimensions.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: SmallVec<[usize; 4]>,
}

impl Shape {
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Row-major strides in elements.
    pub fn contiguous_strides(&self) -> SmallVec<[usize; 4]> {
        let ndim = self.dims.len();
        if ndim == 0 {
            return SmallVec::new();
        }
        let mut strides = SmallVec::from_elem(0usize, ndim);
        strides[ndim - 1] = 1;
        for i in (0..ndim - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.dims.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape {
            dims: SmallVec::from_vec(dims),
        }
    }
}

/// Logical `[batch, channels, height, width]` dims of a rank-4 tensor.
///
/// `channels` is always the logical count; the channel-vectorized layout pads it
/// physically to a multiple of [`LANE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[usize; 4]", into = "[usize; 4]")]
pub struct TensorDims {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl TensorDims {
    pub const fn new(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            batch,
            channels,
            height,
            width,
        }
    }

    /// Build dims from a host shape. Shapes of rank < 4 are left-padded with 1s.
    pub fn from_shape(dims: &[usize]) -> Result<Self> {
        if dims.len() > 4 {
            return Err(BriskError::Parameter(format!(
                "expected a shape of rank <= 4, got rank {} ({:?})",
                dims.len(),
                dims
            )));
        }
        let mut full = [1usize; 4];
        full[4 - dims.len()..].copy_from_slice(dims);
        Ok(full.into())
    }

    pub fn as_array(&self) -> [usize; 4] {
        [self.batch, self.channels, self.height, self.width]
    }

    /// Number of logical elements.
    pub fn numel(&self) -> usize {
        self.batch * self.channels * self.height * self.width
    }

    /// Number of 4-wide channel groups.
    pub fn channel_groups(&self) -> usize {
        self.channels.div_ceil(LANE)
    }

    /// Channel count rounded up to the lane width.
    pub fn padded_channels(&self) -> usize {
        round_up4(self.channels)
    }

    /// Spatial positions per channel plane.
    pub fn plane(&self) -> usize {
        self.height * self.width
    }
}

impl From<[usize; 4]> for TensorDims {
    fn from(d: [usize; 4]) -> Self {
        TensorDims::new(d[0], d[1], d[2], d[3])
    }
}

impl From<TensorDims> for [usize; 4] {
    fn from(d: TensorDims) -> Self {
        d.as_array()
    }
}

impl fmt::Display for TensorDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.batch, self.channels, self.height, self.width
        )
    }
}
