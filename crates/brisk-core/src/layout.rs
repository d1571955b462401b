//! Memory arrangements for rank-4 tensors and the stride metadata kernels use to
//! walk them.
//!
//! ```text
//! planar (NCHW):            c0: h0[w0 w1 ..] h1[..] ..   c1: ..
//! channel-vectorized        g0: h0[(c0 c1 c2 c3)w0 (c0 c1 c2 c3)w1 ..] h1[..] ..
//! (NC4HW4):                 g1: ..
//! ```
//!
//! Under NC4HW4 the last group of each batch holds `channels % 4` real channels
//! followed by padding lanes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shape::{TensorDims, LANE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// Channel-major, one scalar per element.
    #[default]
    Nchw,
    /// Channels blocked into lanes of 4, padded to a multiple of 4.
    Nc4hw4,
}

impl LayoutKind {
    /// Physical element count of a buffer with these dims.
    pub fn physical_len(&self, dims: &TensorDims) -> usize {
        match self {
            LayoutKind::Nchw => dims.numel(),
            LayoutKind::Nc4hw4 => dims.batch * dims.padded_channels() * dims.plane(),
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutKind::Nchw => write!(f, "nchw"),
            LayoutKind::Nc4hw4 => write!(f, "nc4hw4"),
        }
    }
}

/// Element strides of an NC4HW4 buffer, computed once per kernel call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStrides {
    /// Elements between consecutive spatial positions (the lane width).
    pub lane: usize,
    /// Elements per row of one channel group.
    pub row: usize,
    /// Elements per channel group plane.
    pub plane: usize,
    /// Elements per batch item.
    pub batch: usize,
    /// Channel groups per batch item.
    pub groups: usize,
}

impl BlockStrides {
    pub fn nc4hw4(dims: &TensorDims) -> Self {
        let row = dims.width * LANE;
        let plane = dims.height * row;
        let groups = dims.channel_groups();
        Self {
            lane: LANE,
            row,
            plane,
            batch: groups * plane,
            groups,
        }
    }

    /// Offset of the first element of group `g` (counted across batches).
    pub fn group_offset(&self, g: usize) -> usize {
        g * self.plane
    }

    /// Offset of element `(n, c, h, w)`.
    pub fn offset(&self, n: usize, c: usize, h: usize, w: usize) -> usize {
        n * self.batch + (c / LANE) * self.plane + h * self.row + w * self.lane + c % LANE
    }
}

/// Offset of element `(n, c, h, w)` in a planar buffer.
pub fn nchw_offset(dims: &TensorDims, n: usize, c: usize, h: usize, w: usize) -> usize {
    ((n * dims.channels + c) * dims.height + h) * dims.width + w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_len() {
        let dims = TensorDims::new(2, 5, 3, 3);
        assert_eq!(LayoutKind::Nchw.physical_len(&dims), 90);
        assert_eq!(LayoutKind::Nc4hw4.physical_len(&dims), 2 * 8 * 9);
    }

    #[test]
    fn test_block_strides() {
        let dims = TensorDims::new(2, 5, 3, 2);
        let s = BlockStrides::nc4hw4(&dims);
        assert_eq!(s.row, 8);
        assert_eq!(s.plane, 24);
        assert_eq!(s.groups, 2);
        assert_eq!(s.batch, 48);
        // channel 5 of batch 1 lives in the second group, lane 1
        assert_eq!(s.offset(1, 5, 2, 1), 48 + 24 + 16 + 4 + 1);
        assert_eq!(s.group_offset(3), 72);
    }

    #[test]
    fn test_nchw_offset() {
        let dims = TensorDims::new(2, 3, 4, 5);
        assert_eq!(nchw_offset(&dims, 1, 2, 3, 4), dims.numel() - 1);
        assert_eq!(nchw_offset(&dims, 0, 1, 0, 0), 20);
    }
}
