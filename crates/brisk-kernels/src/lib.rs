//! # brisk-kernels
//!
//! CPU kernels for the brisk inference runtime.
//!
//! Provides:
//! - [`Lane`] — the immutable 4-wide value every packed kernel is written in
//! - Pad over NC4HW4 buffers (constant and reflect) with rayon plane parallelism
//! - A scalar planar pad used by the naive device and as a test oracle
//! - NCHW ↔ NC4HW4 layout conversion
//! - ReLU over lanes and scalars

pub mod convert;
pub mod lane;
pub mod pad;
pub mod reference;
pub mod relu;

pub use convert::{nc4hw4_to_nchw, nchw_to_nc4hw4, reformat, to_layout};
pub use lane::{lane_backend, Lane};
pub use pad::{const_pad, pad_nc4hw4, reflect_pad, PadMode, Pads, DEFAULT_PAR_MIN_GROUPS};
pub use reference::pad_nchw;
