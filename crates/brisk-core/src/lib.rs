//! # brisk-core
//!
//! Tensor descriptors and packed buffers for the brisk inference runtime.
//!
//! Provides:
//! - [`TensorDims`] — rank-4 `[batch, channels, height, width]` dims
//! - [`DataKind`] / [`DeviceKind`] / [`LayoutKind`] — element type, backend, memory arrangement
//! - [`TensorBuffer`] — owned typed memory tagged with dims, kind, layout and device
//! - [`BlockStrides`] — stride metadata for the channel-vectorized (NC4HW4) layout
//! - [`BriskError`] — the error taxonomy shared by every crate

pub mod device;
pub mod dtype;
pub mod error;
pub mod layout;
pub mod shape;
pub mod storage;

pub use device::DeviceKind;
pub use dtype::DataKind;
pub use error::{BriskError, ErrorKind};
pub use layout::{nchw_offset, BlockStrides, LayoutKind};
pub use shape::{round_up4, Shape, TensorDims, LANE};
pub use storage::{BufferData, Element, TensorBuffer};

pub type Result<T> = std::result::Result<T, BriskError>;
