//! # brisk-edge
//!
//! On-device execution runtime for brisk graphs.
//!
//! Provides:
//! - [`AcceleratorRegistry`] — `(OperatorKind, DeviceKind)` → accelerator factory + layout
//! - [`LayerAcc`] — the single `do_forward` capability every accelerator implements
//! - Built-in pad and relu accelerators for the naive and vector CPU devices
//! - [`Instance`] — dependency-ordered execution with automatic layout conversion
//! - [`Module`] / [`load`] — host binding over row-major float arrays
//! - C FFI (behind the `ffi` feature)

pub mod acc;
pub mod accelerator;
pub mod config;
pub mod graph;
pub mod module;
pub mod params;
pub mod registry;
pub mod runtime;

#[cfg(feature = "ffi")]
pub mod ffi;

pub use accelerator::{LayerAcc, OperatorKind};
pub use config::NetworkConfig;
pub use graph::{GraphDesc, InputDesc, NodeDesc};
pub use module::{load, load_with_config, HostArray, Module};
pub use params::{LayerParams, OperatorParams, PadParams, ReluParams};
pub use registry::{global_registry, register_builtins, AcceleratorRegistry};
pub use runtime::Instance;
