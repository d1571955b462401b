//! Pad accelerators.
//!
//! The mode and pad list are re-read on every forward; nothing is cached from
//! construction, so a bad list surfaces as a parameter error at forward time.
//! Supported element kinds are the 4-byte ones: float32, int32 and uint32.

use brisk_core::{BriskError, DataKind, DeviceKind, Element, LayoutKind, Result, TensorBuffer};
use brisk_kernels::{pad_nc4hw4, pad_nchw};

use crate::accelerator::{single_io, LayerAcc, OperatorKind};
use crate::config::NetworkConfig;
use crate::params::PadParams;

fn unsupported_kind(kind: DataKind, device: DeviceKind) -> BriskError {
    if kind.is_quantized() {
        return BriskError::UnsupportedConfiguration(format!("pad on {device} has no quantized ({kind}) path"));
    }
    BriskError::UnsupportedConfiguration(format!("pad on {device} does not support {kind} data"))
}

fn typed_buffers<'a, 'b, T: Element>(
    input: &'a TensorBuffer,
    output: &'b mut TensorBuffer,
) -> Result<(&'a [T], &'b mut [T])> {
    let src = input
        .as_slice::<T>()
        .ok_or_else(|| BriskError::Storage(format!("pad input is not {}", T::KIND)))?;
    let dst = output
        .as_slice_mut::<T>()
        .ok_or_else(|| BriskError::Storage(format!("pad output is not {}", T::KIND)))?;
    Ok((src, dst))
}

/// Pad over NC4HW4 buffers on the vector CPU.
pub struct VectorPadAcc {
    params: PadParams,
    par_min_groups: usize,
}

impl VectorPadAcc {
    pub fn new(params: PadParams, config: &NetworkConfig) -> Self {
        Self {
            params,
            par_min_groups: config.parallel_min_groups,
        }
    }

    fn run<T: Element>(&self, input: &TensorBuffer, output: &mut TensorBuffer) -> Result<()> {
        let pads = self.params.parse_pads()?;
        let (in_dims, out_dims) = (input.dims(), output.dims());
        let (src, dst) = typed_buffers::<T>(input, output)?;
        pad_nc4hw4(
            src,
            &in_dims,
            dst,
            &out_dims,
            &pads,
            self.params.mode,
            self.params.value,
            self.par_min_groups,
        )
    }

    fn forward(&self, inputs: &[&TensorBuffer], outputs: &mut [TensorBuffer]) -> Result<()> {
        let (input, output) = single_io(OperatorKind::Pad, LayoutKind::Nc4hw4, inputs, outputs)?;
        match output.data_kind() {
            DataKind::Float32 => self.run::<f32>(input, output),
            DataKind::Int32 => self.run::<i32>(input, output),
            DataKind::Uint32 => self.run::<u32>(input, output),
            other => Err(unsupported_kind(other, DeviceKind::VectorCpu)),
        }
    }
}

impl LayerAcc for VectorPadAcc {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Pad
    }

    fn device(&self) -> DeviceKind {
        DeviceKind::VectorCpu
    }

    fn do_forward(&mut self, inputs: &[&TensorBuffer], outputs: &mut [TensorBuffer]) -> Result<()> {
        self.forward(inputs, outputs).inspect_err(|e| {
            tracing::error!(device = %DeviceKind::VectorCpu, pads = ?self.params.pads, "pad failed: {e}");
        })
    }
}

/// Scalar pad over planar buffers.
pub struct NaivePadAcc {
    params: PadParams,
}

impl NaivePadAcc {
    pub fn new(params: PadParams) -> Self {
        Self { params }
    }

    fn run<T: Element>(&self, input: &TensorBuffer, output: &mut TensorBuffer) -> Result<()> {
        let pads = self.params.parse_pads()?;
        let (in_dims, out_dims) = (input.dims(), output.dims());
        let (src, dst) = typed_buffers::<T>(input, output)?;
        pad_nchw(src, &in_dims, dst, &out_dims, &pads, self.params.mode, self.params.value)
    }

    fn forward(&self, inputs: &[&TensorBuffer], outputs: &mut [TensorBuffer]) -> Result<()> {
        let (input, output) = single_io(OperatorKind::Pad, LayoutKind::Nchw, inputs, outputs)?;
        match output.data_kind() {
            DataKind::Float32 => self.run::<f32>(input, output),
            DataKind::Int32 => self.run::<i32>(input, output),
            DataKind::Uint32 => self.run::<u32>(input, output),
            other => Err(unsupported_kind(other, DeviceKind::Naive)),
        }
    }
}

impl LayerAcc for NaivePadAcc {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Pad
    }

    fn device(&self) -> DeviceKind {
        DeviceKind::Naive
    }

    fn do_forward(&mut self, inputs: &[&TensorBuffer], outputs: &mut [TensorBuffer]) -> Result<()> {
        self.forward(inputs, outputs).inspect_err(|e| {
            tracing::error!(device = %DeviceKind::Naive, pads = ?self.params.pads, "pad failed: {e}");
        })
    }
}
