//! ReLU accelerators.

use half::f16;

use brisk_core::{BriskError, DataKind, DeviceKind, Element, LayoutKind, Result, TensorBuffer};
use brisk_kernels::relu::{relu_lanes, relu_scalar};

use crate::accelerator::{single_io, LayerAcc, OperatorKind};

type Kernel<T> = fn(&[T], &mut [T]) -> Result<()>;

fn run<T: Element>(input: &TensorBuffer, output: &mut TensorBuffer, kernel: Kernel<T>) -> Result<()> {
    let src = input
        .as_slice::<T>()
        .ok_or_else(|| BriskError::Storage(format!("relu input is not {}", T::KIND)))?;
    let dst = output
        .as_slice_mut::<T>()
        .ok_or_else(|| BriskError::Storage(format!("relu output is not {}", T::KIND)))?;
    kernel(src, dst)
}

fn dispatch(
    device: DeviceKind,
    layout: LayoutKind,
    inputs: &[&TensorBuffer],
    outputs: &mut [TensorBuffer],
) -> Result<()> {
    let (input, output) = single_io(OperatorKind::Relu, layout, inputs, outputs)?;
    let lanes = layout == LayoutKind::Nc4hw4;
    match output.data_kind() {
        DataKind::Float32 if lanes => run::<f32>(input, output, relu_lanes),
        DataKind::Float32 => run::<f32>(input, output, relu_scalar),
        DataKind::Float16 if lanes => run::<f16>(input, output, relu_lanes),
        DataKind::Float16 => run::<f16>(input, output, relu_scalar),
        DataKind::Int32 if lanes => run::<i32>(input, output, relu_lanes),
        DataKind::Int32 => run::<i32>(input, output, relu_scalar),
        other => Err(BriskError::UnsupportedConfiguration(format!(
            "relu on {device} does not support {other} data"
        ))),
    }
}

/// ReLU over NC4HW4 lanes.
pub struct VectorReluAcc;

impl LayerAcc for VectorReluAcc {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Relu
    }

    fn device(&self) -> DeviceKind {
        DeviceKind::VectorCpu
    }

    fn do_forward(&mut self, inputs: &[&TensorBuffer], outputs: &mut [TensorBuffer]) -> Result<()> {
        dispatch(DeviceKind::VectorCpu, LayoutKind::Nc4hw4, inputs, outputs)
            .inspect_err(|e| tracing::error!(device = %DeviceKind::VectorCpu, "relu failed: {e}"))
    }
}

/// Scalar ReLU over planar buffers.
pub struct NaiveReluAcc;

impl LayerAcc for NaiveReluAcc {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Relu
    }

    fn device(&self) -> DeviceKind {
        DeviceKind::Naive
    }

    fn do_forward(&mut self, inputs: &[&TensorBuffer], outputs: &mut [TensorBuffer]) -> Result<()> {
        dispatch(DeviceKind::Naive, LayoutKind::Nchw, inputs, outputs)
            .inspect_err(|e| tracing::error!(device = %DeviceKind::Naive, "relu failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brisk_core::{ErrorKind, TensorDims};

    #[test]
    fn test_vector_relu() {
        let dims = TensorDims::new(1, 2, 1, 1);
        let input = TensorBuffer::from_vec(
            dims,
            LayoutKind::Nc4hw4,
            DeviceKind::VectorCpu,
            vec![-1.0f32, 2.0, 0.0, 0.0],
        )
        .unwrap();
        let mut outputs =
            vec![TensorBuffer::zeros(dims, DataKind::Float32, LayoutKind::Nc4hw4, DeviceKind::VectorCpu)];
        VectorReluAcc.do_forward(&[&input], &mut outputs).unwrap();
        assert_eq!(outputs[0].as_f32_slice().unwrap(), &[0.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_naive_relu_int32() {
        let dims = TensorDims::new(1, 1, 1, 3);
        let input =
            TensorBuffer::from_vec(dims, LayoutKind::Nchw, DeviceKind::Naive, vec![-4i32, 0, 9]).unwrap();
        let mut outputs =
            vec![TensorBuffer::zeros(dims, DataKind::Int32, LayoutKind::Nchw, DeviceKind::Naive)];
        NaiveReluAcc.do_forward(&[&input], &mut outputs).unwrap();
        assert_eq!(outputs[0].as_slice::<i32>().unwrap(), &[0, 0, 9]);
    }

    #[test]
    fn test_relu_unsupported_kind() {
        let dims = TensorDims::new(1, 1, 1, 1);
        let input = TensorBuffer::zeros(dims, DataKind::Int64, LayoutKind::Nchw, DeviceKind::Naive);
        let mut outputs =
            vec![TensorBuffer::zeros(dims, DataKind::Int64, LayoutKind::Nchw, DeviceKind::Naive)];
        let err = NaiveReluAcc.do_forward(&[&input], &mut outputs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConfiguration);
    }
}
