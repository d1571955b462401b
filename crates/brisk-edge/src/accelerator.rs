//! The accelerator seam: one operator on one device, exposing a single
//! forward capability.

use std::fmt;

use serde::{Deserialize, Serialize};

use brisk_core::{BriskError, DeviceKind, LayoutKind, Result, TensorBuffer};

/// Operator kinds the runtime can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    Pad,
    Relu,
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorKind::Pad => write!(f, "pad"),
            OperatorKind::Relu => write!(f, "relu"),
        }
    }
}

/// A device-specific implementation of one operator's forward pass.
///
/// Outputs are pre-allocated by the caller with their final dims, data kind
/// and layout; the accelerator only fills them.
pub trait LayerAcc: Send {
    fn kind(&self) -> OperatorKind;

    fn device(&self) -> DeviceKind;

    fn do_forward(&mut self, inputs: &[&TensorBuffer], outputs: &mut [TensorBuffer]) -> Result<()>;
}

/// Unpack the single input and single output most operators take, checking
/// both are in `layout`.
pub(crate) fn single_io<'a, 'b>(
    op: OperatorKind,
    layout: LayoutKind,
    inputs: &[&'a TensorBuffer],
    outputs: &'b mut [TensorBuffer],
) -> Result<(&'a TensorBuffer, &'b mut TensorBuffer)> {
    if inputs.len() != 1 || outputs.len() != 1 {
        return Err(BriskError::Model(format!(
            "{op} takes 1 input and 1 output, got {} and {}",
            inputs.len(),
            outputs.len()
        )));
    }
    let input = inputs[0];
    let output = &mut outputs[0];
    if input.layout() != layout || output.layout() != layout {
        return Err(BriskError::Model(format!(
            "{op} expects {layout} buffers, got {} -> {}",
            input.layout(),
            output.layout()
        )));
    }
    if input.data_kind() != output.data_kind() {
        return Err(BriskError::Model(format!(
            "{op} input is {} but output is {}",
            input.data_kind(),
            output.data_kind()
        )));
    }
    Ok((input, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use brisk_core::{DataKind, TensorDims};

    fn buf(layout: LayoutKind, kind: DataKind) -> TensorBuffer {
        TensorBuffer::zeros(TensorDims::new(1, 1, 1, 1), kind, layout, DeviceKind::Naive)
    }

    #[test]
    fn test_single_io_arity() {
        let a = buf(LayoutKind::Nchw, DataKind::Float32);
        let mut outs = vec![buf(LayoutKind::Nchw, DataKind::Float32); 2];
        let err = single_io(OperatorKind::Relu, LayoutKind::Nchw, &[&a], &mut outs).unwrap_err();
        assert!(matches!(err, BriskError::Model(_)));
    }

    #[test]
    fn test_single_io_layout_and_kind() {
        let a = buf(LayoutKind::Nchw, DataKind::Float32);
        let mut outs = vec![buf(LayoutKind::Nc4hw4, DataKind::Float32)];
        assert!(single_io(OperatorKind::Pad, LayoutKind::Nc4hw4, &[&a], &mut outs).is_err());

        let mut outs = vec![buf(LayoutKind::Nchw, DataKind::Int32)];
        assert!(single_io(OperatorKind::Pad, LayoutKind::Nchw, &[&a], &mut outs).is_err());

        let mut outs = vec![buf(LayoutKind::Nchw, DataKind::Float32)];
        assert!(single_io(OperatorKind::Pad, LayoutKind::Nchw, &[&a], &mut outs).is_ok());
    }

    #[test]
    fn test_operator_kind_serde() {
        assert_eq!(OperatorKind::Pad.to_string(), "pad");
        let k: OperatorKind = serde_json::from_str("\"relu\"").unwrap();
        assert_eq!(k, OperatorKind::Relu);
    }
}
