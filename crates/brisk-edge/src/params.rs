//! Per-operator layer parameters as a tagged enum.
//!
//! ```json
//! { "op": "pad", "pads": [0, 3, 1, 1, 0, 0, 1, 1], "mode": "constant", "value": 0.0 }
//! { "op": "relu" }
//! ```

use serde::{Deserialize, Serialize};

use brisk_core::{Result, TensorDims};
use brisk_kernels::{PadMode, Pads};

use crate::accelerator::OperatorKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadParams {
    /// `[batch_b, channel_b, height_b, width_b, batch_e, channel_e, height_e, width_e]`
    pub pads: Vec<i32>,
    #[serde(default)]
    pub mode: PadMode,
    /// Fill value for constant mode, converted to the element type.
    #[serde(default)]
    pub value: f32,
}

impl PadParams {
    pub fn new(pads: Vec<i32>, mode: PadMode, value: f32) -> Self {
        Self { pads, mode, value }
    }

    /// Constant padding with the given fill.
    pub fn constant(pads: Vec<i32>, value: f32) -> Self {
        Self::new(pads, PadMode::Constant, value)
    }

    pub fn reflect(pads: Vec<i32>) -> Self {
        Self::new(pads, PadMode::Reflect, 0.0)
    }

    pub fn parse_pads(&self) -> Result<Pads> {
        Pads::from_spec(&self.pads)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReluParams {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LayerParams {
    Pad(PadParams),
    Relu(ReluParams),
}

impl LayerParams {
    pub fn kind(&self) -> OperatorKind {
        match self {
            LayerParams::Pad(_) => OperatorKind::Pad,
            LayerParams::Relu(_) => OperatorKind::Relu,
        }
    }

    /// Output dims produced from `input`.
    pub fn infer_output(&self, input: &TensorDims) -> Result<TensorDims> {
        match self {
            LayerParams::Pad(p) => Ok(p.parse_pads()?.output_dims(input)),
            LayerParams::Relu(_) => Ok(*input),
        }
    }
}

/// Narrowing from [`LayerParams`] to one operator's parameter type.
///
/// Accelerator constructors take the narrowed type, so a factory can never be
/// handed another operator's parameters.
pub trait OperatorParams: Sized + 'static {
    const KIND: OperatorKind;

    fn narrow(params: &LayerParams) -> Option<&Self>;
}

impl OperatorParams for PadParams {
    const KIND: OperatorKind = OperatorKind::Pad;

    fn narrow(params: &LayerParams) -> Option<&Self> {
        match params {
            LayerParams::Pad(p) => Some(p),
            _ => None,
        }
    }
}

impl OperatorParams for ReluParams {
    const KIND: OperatorKind = OperatorKind::Relu;

    fn narrow(params: &LayerParams) -> Option<&Self> {
        match params {
            LayerParams::Relu(p) => Some(p),
            _ => None,
        }
    }
}

impl From<PadParams> for LayerParams {
    fn from(p: PadParams) -> Self {
        LayerParams::Pad(p)
    }
}

impl From<ReluParams> for LayerParams {
    fn from(p: ReluParams) -> Self {
        LayerParams::Relu(p)
    }
}
