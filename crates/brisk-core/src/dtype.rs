use std::fmt;

use serde::{Deserialize, Serialize};

/// Element types a tensor buffer can hold.
///
/// Kernels decide per data kind whether they have a path for it; the 4-byte kinds
/// (`Float32`, `Int32`, `Uint32`) share the lane-based kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// 32-bit IEEE 754 single-precision float
    #[default]
    Float32,
    /// 16-bit IEEE 754 half-precision float
    Float16,
    /// 16-bit brain float
    Bfloat16,
    /// 8-bit signed integer (quantized activations)
    Int8,
    /// 32-bit signed integer
    Int32,
    /// 32-bit unsigned integer
    Uint32,
    /// 64-bit signed integer
    Int64,
}

impl DataKind {
    /// Size in bytes of a single element.
    pub fn element_size(&self) -> usize {
        match self {
            DataKind::Int8 => 1,
            DataKind::Float16 | DataKind::Bfloat16 => 2,
            DataKind::Float32 | DataKind::Int32 | DataKind::Uint32 => 4,
            DataKind::Int64 => 8,
        }
    }

    /// Whether this is the 8-bit quantized kind.
    pub fn is_quantized(&self) -> bool {
        matches!(self, DataKind::Int8)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Float32 => write!(f, "float32"),
            DataKind::Float16 => write!(f, "float16"),
            DataKind::Bfloat16 => write!(f, "bfloat16"),
            DataKind::Int8 => write!(f, "int8"),
            DataKind::Int32 => write!(f, "int32"),
            DataKind::Uint32 => write!(f, "uint32"),
            DataKind::Int64 => write!(f, "int64"),
        }
    }
}
