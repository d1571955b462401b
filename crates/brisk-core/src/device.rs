use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution backend an accelerator is specialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Generic scalar code over planar buffers. Also where host arrays live.
    Naive,
    /// CPU with 4-wide vector lanes (NEON, SSE, WASM SIMD128 or the portable lane)
    #[default]
    VectorCpu,
    /// Desktop GPU compute (CUDA)
    Cuda,
    /// Mobile GPU (OpenCL / Metal class)
    MobileGpu,
    /// Vendor neural accelerator
    Npu,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 5] = [
        DeviceKind::Naive,
        DeviceKind::VectorCpu,
        DeviceKind::Cuda,
        DeviceKind::MobileGpu,
        DeviceKind::Npu,
    ];

    /// Parse the snake_case name used in descriptors and on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "naive" => Some(DeviceKind::Naive),
            "vector_cpu" | "cpu" | "arm" => Some(DeviceKind::VectorCpu),
            "cuda" => Some(DeviceKind::Cuda),
            "mobile_gpu" | "opencl" | "metal" => Some(DeviceKind::MobileGpu),
            "npu" => Some(DeviceKind::Npu),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Naive => write!(f, "naive"),
            DeviceKind::VectorCpu => write!(f, "vector_cpu"),
            DeviceKind::Cuda => write!(f, "cuda"),
            DeviceKind::MobileGpu => write!(f, "mobile_gpu"),
            DeviceKind::Npu => write!(f, "npu"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_roundtrips_display() {
        for device in DeviceKind::ALL {
            assert_eq!(DeviceKind::from_name(&device.to_string()), Some(device));
        }
        assert_eq!(DeviceKind::from_name("arm"), Some(DeviceKind::VectorCpu));
        assert_eq!(DeviceKind::from_name("tpu"), None);
    }

    #[test]
    fn test_default() {
        assert_eq!(DeviceKind::default(), DeviceKind::VectorCpu);
    }
}
