//! Network-level configuration.

use serde::{Deserialize, Serialize};

use brisk_core::DeviceKind;
use brisk_kernels::DEFAULT_PAR_MIN_GROUPS;

/// Settings that apply to every node of an [`Instance`](crate::runtime::Instance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Device every node is dispatched to.
    pub device: DeviceKind,
    /// Channel-group planes needed before a kernel runs on the rayon pool.
    pub parallel_min_groups: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            device: DeviceKind::VectorCpu,
            parallel_min_groups: DEFAULT_PAR_MIN_GROUPS,
        }
    }
}

impl NetworkConfig {
    pub fn with_device(mut self, device: DeviceKind) -> Self {
        self.device = device;
        self
    }
}
