//! JSON model descriptor.
//!
//! A descriptor names the graph inputs with their dims and data kind, lists
//! nodes with their layer parameters, and names the graph outputs:
//!
//! ```json
//! {
//!   "name": "pad_relu",
//!   "inputs": [{ "name": "x", "dims": [1, 3, 4, 4] }],
//!   "nodes": [
//!     { "name": "pad0", "inputs": ["x"], "outputs": ["p"],
//!       "params": { "op": "pad", "pads": [0, 2, 1, 1, 0, 0, 1, 1], "value": 0.5 } },
//!     { "name": "act", "inputs": ["p"], "outputs": ["y"], "params": { "op": "relu" } }
//!   ],
//!   "outputs": ["y"],
//!   "config": { "device": "vector_cpu" }
//! }
//! ```

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};

use brisk_core::{BriskError, DataKind, Result, TensorDims};

use crate::config::NetworkConfig;
use crate::params::LayerParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDesc {
    pub name: String,
    pub dims: TensorDims,
    #[serde(default)]
    pub data_kind: DataKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDesc {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub params: LayerParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDesc {
    #[serde(default)]
    pub name: String,
    pub inputs: Vec<InputDesc>,
    pub nodes: Vec<NodeDesc>,
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<NetworkConfig>,
}

impl GraphDesc {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| BriskError::Model(format!("invalid model descriptor: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| BriskError::Model(e.to_string()))
    }

    /// Read and parse a descriptor file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BriskError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn input(&self, name: &str) -> Option<&InputDesc> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Node indices in dependency order.
    ///
    /// Fails when a tensor is produced twice, a node reads a tensor nothing
    /// produces, a graph output is never produced, or the nodes form a cycle.
    pub fn topo_order(&self) -> Result<Vec<usize>> {
        let mut producer: HashMap<&str, Option<usize>> = HashMap::new();
        for input in &self.inputs {
            if producer.insert(input.name.as_str(), None).is_some() {
                return Err(BriskError::Model(format!("duplicate graph input '{}'", input.name)));
            }
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if node.inputs.is_empty() || node.outputs.is_empty() {
                return Err(BriskError::Model(format!(
                    "node '{}' needs at least one input and one output",
                    node.name
                )));
            }
            for out in &node.outputs {
                if producer.insert(out.as_str(), Some(i)).is_some() {
                    return Err(BriskError::Model(format!(
                        "tensor '{out}' is produced more than once (node '{}')",
                        node.name
                    )));
                }
            }
        }

        let mut indegree = vec![0usize; self.nodes.len()];
        let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            for input in &node.inputs {
                match producer.get(input.as_str()) {
                    None => {
                        return Err(BriskError::Model(format!(
                            "node '{}' reads unknown tensor '{input}'",
                            node.name
                        )))
                    }
                    Some(None) => {}
                    Some(Some(p)) => {
                        indegree[i] += 1;
                        consumers[*p].push(i);
                    }
                }
            }
        }
        for out in &self.outputs {
            if !producer.contains_key(out.as_str()) {
                return Err(BriskError::Model(format!("graph output '{out}' is never produced")));
            }
        }

        let mut ready: VecDeque<usize> = (0..self.nodes.len()).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(i) = ready.pop_front() {
            order.push(i);
            for &c in &consumers[i] {
                indegree[c] -= 1;
                if indegree[c] == 0 {
                    ready.push_back(c);
                }
            }
        }
        if order.len() != self.nodes.len() {
            return Err(BriskError::Model(format!(
                "graph '{}' contains a cycle",
                self.name
            )));
        }
        Ok(order)
    }
}
