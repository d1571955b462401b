//! Execution instance: a graph bound to accelerators and buffers.
//!
//! Building an instance creates one accelerator per node from the registry,
//! then plans buffers. Planning walks the nodes in dependency order and
//! inserts a reformat step wherever a tensor is needed in a layout other than
//! the one it was produced in. Graph inputs are planar host buffers and every
//! graph output gets a planar copy at the end, so the host side never sees a
//! packed layout.

use std::collections::HashMap;

use brisk_core::{BriskError, DataKind, DeviceKind, LayoutKind, Result, TensorBuffer, TensorDims};
use brisk_kernels::reformat;

use crate::accelerator::LayerAcc;
use crate::config::NetworkConfig;
use crate::graph::GraphDesc;
use crate::registry::AcceleratorRegistry;

struct BoundNode {
    acc: Box<dyn LayerAcc>,
    layout: LayoutKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Reformat { src: usize, dst: usize },
    Node { node: usize, inputs: Vec<usize>, outputs: Vec<usize> },
}

/// Buffers and the ordered steps that fill them, for one set of input dims.
struct Plan {
    slots: Vec<TensorBuffer>,
    steps: Vec<Step>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
}

/// Where a named tensor lives, per layout.
struct TensorInfo {
    dims: TensorDims,
    kind: DataKind,
    slots: HashMap<LayoutKind, usize>,
    home: usize,
}

struct Planner<'a> {
    device: DeviceKind,
    slots: Vec<TensorBuffer>,
    steps: Vec<Step>,
    tensors: HashMap<&'a str, TensorInfo>,
}

impl<'a> Planner<'a> {
    fn alloc(&mut self, dims: TensorDims, kind: DataKind, layout: LayoutKind, device: DeviceKind) -> usize {
        self.slots.push(TensorBuffer::zeros(dims, kind, layout, device));
        self.slots.len() - 1
    }

    fn define(&mut self, name: &'a str, dims: TensorDims, kind: DataKind, layout: LayoutKind, device: DeviceKind) -> usize {
        let slot = self.alloc(dims, kind, layout, device);
        self.tensors.insert(
            name,
            TensorInfo {
                dims,
                kind,
                slots: HashMap::from([(layout, slot)]),
                home: slot,
            },
        );
        slot
    }

    /// Slot holding `name` in `layout`, adding a reformat step if needed.
    fn slot_in(&mut self, name: &str, layout: LayoutKind, device: DeviceKind) -> Result<usize> {
        let info = self
            .tensors
            .get(name)
            .ok_or_else(|| BriskError::Model(format!("tensor '{name}' used before it is produced")))?;
        if let Some(&slot) = info.slots.get(&layout) {
            return Ok(slot);
        }
        let (dims, kind, src) = (info.dims, info.kind, info.home);
        let dst = self.alloc(dims, kind, layout, device);
        self.steps.push(Step::Reformat { src, dst });
        tracing::debug!(tensor = name, from = %self.slots[src].layout(), to = %layout, "inserted reformat");
        if let Some(info) = self.tensors.get_mut(name) {
            info.slots.insert(layout, dst);
        }
        Ok(dst)
    }

    fn dims_of(&self, name: &str) -> Result<(TensorDims, DataKind)> {
        self.tensors
            .get(name)
            .map(|info| (info.dims, info.kind))
            .ok_or_else(|| BriskError::Model(format!("tensor '{name}' used before it is produced")))
    }
}

fn plan(
    graph: &GraphDesc,
    order: &[usize],
    nodes: &[BoundNode],
    input_dims: &[TensorDims],
    device: DeviceKind,
) -> Result<Plan> {
    let mut planner = Planner {
        device,
        slots: Vec::new(),
        steps: Vec::new(),
        tensors: HashMap::new(),
    };
    let mut inputs = Vec::with_capacity(graph.inputs.len());
    for (desc, dims) in graph.inputs.iter().zip(input_dims) {
        inputs.push(planner.define(&desc.name, *dims, desc.data_kind, LayoutKind::Nchw, DeviceKind::Naive));
    }

    for &n in order {
        let desc = &graph.nodes[n];
        let layout = nodes[n].layout;
        let device = planner.device;
        let mut in_slots = Vec::with_capacity(desc.inputs.len());
        for name in &desc.inputs {
            in_slots.push(planner.slot_in(name, layout, device)?);
        }
        let (first_dims, kind) = planner.dims_of(&desc.inputs[0])?;
        let out_dims = desc.params.infer_output(&first_dims)?;
        let out_slots = desc
            .outputs
            .iter()
            .map(|name| planner.define(name, out_dims, kind, layout, device))
            .collect();
        planner.steps.push(Step::Node {
            node: n,
            inputs: in_slots,
            outputs: out_slots,
        });
    }

    let mut outputs = Vec::with_capacity(graph.outputs.len());
    for name in &graph.outputs {
        outputs.push(planner.slot_in(name, LayoutKind::Nchw, DeviceKind::Naive)?);
    }

    Ok(Plan {
        slots: planner.slots,
        steps: planner.steps,
        inputs,
        outputs,
    })
}

/// A graph ready to run on one device.
///
/// Instances own all of their buffers; several instances can run on separate
/// threads at once.
pub struct Instance {
    graph: GraphDesc,
    config: NetworkConfig,
    order: Vec<usize>,
    nodes: Vec<BoundNode>,
    input_dims: Vec<TensorDims>,
    plan: Plan,
}

impl Instance {
    /// Bind `graph` to accelerators for `config.device` and plan buffers for
    /// its declared input dims.
    pub fn new(graph: GraphDesc, config: NetworkConfig, registry: &AcceleratorRegistry) -> Result<Self> {
        if graph.inputs.is_empty() {
            return Err(BriskError::Model(format!("graph '{}' declares no inputs", graph.name)));
        }
        let order = graph.topo_order()?;
        let mut nodes = Vec::with_capacity(graph.nodes.len());
        for desc in &graph.nodes {
            let op = desc.params.kind();
            let layout = registry.required_layout(op, config.device)?;
            let acc = registry.create_accelerator(op, config.device, &desc.params, &config)?;
            nodes.push(BoundNode { acc, layout });
        }
        let input_dims: Vec<TensorDims> = graph.inputs.iter().map(|i| i.dims).collect();
        let plan = plan(&graph, &order, &nodes, &input_dims, config.device)?;
        tracing::debug!(
            graph = %graph.name,
            device = %config.device,
            nodes = nodes.len(),
            steps = plan.steps.len(),
            "instance ready"
        );
        Ok(Self {
            graph,
            config,
            order,
            nodes,
            input_dims,
            plan,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn graph(&self) -> &GraphDesc {
        &self.graph
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.graph.inputs.iter().map(|i| i.name.as_str()).collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.graph.outputs.iter().map(|s| s.as_str()).collect()
    }

    /// Current dims of graph input `name`.
    pub fn input_dims(&self, name: &str) -> Result<TensorDims> {
        Ok(self.input_dims[self.input_index(name)?])
    }

    /// Current dims of graph output `name`.
    pub fn output_dims(&self, name: &str) -> Result<TensorDims> {
        Ok(self.plan.slots[self.output_slot(name)?].dims())
    }

    /// Number of layout conversions the plan performs per forward.
    pub fn reformat_count(&self) -> usize {
        self.plan
            .steps
            .iter()
            .filter(|s| matches!(s, Step::Reformat { .. }))
            .count()
    }

    /// Copy `buffer` into graph input `name`. Dims and data kind must match
    /// the input as currently planned; the layout may be either.
    pub fn set_input(&mut self, name: &str, buffer: &TensorBuffer) -> Result<()> {
        let idx = self.input_index(name)?;
        let expected = self.input_dims[idx];
        if buffer.dims() != expected {
            return Err(BriskError::ShapeMismatch {
                expected,
                got: buffer.dims(),
            });
        }
        let slot = &mut self.plan.slots[self.plan.inputs[idx]];
        if buffer.data_kind() != slot.data_kind() {
            return Err(BriskError::Parameter(format!(
                "input '{name}' expects {} data, got {}",
                slot.data_kind(),
                buffer.data_kind()
            )));
        }
        reformat(buffer, slot)
    }

    /// Run every step in order. The first failing step aborts the pass and its
    /// error is returned unchanged.
    pub fn forward(&mut self) -> Result<()> {
        let Plan { slots, steps, .. } = &mut self.plan;
        for step in steps.iter() {
            match step {
                Step::Reformat { src, dst } => {
                    let mut out = std::mem::take(&mut slots[*dst]);
                    let result = reformat(&slots[*src], &mut out);
                    slots[*dst] = out;
                    result?;
                }
                Step::Node { node, inputs, outputs } => {
                    let name = &self.graph.nodes[*node].name;
                    tracing::trace!(node = %name, "forward");
                    let mut outs: Vec<TensorBuffer> =
                        outputs.iter().map(|&o| std::mem::take(&mut slots[o])).collect();
                    let ins: Vec<&TensorBuffer> = inputs.iter().map(|&i| &slots[i]).collect();
                    let result = self.nodes[*node].acc.do_forward(&ins, &mut outs);
                    for (&o, buf) in outputs.iter().zip(outs) {
                        slots[o] = buf;
                    }
                    result?;
                }
            }
        }
        Ok(())
    }

    /// Planar copy of graph output `name` from the last forward.
    pub fn output(&self, name: &str) -> Result<TensorBuffer> {
        Ok(self.plan.slots[self.output_slot(name)?].clone())
    }

    /// Re-plan buffers for new input dims, keeping the accelerators. On error
    /// the instance keeps its previous plan.
    pub fn reshape(&mut self, dims: &[(&str, TensorDims)]) -> Result<()> {
        let mut input_dims = self.input_dims.clone();
        for (name, d) in dims {
            input_dims[self.input_index(name)?] = *d;
        }
        let plan = plan(&self.graph, &self.order, &self.nodes, &input_dims, self.config.device)?;
        self.input_dims = input_dims;
        self.plan = plan;
        Ok(())
    }

    fn input_index(&self, name: &str) -> Result<usize> {
        self.graph
            .inputs
            .iter()
            .position(|i| i.name == name)
            .ok_or_else(|| BriskError::Parameter(format!("no graph input named '{name}'")))
    }

    fn output_slot(&self, name: &str) -> Result<usize> {
        self.graph
            .outputs
            .iter()
            .position(|o| o == name)
            .map(|i| self.plan.outputs[i])
            .ok_or_else(|| BriskError::Parameter(format!("no graph output named '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{InputDesc, NodeDesc};
    use crate::params::{LayerParams, PadParams, ReluParams};
    use crate::registry::global_registry;
    use brisk_core::ErrorKind;

    fn pad_relu_graph(pads: Vec<i32>) -> GraphDesc {
        GraphDesc {
            name: "pad_relu".into(),
            inputs: vec![InputDesc {
                name: "x".into(),
                dims: TensorDims::new(1, 3, 2, 2),
                data_kind: DataKind::Float32,
            }],
            nodes: vec![
                NodeDesc {
                    name: "pad".into(),
                    inputs: vec!["x".into()],
                    outputs: vec!["p".into()],
                    params: LayerParams::Pad(PadParams::constant(pads, -1.0)),
                },
                NodeDesc {
                    name: "relu".into(),
                    inputs: vec!["p".into()],
                    outputs: vec!["y".into()],
                    params: LayerParams::Relu(ReluParams {}),
                },
            ],
            outputs: vec!["y".into()],
            config: None,
        }
    }

    fn input(dims: TensorDims) -> TensorBuffer {
        let data = (0..dims.numel()).map(|i| i as f32 - 3.0).collect();
        TensorBuffer::from_f32_nchw(dims, data).unwrap()
    }

    fn run(device: DeviceKind, pads: Vec<i32>) -> TensorBuffer {
        let config = NetworkConfig::default().with_device(device);
        let mut inst = Instance::new(pad_relu_graph(pads), config, global_registry()).unwrap();
        inst.set_input("x", &input(TensorDims::new(1, 3, 2, 2))).unwrap();
        inst.forward().unwrap();
        inst.output("y").unwrap()
    }

    #[test]
    fn test_vector_plan_inserts_reformats() {
        let config = NetworkConfig::default();
        let inst = Instance::new(pad_relu_graph(vec![0; 8]), config, global_registry()).unwrap();
        // pack the input once, unpack the output once
        assert_eq!(inst.reformat_count(), 2);

        let config = NetworkConfig::default().with_device(DeviceKind::Naive);
        let inst = Instance::new(pad_relu_graph(vec![0; 8]), config, global_registry()).unwrap();
        assert_eq!(inst.reformat_count(), 0);
    }

    #[test]
    fn test_devices_agree() {
        let pads = vec![0, 2, 1, 0, 0, 1, 0, 1];
        let vector = run(DeviceKind::VectorCpu, pads.clone());
        let naive = run(DeviceKind::Naive, pads);
        assert_eq!(vector.dims(), TensorDims::new(1, 6, 3, 3));
        assert_eq!(vector.layout(), LayoutKind::Nchw);
        assert_eq!(vector.as_f32_slice(), naive.as_f32_slice());
    }

    #[test]
    fn test_set_input_shape_mismatch() {
        let mut inst =
            Instance::new(pad_relu_graph(vec![0; 8]), NetworkConfig::default(), global_registry()).unwrap();
        let err = inst.set_input("x", &input(TensorDims::new(1, 3, 2, 3))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parameter);
        assert!(matches!(err, BriskError::ShapeMismatch { .. }));
        assert!(inst.set_input("nope", &input(TensorDims::new(1, 3, 2, 2))).is_err());
    }

    #[test]
    fn test_unsupported_device() {
        let config = NetworkConfig::default().with_device(DeviceKind::Cuda);
        let err = Instance::new(pad_relu_graph(vec![0; 8]), config, global_registry())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConfiguration);
    }

    #[test]
    fn test_bad_pads_fail_at_build() {
        let err = Instance::new(pad_relu_graph(vec![0, 0, 1]), NetworkConfig::default(), global_registry())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Parameter);
    }

    #[test]
    fn test_reshape() {
        let mut inst =
            Instance::new(pad_relu_graph(vec![0, 0, 1, 1, 0, 0, 1, 1]), NetworkConfig::default(), global_registry())
                .unwrap();
        let dims = TensorDims::new(2, 5, 3, 3);
        inst.reshape(&[("x", dims)]).unwrap();
        assert_eq!(inst.input_dims("x").unwrap(), dims);
        assert_eq!(inst.output_dims("y").unwrap(), TensorDims::new(2, 5, 5, 5));
        inst.set_input("x", &input(dims)).unwrap();
        inst.forward().unwrap();
        let out = inst.output("y").unwrap();
        // border is relu(-1) = 0, interior is relu(x)
        let data = out.as_f32_slice().unwrap();
        assert_eq!(data[0], 0.0);
        assert_eq!(data[6], 0.0);
        assert_eq!(data[12], relu(input(dims).as_f32_slice().unwrap()[4]));

        assert!(inst.reshape(&[("missing", dims)]).is_err());
        assert_eq!(inst.input_dims("x").unwrap(), dims);
    }

    fn relu(x: f32) -> f32 {
        x.max(0.0)
    }
}
