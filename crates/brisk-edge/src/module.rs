//! Host binding: load a model descriptor and run it on row-major host arrays.
//!
//! ```no_run
//! use brisk_edge::{load, HostArray};
//!
//! let mut module = load("pad.json")?;
//! let x = HostArray::new(&[1, 3, 4, 4], vec![0.0; 48])?;
//! let y = module.forward(&x)?;
//! println!("{:?}", y.shape());
//! # Ok::<(), brisk_core::BriskError>(())
//! ```

use std::path::Path;

use brisk_core::{BriskError, DataKind, Result, Shape, TensorBuffer, TensorDims};

use crate::config::NetworkConfig;
use crate::graph::GraphDesc;
use crate::registry::global_registry;
use crate::runtime::Instance;

/// Row-major float32 array crossing the host boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct HostArray {
    shape: Shape,
    data: Vec<f32>,
}

impl HostArray {
    pub fn new(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        let shape = Shape::new(shape);
        if shape.numel() != data.len() {
            return Err(BriskError::Parameter(format!(
                "host array of shape {shape} needs {} elements, got {}",
                shape.numel(),
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        self.shape.dims()
    }

    /// Row-major strides in elements.
    pub fn strides(&self) -> Vec<usize> {
        self.shape.contiguous_strides().to_vec()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

/// A loaded model bound to one device.
pub struct Module {
    instance: Instance,
}

/// Load a model descriptor with the device and settings its `config` block
/// names, or the defaults.
pub fn load(path: impl AsRef<Path>) -> Result<Module> {
    let graph = GraphDesc::load(path)?;
    let config = graph.config.clone().unwrap_or_default();
    Module::from_graph(graph, config)
}

/// Load a model descriptor, overriding its configuration.
pub fn load_with_config(path: impl AsRef<Path>, config: NetworkConfig) -> Result<Module> {
    Module::from_graph(GraphDesc::load(path)?, config)
}

impl Module {
    pub fn from_graph(graph: GraphDesc, config: NetworkConfig) -> Result<Self> {
        for input in &graph.inputs {
            if input.data_kind != DataKind::Float32 {
                return Err(BriskError::UnsupportedConfiguration(format!(
                    "host input '{}' is {}; only float32 arrays cross the host boundary",
                    input.name, input.data_kind
                )));
            }
        }
        let instance = Instance::new(graph, config, global_registry())?;
        Ok(Self { instance })
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut Instance {
        &mut self.instance
    }

    /// Run the first graph input through the graph and return the first output.
    ///
    /// The array's shape, left-padded with 1s to rank 4, must equal the
    /// input's declared dims.
    pub fn forward(&mut self, input: &HostArray) -> Result<HostArray> {
        let name = self
            .instance
            .input_names()
            .first()
            .map(|s| s.to_string())
            .ok_or_else(|| BriskError::Model("graph declares no inputs".into()))?;
        let mut outputs = self.forward_named(&[(name.as_str(), input)])?;
        if outputs.is_empty() {
            return Err(BriskError::Model("graph declares no outputs".into()));
        }
        Ok(outputs.swap_remove(0).1)
    }

    /// Bind each `(name, array)` pair, run, and return every graph output.
    pub fn forward_named(&mut self, inputs: &[(&str, &HostArray)]) -> Result<Vec<(String, HostArray)>> {
        for (name, array) in inputs {
            let expected = self.instance.input_dims(name)?;
            let got = TensorDims::from_shape(array.shape())?;
            if got != expected {
                return Err(BriskError::ShapeMismatch { expected, got });
            }
            let buffer = TensorBuffer::from_f32_nchw(got, array.data.clone())?;
            self.instance.set_input(name, &buffer)?;
        }
        self.instance.forward()?;

        let names: Vec<String> = self.instance.output_names().iter().map(|s| s.to_string()).collect();
        let mut outputs = Vec::with_capacity(names.len());
        for name in names {
            let buffer = self.instance.output(&name)?;
            let data = buffer
                .as_f32_slice()
                .ok_or_else(|| BriskError::Model(format!("output '{name}' is not float32")))?
                .to_vec();
            let array = HostArray::new(&buffer.dims().as_array(), data)?;
            outputs.push((name, array));
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{InputDesc, NodeDesc};
    use crate::params::{LayerParams, PadParams};

    fn pad_module(pads: Vec<i32>) -> Module {
        let graph = GraphDesc {
            name: "pad".into(),
            inputs: vec![InputDesc {
                name: "x".into(),
                dims: TensorDims::new(1, 4, 1, 5),
                data_kind: DataKind::Float32,
            }],
            nodes: vec![NodeDesc {
                name: "pad".into(),
                inputs: vec!["x".into()],
                outputs: vec!["y".into()],
                params: LayerParams::Pad(PadParams::reflect(pads)),
            }],
            outputs: vec!["y".into()],
            config: None,
        };
        Module::from_graph(graph, NetworkConfig::default()).unwrap()
    }

    #[test]
    fn test_host_array() {
        let a = HostArray::new(&[2, 3], vec![0.0; 6]).unwrap();
        assert_eq!(a.strides(), vec![3, 1]);
        assert!(HostArray::new(&[2, 3], vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_forward_reflect() {
        let mut m = pad_module(vec![0, 0, 0, 2, 0, 0, 0, 2]);
        let row = [1.0, 2.0, 3.0, 4.0, 5.0];
        let x = HostArray::new(&[4, 1, 5], row.repeat(4)).unwrap();
        let y = m.forward(&x).unwrap();
        assert_eq!(y.shape(), &[1, 4, 1, 9]);
        assert_eq!(y.strides(), vec![36, 9, 9, 1]);
        for out_row in y.data().chunks(9) {
            assert_eq!(out_row, &[3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0]);
        }
    }

    #[test]
    fn test_forward_shape_mismatch() {
        let mut m = pad_module(vec![0; 8]);
        let x = HostArray::new(&[1, 4, 1, 4], vec![0.0; 16]).unwrap();
        let err = m.forward(&x).unwrap_err();
        assert!(matches!(err, BriskError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_non_float_input_rejected() {
        let graph = GraphDesc {
            name: "ints".into(),
            inputs: vec![InputDesc {
                name: "x".into(),
                dims: TensorDims::new(1, 1, 1, 1),
                data_kind: DataKind::Int32,
            }],
            nodes: vec![],
            outputs: vec!["x".into()],
            config: None,
        };
        let err = Module::from_graph(graph, NetworkConfig::default()).err().unwrap();
        assert!(matches!(err, BriskError::UnsupportedConfiguration(_)));
    }
}
