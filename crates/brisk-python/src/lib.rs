//! # brisk-python
//!
//! PyO3 bindings for brisk → `import brisk` in Python.
//!
//! Provides:
//! - `brisk.load(path, device=None)` — load a JSON model descriptor
//! - `brisk.Module` — `forward(numpy.ndarray) -> numpy.ndarray`
//! - `brisk.DeviceType` / `brisk.DataType` — enums mirroring the runtime's kinds
//! - `brisk.lane_backend()` — instruction set the vector lanes compile to

use numpy::{PyArray1, PyArrayDyn, PyArrayMethods, PyReadonlyArrayDyn, PyUntypedArrayMethods};
use pyo3::exceptions::{PyNotImplementedError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use brisk_core::{BriskError, DataKind, DeviceKind, ErrorKind};
use brisk_edge::{HostArray, NetworkConfig};

fn to_py_err(err: BriskError) -> PyErr {
    match err.kind() {
        ErrorKind::Parameter => PyValueError::new_err(err.to_string()),
        ErrorKind::UnsupportedConfiguration => PyNotImplementedError::new_err(err.to_string()),
        ErrorKind::Model | ErrorKind::Registration | ErrorKind::Io => PyRuntimeError::new_err(err.to_string()),
    }
}

// ============================================================================
// Enums
// ============================================================================

#[pyclass(name = "DeviceType", eq, eq_int)]
#[derive(Clone, Copy, PartialEq, Eq)]
enum PyDeviceType {
    Naive,
    VectorCpu,
    Cuda,
    MobileGpu,
    Npu,
}

impl From<PyDeviceType> for DeviceKind {
    fn from(d: PyDeviceType) -> Self {
        match d {
            PyDeviceType::Naive => DeviceKind::Naive,
            PyDeviceType::VectorCpu => DeviceKind::VectorCpu,
            PyDeviceType::Cuda => DeviceKind::Cuda,
            PyDeviceType::MobileGpu => DeviceKind::MobileGpu,
            PyDeviceType::Npu => DeviceKind::Npu,
        }
    }
}

impl From<DeviceKind> for PyDeviceType {
    fn from(d: DeviceKind) -> Self {
        match d {
            DeviceKind::Naive => PyDeviceType::Naive,
            DeviceKind::VectorCpu => PyDeviceType::VectorCpu,
            DeviceKind::Cuda => PyDeviceType::Cuda,
            DeviceKind::MobileGpu => PyDeviceType::MobileGpu,
            DeviceKind::Npu => PyDeviceType::Npu,
        }
    }
}

#[pymethods]
impl PyDeviceType {
    fn __str__(&self) -> String {
        DeviceKind::from(*self).to_string()
    }
}

#[pyclass(name = "DataType", eq, eq_int)]
#[derive(Clone, Copy, PartialEq, Eq)]
enum PyDataType {
    Float32,
    Float16,
    Bfloat16,
    Int8,
    Int32,
    Uint32,
    Int64,
}

impl From<DataKind> for PyDataType {
    fn from(d: DataKind) -> Self {
        match d {
            DataKind::Float32 => PyDataType::Float32,
            DataKind::Float16 => PyDataType::Float16,
            DataKind::Bfloat16 => PyDataType::Bfloat16,
            DataKind::Int8 => PyDataType::Int8,
            DataKind::Int32 => PyDataType::Int32,
            DataKind::Uint32 => PyDataType::Uint32,
            DataKind::Int64 => PyDataType::Int64,
        }
    }
}

#[pymethods]
impl PyDataType {
    /// Size in bytes of one element.
    #[getter]
    fn itemsize(&self) -> usize {
        DataKind::from(*self).element_size()
    }

    fn __str__(&self) -> String {
        DataKind::from(*self).to_string()
    }
}

impl From<PyDataType> for DataKind {
    fn from(d: PyDataType) -> Self {
        match d {
            PyDataType::Float32 => DataKind::Float32,
            PyDataType::Float16 => DataKind::Float16,
            PyDataType::Bfloat16 => DataKind::Bfloat16,
            PyDataType::Int8 => DataKind::Int8,
            PyDataType::Int32 => DataKind::Int32,
            PyDataType::Uint32 => DataKind::Uint32,
            PyDataType::Int64 => DataKind::Int64,
        }
    }
}

// ============================================================================
// Module wrapper
// ============================================================================

#[pyclass(name = "Module")]
struct PyModuleHandle {
    inner: brisk_edge::Module,
}

#[pymethods]
impl PyModuleHandle {
    /// Run the first graph input and return the first graph output.
    ///
    /// Any strides are accepted; the array is read in logical row-major order.
    fn forward<'py>(
        &mut self,
        py: Python<'py>,
        input: PyReadonlyArrayDyn<'py, f32>,
    ) -> PyResult<Bound<'py, PyArrayDyn<f32>>> {
        let shape = input.shape().to_vec();
        let data: Vec<f32> = input.as_array().iter().copied().collect();
        let x = HostArray::new(&shape, data).map_err(to_py_err)?;

        let inner = &mut self.inner;
        let y = py.allow_threads(|| inner.forward(&x)).map_err(to_py_err)?;

        let shape = y.shape().to_vec();
        PyArray1::from_vec_bound(py, y.into_data()).reshape(shape)
    }

    #[getter]
    fn device(&self) -> PyDeviceType {
        self.inner.instance().config().device.into()
    }

    #[getter]
    fn input_names(&self) -> Vec<String> {
        self.inner.instance().input_names().into_iter().map(String::from).collect()
    }

    #[getter]
    fn output_names(&self) -> Vec<String> {
        self.inner.instance().output_names().into_iter().map(String::from).collect()
    }

    /// Declared `[n, c, h, w]` of input `name`.
    fn input_shape(&self, name: &str) -> PyResult<Vec<usize>> {
        let dims = self.inner.instance().input_dims(name).map_err(to_py_err)?;
        Ok(dims.as_array().to_vec())
    }

    /// Re-plan for a new shape of input `name`.
    fn reshape(&mut self, name: &str, shape: Vec<usize>) -> PyResult<()> {
        let dims = brisk_core::TensorDims::from_shape(&shape).map_err(to_py_err)?;
        self.inner.instance_mut().reshape(&[(name, dims)]).map_err(to_py_err)
    }

    /// Number of layout conversions run per forward.
    #[getter]
    fn reformat_count(&self) -> usize {
        self.inner.instance().reformat_count()
    }

    fn __repr__(&self) -> String {
        let inst = self.inner.instance();
        format!(
            "Module(name={:?}, device={}, inputs={:?}, outputs={:?})",
            inst.graph().name,
            inst.config().device,
            inst.input_names(),
            inst.output_names()
        )
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Load a model descriptor. `device` overrides the descriptor's own config.
#[pyfunction]
#[pyo3(signature = (path, device=None))]
fn load(path: &str, device: Option<PyDeviceType>) -> PyResult<PyModuleHandle> {
    let inner = match device {
        Some(d) => brisk_edge::load_with_config(path, NetworkConfig::default().with_device(d.into())),
        None => brisk_edge::load(path),
    }
    .map_err(to_py_err)?;
    Ok(PyModuleHandle { inner })
}

/// Instruction set the vector-CPU lanes compile to: sse2, neon, simd128 or scalar.
#[pyfunction]
fn lane_backend() -> &'static str {
    brisk_kernels::lane_backend()
}

// ============================================================================
// Module entry point
// ============================================================================

#[pymodule]
fn brisk(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyModuleHandle>()?;
    m.add_class::<PyDeviceType>()?;
    m.add_class::<PyDataType>()?;
    m.add_function(wrap_pyfunction!(load, m)?)?;
    m.add_function(wrap_pyfunction!(lane_backend, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
