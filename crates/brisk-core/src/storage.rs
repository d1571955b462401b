use std::fmt;

use half::{bf16, f16};

use crate::{BriskError, DataKind, DeviceKind, LayoutKind, Result, TensorDims};

/// Typed backing memory of a [`TensorBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum BufferData {
    F32(Vec<f32>),
    F16(Vec<f16>),
    Bf16(Vec<bf16>),
    I8(Vec<i8>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
}

impl BufferData {
    /// Zero-filled storage for `len` elements of `kind`.
    pub fn zeros(kind: DataKind, len: usize) -> Self {
        match kind {
            DataKind::Float32 => BufferData::F32(vec![0.0; len]),
            DataKind::Float16 => BufferData::F16(vec![f16::ZERO; len]),
            DataKind::Bfloat16 => BufferData::Bf16(vec![bf16::ZERO; len]),
            DataKind::Int8 => BufferData::I8(vec![0; len]),
            DataKind::Int32 => BufferData::I32(vec![0; len]),
            DataKind::Uint32 => BufferData::U32(vec![0; len]),
            DataKind::Int64 => BufferData::I64(vec![0; len]),
        }
    }

    pub fn kind(&self) -> DataKind {
        match self {
            BufferData::F32(_) => DataKind::Float32,
            BufferData::F16(_) => DataKind::Float16,
            BufferData::Bf16(_) => DataKind::Bfloat16,
            BufferData::I8(_) => DataKind::Int8,
            BufferData::I32(_) => DataKind::Int32,
            BufferData::U32(_) => DataKind::Uint32,
            BufferData::I64(_) => DataKind::Int64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BufferData::F32(v) => v.len(),
            BufferData::F16(v) => v.len(),
            BufferData::Bf16(v) => v.len(),
            BufferData::I8(v) => v.len(),
            BufferData::I32(v) => v.len(),
            BufferData::U32(v) => v.len(),
            BufferData::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes in native endianness.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            BufferData::F32(v) => bytemuck::cast_slice(v),
            BufferData::F16(v) => bytemuck::cast_slice(v),
            BufferData::Bf16(v) => bytemuck::cast_slice(v),
            BufferData::I8(v) => bytemuck::cast_slice(v),
            BufferData::I32(v) => bytemuck::cast_slice(v),
            BufferData::U32(v) => bytemuck::cast_slice(v),
            BufferData::I64(v) => bytemuck::cast_slice(v),
        }
    }
}

/// Rust element types that can back a tensor buffer.
pub trait Element:
    bytemuck::Pod + Default + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static
{
    const KIND: DataKind;

    /// Convert a scalar parameter (e.g. a pad fill value) to this element type.
    fn from_f32(v: f32) -> Self;

    fn slice(data: &BufferData) -> Option<&[Self]>;

    fn slice_mut(data: &mut BufferData) -> Option<&mut [Self]>;

    fn wrap(v: Vec<Self>) -> BufferData;
}

macro_rules! impl_element {
    ($ty:ty, $kind:ident, $variant:ident, |$v:ident| $conv:expr) => {
        impl Element for $ty {
            const KIND: DataKind = DataKind::$kind;

            fn from_f32($v: f32) -> Self {
                $conv
            }

            fn slice(data: &BufferData) -> Option<&[Self]> {
                match data {
                    BufferData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut BufferData) -> Option<&mut [Self]> {
                match data {
                    BufferData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn wrap(v: Vec<Self>) -> BufferData {
                BufferData::$variant(v)
            }
        }
    };
}

impl_element!(f32, Float32, F32, |v| v);
impl_element!(f16, Float16, F16, |v| f16::from_f32(v));
impl_element!(bf16, Bfloat16, Bf16, |v| bf16::from_f32(v));
impl_element!(i8, Int8, I8, |v| v as i8);
impl_element!(i32, Int32, I32, |v| v as i32);
impl_element!(u32, Uint32, U32, |v| v as u32);
impl_element!(i64, Int64, I64, |v| v as i64);

/// An owned, contiguous tensor buffer tagged with dims, data kind, layout and device.
///
/// The physical length depends on the layout: NC4HW4 buffers hold
/// `batch * round_up4(channels) * height * width` elements.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorBuffer {
    data: BufferData,
    dims: TensorDims,
    layout: LayoutKind,
    device: DeviceKind,
}

impl TensorBuffer {
    /// Allocate a zero-filled buffer.
    pub fn zeros(dims: TensorDims, kind: DataKind, layout: LayoutKind, device: DeviceKind) -> Self {
        Self {
            data: BufferData::zeros(kind, layout.physical_len(&dims)),
            dims,
            layout,
            device,
        }
    }

    /// Wrap existing typed data. The length must match the layout's physical length.
    pub fn from_vec<T: Element>(
        dims: TensorDims,
        layout: LayoutKind,
        device: DeviceKind,
        data: Vec<T>,
    ) -> Result<Self> {
        let expected = layout.physical_len(&dims);
        if data.len() != expected {
            return Err(BriskError::Storage(format!(
                "expected {} {} elements for {} {}, got {}",
                expected,
                T::KIND,
                layout,
                dims,
                data.len()
            )));
        }
        Ok(Self {
            data: T::wrap(data),
            dims,
            layout,
            device,
        })
    }

    /// Planar host-side f32 buffer, the form host bindings hand in.
    pub fn from_f32_nchw(dims: TensorDims, data: Vec<f32>) -> Result<Self> {
        Self::from_vec(dims, LayoutKind::Nchw, DeviceKind::Naive, data)
    }

    pub fn dims(&self) -> TensorDims {
        self.dims
    }

    pub fn data_kind(&self) -> DataKind {
        self.data.kind()
    }

    pub fn layout(&self) -> LayoutKind {
        self.layout
    }

    pub fn device(&self) -> DeviceKind {
        self.device
    }

    /// Physical element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &BufferData {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    /// Typed view, or `None` when `T` does not match the data kind.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(&self.data)
    }

    pub fn as_slice_mut<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(&mut self.data)
    }

    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        self.as_slice::<f32>()
    }
}

impl Default for TensorBuffer {
    fn default() -> Self {
        Self::zeros(
            TensorDims::default(),
            DataKind::Float32,
            LayoutKind::Nchw,
            DeviceKind::Naive,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_nc4hw4_is_padded() {
        let buf = TensorBuffer::zeros(
            TensorDims::new(1, 5, 2, 2),
            DataKind::Float32,
            LayoutKind::Nc4hw4,
            DeviceKind::VectorCpu,
        );
        assert_eq!(buf.len(), 8 * 4);
        assert_eq!(buf.as_bytes().len(), 8 * 4 * 4);
        assert_eq!(buf.data_kind(), DataKind::Float32);
    }

    #[test]
    fn test_from_vec_length_check() {
        let dims = TensorDims::new(1, 3, 1, 2);
        assert!(TensorBuffer::from_f32_nchw(dims, vec![0.0; 6]).is_ok());
        let err = TensorBuffer::from_f32_nchw(dims, vec![0.0; 5]).unwrap_err();
        assert!(matches!(err, BriskError::Storage(_)));
        let err = TensorBuffer::from_vec(dims, LayoutKind::Nc4hw4, DeviceKind::VectorCpu, vec![0i32; 6])
            .unwrap_err();
        assert!(matches!(err, BriskError::Storage(_)));
    }

    #[test]
    fn test_typed_views() {
        let dims = TensorDims::new(1, 1, 1, 3);
        let mut buf =
            TensorBuffer::from_vec(dims, LayoutKind::Nchw, DeviceKind::Naive, vec![1u32, 2, 3]).unwrap();
        assert!(buf.as_slice::<f32>().is_none());
        buf.as_slice_mut::<u32>().unwrap()[1] = 7;
        assert_eq!(buf.as_slice::<u32>().unwrap(), &[1, 7, 3]);
    }

    #[test]
    fn test_element_from_f32() {
        assert_eq!(<i32 as Element>::from_f32(-2.7), -2);
        assert_eq!(<u32 as Element>::from_f32(3.0), 3);
        assert_eq!(<f16 as Element>::from_f32(1.5).to_f32(), 1.5);
    }
}
