//! Layout conversion between planar (NCHW) and channel-vectorized (NC4HW4)
//! buffers. Packing zero-fills the padding lanes of the last channel group.

use brisk_core::{
    nchw_offset, BlockStrides, BriskError, DataKind, Element, LayoutKind, Result, TensorBuffer, TensorDims,
    LANE,
};
use half::{bf16, f16};

/// Pack planar `src` into `dst` (sized for NC4HW4 `dims`).
pub fn nchw_to_nc4hw4<T: Element>(src: &[T], dims: &TensorDims, dst: &mut [T]) {
    let s = BlockStrides::nc4hw4(dims);
    for n in 0..dims.batch {
        for c in 0..s.groups * LANE {
            for h in 0..dims.height {
                for w in 0..dims.width {
                    dst[s.offset(n, c, h, w)] = if c < dims.channels {
                        src[nchw_offset(dims, n, c, h, w)]
                    } else {
                        T::default()
                    };
                }
            }
        }
    }
}

/// Unpack NC4HW4 `src` into planar `dst`, dropping the padding lanes.
pub fn nc4hw4_to_nchw<T: Element>(src: &[T], dims: &TensorDims, dst: &mut [T]) {
    let s = BlockStrides::nc4hw4(dims);
    for n in 0..dims.batch {
        for c in 0..dims.channels {
            for h in 0..dims.height {
                for w in 0..dims.width {
                    dst[nchw_offset(dims, n, c, h, w)] = src[s.offset(n, c, h, w)];
                }
            }
        }
    }
}

fn reformat_typed<T: Element>(src: &TensorBuffer, dst: &mut TensorBuffer) -> Result<()> {
    let dims = src.dims();
    let (from, to) = (src.layout(), dst.layout());
    let input = src
        .as_slice::<T>()
        .ok_or_else(|| BriskError::Storage(format!("expected {} source data", T::KIND)))?;
    let output = dst
        .as_slice_mut::<T>()
        .ok_or_else(|| BriskError::Storage(format!("expected {} destination data", T::KIND)))?;
    match (from, to) {
        (LayoutKind::Nchw, LayoutKind::Nc4hw4) => nchw_to_nc4hw4(input, &dims, output),
        (LayoutKind::Nc4hw4, LayoutKind::Nchw) => nc4hw4_to_nchw(input, &dims, output),
        _ => output.copy_from_slice(input),
    }
    Ok(())
}

/// Convert `src` into `dst`'s layout. Dims and data kind must match.
pub fn reformat(src: &TensorBuffer, dst: &mut TensorBuffer) -> Result<()> {
    if src.dims() != dst.dims() {
        return Err(BriskError::ShapeMismatch {
            expected: dst.dims(),
            got: src.dims(),
        });
    }
    if src.data_kind() != dst.data_kind() {
        return Err(BriskError::Storage(format!(
            "cannot reformat {} into {}",
            src.data_kind(),
            dst.data_kind()
        )));
    }
    match src.data_kind() {
        DataKind::Float32 => reformat_typed::<f32>(src, dst),
        DataKind::Float16 => reformat_typed::<f16>(src, dst),
        DataKind::Bfloat16 => reformat_typed::<bf16>(src, dst),
        DataKind::Int8 => reformat_typed::<i8>(src, dst),
        DataKind::Int32 => reformat_typed::<i32>(src, dst),
        DataKind::Uint32 => reformat_typed::<u32>(src, dst),
        DataKind::Int64 => reformat_typed::<i64>(src, dst),
    }
}

/// Convert into a freshly allocated buffer in `layout`, tagged with `src`'s device.
pub fn to_layout(src: &TensorBuffer, layout: LayoutKind) -> Result<TensorBuffer> {
    let mut dst = TensorBuffer::zeros(src.dims(), src.data_kind(), layout, src.device());
    reformat(src, &mut dst)?;
    Ok(dst)
}
