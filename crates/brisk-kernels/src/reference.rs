//! Scalar pad over planar (NCHW) buffers.
//!
//! One element at a time, no lanes. Backs the naive-device accelerator and is
//! the oracle the vectorized kernel is checked against.

use brisk_core::{nchw_offset, BriskError, Element, Result, TensorDims};

use crate::pad::{PadMode, Pads};

/// Mirror `i` into `0..n` without repeating the edge element.
fn reflect_index(i: isize, n: usize) -> usize {
    let last = n as isize - 1;
    let r = if i < 0 {
        -i
    } else if i > last {
        2 * last - i
    } else {
        i
    };
    r as usize
}

/// Pad a planar buffer. Same validation and results as
/// [`pad_nc4hw4`](crate::pad::pad_nc4hw4), one element at a time.
pub fn pad_nchw<T: Element>(
    input: &[T],
    in_dims: &TensorDims,
    output: &mut [T],
    out_dims: &TensorDims,
    pads: &Pads,
    mode: PadMode,
    value: f32,
) -> Result<()> {
    pads.check(mode, in_dims, out_dims)?;
    if input.len() != in_dims.numel() || output.len() != out_dims.numel() {
        return Err(BriskError::Storage(format!(
            "planar pad expects {} -> {} elements, got {} -> {}",
            in_dims.numel(),
            out_dims.numel(),
            input.len(),
            output.len()
        )));
    }

    let value = T::from_f32(value);
    let (ic, ih, iw) = (in_dims.channels, in_dims.height, in_dims.width);
    let mut out = output.iter_mut();

    for n in 0..out_dims.batch {
        for c in 0..out_dims.channels {
            let sc = c as isize - pads.channel_begin as isize;
            for h in 0..out_dims.height {
                let sh = h as isize - pads.top as isize;
                for w in 0..out_dims.width {
                    let sw = w as isize - pads.left as isize;
                    let src = match mode {
                        PadMode::Reflect => Some((
                            c,
                            reflect_index(sh, ih),
                            reflect_index(sw, iw),
                        )),
                        _ => {
                            let inside = (0..ic as isize).contains(&sc)
                                && (0..ih as isize).contains(&sh)
                                && (0..iw as isize).contains(&sw);
                            inside.then(|| (sc as usize, sh as usize, sw as usize))
                        }
                    };
                    if let Some(slot) = out.next() {
                        *slot = match src {
                            Some((c, h, w)) => input[nchw_offset(in_dims, n, c, h, w)],
                            None => value,
                        };
                    }
                }
            }
        }
    }
    Ok(())
}
