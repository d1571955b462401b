//! Rectified linear unit over packed and planar buffers.

use brisk_core::{BriskError, Element, Result, LANE};

use crate::lane::Lane;

/// `max(x, 0)` lane by lane. Both slices must have the same length, a multiple of 4.
pub fn relu_lanes<T: Element>(input: &[T], output: &mut [T]) -> Result<()> {
    if input.len() != output.len() || input.len() % LANE != 0 {
        return Err(BriskError::Storage(format!(
            "relu over lanes needs equal lengths divisible by {LANE}, got {} and {}",
            input.len(),
            output.len()
        )));
    }
    let zero = Lane::splat(T::default());
    for (src, dst) in input.chunks_exact(LANE).zip(output.chunks_exact_mut(LANE)) {
        Lane::load(src).max(zero).store(dst);
    }
    Ok(())
}

/// Scalar `max(x, 0)`.
pub fn relu_scalar<T: Element>(input: &[T], output: &mut [T]) -> Result<()> {
    if input.len() != output.len() {
        return Err(BriskError::Storage(format!(
            "relu length mismatch: {} vs {}",
            input.len(),
            output.len()
        )));
    }
    let zero = T::default();
    for (&x, y) in input.iter().zip(output.iter_mut()) {
        *y = if x > zero { x } else { zero };
    }
    Ok(())
}
