//! Fixed-width 4-element lane, the unit every packed kernel works in.
//!
//! Lanes are plain `Copy` values: loads copy out of a slice, `extract` and
//! `partial_pad` return new lanes, and a fill lane can be stored any number of
//! times without aliasing concerns. On aarch64, x86_64 and wasm32 the `[T; 4]`
//! body lowers to a single 128-bit register for 4-byte elements.

use brisk_core::{Element, LANE};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lane<T>(pub [T; LANE]);

impl<T: Element> Lane<T> {
    /// Load the first 4 elements of `src`.
    #[inline(always)]
    pub fn load(src: &[T]) -> Self {
        let mut v = [T::default(); LANE];
        v.copy_from_slice(&src[..LANE]);
        Lane(v)
    }

    /// Store into the first 4 elements of `dst`.
    #[inline(always)]
    pub fn store(self, dst: &mut [T]) {
        dst[..LANE].copy_from_slice(&self.0);
    }

    /// Broadcast a scalar into all 4 lanes.
    #[inline(always)]
    pub fn splat(v: T) -> Self {
        Lane([v; LANE])
    }

    /// The 4 elements starting at `shift` in the 8-element window `a ‖ b`.
    ///
    /// `shift` must be in `0..4`; 0 returns `a`.
    #[inline(always)]
    pub fn extract(a: Self, b: Self, shift: usize) -> Self {
        debug_assert!(shift < LANE, "extract shift {shift} out of range");
        let window = [a.0[0], a.0[1], a.0[2], a.0[3], b.0[0], b.0[1], b.0[2], b.0[3]];
        let mut v = [T::default(); LANE];
        v.copy_from_slice(&window[shift..shift + LANE]);
        Lane(v)
    }

    /// Keep the first `valid` elements and take the rest from `fill`.
    #[inline(always)]
    pub fn partial_pad(self, fill: Self, valid: usize) -> Self {
        let mut v = self.0;
        for i in valid.min(LANE)..LANE {
            v[i] = fill.0[i];
        }
        Lane(v)
    }

    /// Lane-wise maximum.
    #[inline(always)]
    pub fn max(self, other: Self) -> Self {
        let mut v = self.0;
        for (x, &y) in v.iter_mut().zip(other.0.iter()) {
            if y > *x {
                *x = y;
            }
        }
        Lane(v)
    }

    pub fn to_array(self) -> [T; LANE] {
        self.0
    }
}

/// Instruction set a `Lane` of 4-byte elements compiles to on this target.
pub fn lane_backend() -> &'static str {
    if cfg!(all(target_arch = "x86_64", target_feature = "sse2")) {
        "sse2"
    } else if cfg!(all(target_arch = "aarch64", target_feature = "neon")) {
        "neon"
    } else if cfg!(all(target_arch = "wasm32", target_feature = "simd128")) {
        "simd128"
    } else {
        "scalar"
    }
}

/// Store `fill` into every lane of `dst` (`dst.len()` must be a multiple of 4).
#[inline]
pub fn fill_lanes<T: Element>(dst: &mut [T], fill: Lane<T>) {
    for chunk in dst.chunks_exact_mut(LANE) {
        fill.store(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_store() {
        let src = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        let lane = Lane::load(&src[1..]);
        assert_eq!(lane.to_array(), [2.0, 3.0, 4.0, 5.0]);

        let mut dst = [0.0f32; 6];
        lane.store(&mut dst[2..]);
        assert_eq!(dst, [0.0, 0.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_splat() {
        assert_eq!(Lane::splat(7i32).to_array(), [7, 7, 7, 7]);
    }

    #[test]
    fn test_extract_every_shift() {
        let a = Lane([0u32, 1, 2, 3]);
        let b = Lane([4u32, 5, 6, 7]);
        assert_eq!(Lane::extract(a, b, 0), a);
        assert_eq!(Lane::extract(a, b, 1).to_array(), [1, 2, 3, 4]);
        assert_eq!(Lane::extract(a, b, 2).to_array(), [2, 3, 4, 5]);
        assert_eq!(Lane::extract(a, b, 3).to_array(), [3, 4, 5, 6]);
    }

    #[test]
    fn test_partial_pad() {
        let lane = Lane([1.0f32, 2.0, 3.0, 4.0]);
        let fill = Lane::splat(-1.0f32);
        assert_eq!(lane.partial_pad(fill, 1).to_array(), [1.0, -1.0, -1.0, -1.0]);
        assert_eq!(lane.partial_pad(fill, 3).to_array(), [1.0, 2.0, 3.0, -1.0]);
        assert_eq!(lane.partial_pad(fill, 4), lane);
        assert_eq!(lane.partial_pad(fill, 0), fill);
    }

    #[test]
    fn test_partial_pad_does_not_touch_fill() {
        let fill = Lane::splat(9i32);
        let a = Lane([1, 2, 3, 4]).partial_pad(fill, 2);
        let b = Lane([5, 6, 7, 8]).partial_pad(fill, 1);
        assert_eq!(fill.to_array(), [9, 9, 9, 9]);
        assert_eq!(a.to_array(), [1, 2, 9, 9]);
        assert_eq!(b.to_array(), [5, 9, 9, 9]);
    }

    #[test]
    fn test_max() {
        let lane = Lane([-1.0f32, 2.0, -3.0, 0.5]);
        assert_eq!(lane.max(Lane::splat(0.0)).to_array(), [0.0, 2.0, 0.0, 0.5]);
    }

    #[test]
    fn test_fill_lanes() {
        let mut dst = [0i32; 8];
        fill_lanes(&mut dst, Lane::splat(3));
        assert_eq!(dst, [3; 8]);
    }

    #[test]
    fn test_lane_backend() {
        let backend = lane_backend();
        assert!(["sse2", "neon", "simd128", "scalar"].contains(&backend));
        #[cfg(target_arch = "x86_64")]
        assert_eq!(backend, "sse2");
    }
}
