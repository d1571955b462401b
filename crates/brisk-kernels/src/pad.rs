//! Pad kernel over the channel-vectorized (NC4HW4) layout.
//!
//! Every destination channel-group plane is independent, so planes are the unit
//! of work: each is either a pure fill, a row copy with spatial borders, or a
//! lane-by-lane reassembly from two source groups when the channel offset is not
//! a multiple of 4.
//!
//! ```text
//! channel_begin = 2, ic = 3
//!   src groups:   [c0 c1 c2 --]
//!   dst group 0:  [ v  v c0 c1] = extract(fill, src0, 2)
//!   dst group 1:  [c2  v  v  v] = extract(src0.partial_pad(fill, 3), fill, 2)
//! ```

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use brisk_core::{BlockStrides, BriskError, Element, LayoutKind, Result, TensorDims, LANE};

use crate::lane::{fill_lanes, Lane};

/// Minimum number of channel-group planes before the kernel fans out to rayon.
pub const DEFAULT_PAR_MIN_GROUPS: usize = 4;

/// How the border region is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadMode {
    /// Fill with a broadcast constant.
    #[default]
    Constant,
    /// Mirror around the edge element, excluding the edge itself.
    Reflect,
    /// Replicate the edge element. Recognized in model descriptors but not
    /// implemented by any kernel.
    Edge,
}

impl PadMode {
    /// Numeric mode code used by serialized layer parameters and the C API.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(PadMode::Constant),
            1 => Ok(PadMode::Reflect),
            2 => Ok(PadMode::Edge),
            other => Err(BriskError::Parameter(format!("unknown pad mode code {other}"))),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            PadMode::Constant => 0,
            PadMode::Reflect => 1,
            PadMode::Edge => 2,
        }
    }
}

/// Validated begin/end padding per axis. Batch padding is never representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pads {
    pub channel_begin: usize,
    pub channel_end: usize,
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl Pads {
    /// Parse an 8-entry pad list
    /// `[batch_b, channel_b, height_b, width_b, batch_e, channel_e, height_e, width_e]`.
    pub fn from_spec(spec: &[i32]) -> Result<Self> {
        if spec.len() != 8 {
            return Err(BriskError::Parameter(format!(
                "pad list must have 8 entries, got {}",
                spec.len()
            )));
        }
        if spec[0] != 0 || spec[4] != 0 {
            return Err(BriskError::Parameter(format!(
                "batch padding is not supported (begin {}, end {})",
                spec[0], spec[4]
            )));
        }
        if let Some(neg) = spec.iter().find(|&&p| p < 0) {
            return Err(BriskError::Parameter(format!(
                "negative padding {neg} in {spec:?}"
            )));
        }
        Ok(Self {
            channel_begin: spec[1] as usize,
            top: spec[2] as usize,
            left: spec[3] as usize,
            channel_end: spec[5] as usize,
            bottom: spec[6] as usize,
            right: spec[7] as usize,
        })
    }

    /// The 8-entry pad list this value was parsed from.
    pub fn to_spec(&self) -> [i32; 8] {
        [
            0,
            self.channel_begin as i32,
            self.top as i32,
            self.left as i32,
            0,
            self.channel_end as i32,
            self.bottom as i32,
            self.right as i32,
        ]
    }

    pub fn output_dims(&self, input: &TensorDims) -> TensorDims {
        TensorDims::new(
            input.batch,
            input.channels + self.channel_begin + self.channel_end,
            input.height + self.top + self.bottom,
            input.width + self.left + self.right,
        )
    }

    pub fn has_channel_padding(&self) -> bool {
        self.channel_begin != 0 || self.channel_end != 0
    }

    /// Check that `output` is `input` grown by these pads and that `mode` can
    /// produce it. Shared by the vectorized and reference kernels.
    pub fn check(&self, mode: PadMode, input: &TensorDims, output: &TensorDims) -> Result<()> {
        let expected = self.output_dims(input);
        if expected != *output {
            return Err(BriskError::Parameter(format!(
                "output dims {output} do not match input {input} padded by {:?} (expected {expected})",
                self.to_spec()
            )));
        }
        match mode {
            PadMode::Constant => Ok(()),
            PadMode::Reflect => {
                if self.has_channel_padding() {
                    return Err(BriskError::Parameter(
                        "reflect padding along channels is not supported".into(),
                    ));
                }
                let max_h = input.height.saturating_sub(1);
                let max_w = input.width.saturating_sub(1);
                if self.top > max_h || self.bottom > max_h {
                    return Err(BriskError::Parameter(format!(
                        "reflect height padding ({}, {}) must be < input height {}",
                        self.top, self.bottom, input.height
                    )));
                }
                if self.left > max_w || self.right > max_w {
                    return Err(BriskError::Parameter(format!(
                        "reflect width padding ({}, {}) must be < input width {}",
                        self.left, self.right, input.width
                    )));
                }
                Ok(())
            }
            PadMode::Edge => Err(BriskError::Parameter(
                "edge padding mode is not supported".into(),
            )),
        }
    }
}

/// Spatial geometry of one plane, in elements.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    ih: usize,
    iw: usize,
    top: usize,
    left: usize,
    in_row: usize,
    out_row: usize,
    input: BlockStrides,
}

impl Geometry {
    fn new(input: &TensorDims, output: &TensorDims, pads: &Pads) -> Self {
        let in_s = BlockStrides::nc4hw4(input);
        let out_s = BlockStrides::nc4hw4(output);
        Self {
            ih: input.height,
            iw: input.width,
            top: pads.top,
            left: pads.left,
            in_row: in_s.row,
            out_row: out_s.row,
            input: in_s,
        }
    }
}

/// Where one destination lane's 4 source channels come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Fill,
    /// A source group at `offset` (within the batch) whose first `valid`
    /// channels are real.
    Group { offset: usize, valid: usize },
}

impl Source {
    /// Resolve the source group starting at channel `start` (a multiple of 4).
    fn resolve(start: isize, ic: usize, strides: &BlockStrides) -> Self {
        if start < 0 || start as usize >= ic {
            return Source::Fill;
        }
        let start = start as usize;
        Source::Group {
            offset: strides.group_offset(start / LANE),
            valid: (ic - start).min(LANE),
        }
    }

    #[inline(always)]
    fn lane<T: Element>(self, base: &[T], idx: usize, fill: Lane<T>) -> Lane<T> {
        match self {
            Source::Fill => fill,
            Source::Group { offset, valid } => {
                Lane::load(&base[offset + idx..]).partial_pad(fill, valid)
            }
        }
    }
}

fn check_lengths<T>(input: &[T], in_dims: &TensorDims, output: &[T], out_dims: &TensorDims) -> Result<()> {
    let in_len = LayoutKind::Nc4hw4.physical_len(in_dims);
    let out_len = LayoutKind::Nc4hw4.physical_len(out_dims);
    if input.len() != in_len {
        return Err(BriskError::Storage(format!(
            "pad input holds {} elements, nc4hw4 {in_dims} needs {in_len}",
            input.len()
        )));
    }
    if output.len() != out_len {
        return Err(BriskError::Storage(format!(
            "pad output holds {} elements, nc4hw4 {out_dims} needs {out_len}",
            output.len()
        )));
    }
    Ok(())
}

/// Run `f(plane_index, plane)` over every destination group plane, in parallel
/// once there are at least `par_min_groups` planes.
fn for_each_plane<T, F>(output: &mut [T], plane: usize, par_min_groups: usize, f: F)
where
    T: Element,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if plane == 0 {
        return;
    }
    let planes = output.len() / plane;
    if planes > 1 && planes >= par_min_groups {
        output
            .par_chunks_mut(plane)
            .enumerate()
            .for_each(|(i, dst)| f(i, dst));
    } else {
        for (i, dst) in output.chunks_mut(plane).enumerate() {
            f(i, dst);
        }
    }
}

/// Fill the top/bottom rows and the left/right columns of one plane with
/// `fill`, handing the data region of each input row to `copy_row`.
fn pad_plane<T: Element>(
    dst: &mut [T],
    geo: &Geometry,
    fill: Lane<T>,
    mut copy_row: impl FnMut(usize, &mut [T]),
) {
    let (top, rest) = dst.split_at_mut(geo.top * geo.out_row);
    fill_lanes(top, fill);
    let (body, bottom) = rest.split_at_mut(geo.ih * geo.out_row);
    fill_lanes(bottom, fill);
    if geo.out_row == 0 {
        return;
    }
    for (h, row) in body.chunks_exact_mut(geo.out_row).enumerate() {
        let (left, rest) = row.split_at_mut(geo.left * LANE);
        fill_lanes(left, fill);
        let (data, right) = rest.split_at_mut(geo.iw * LANE);
        copy_row(h, data);
        fill_lanes(right, fill);
    }
}

/// Constant-mode pad of an NC4HW4 buffer.
///
/// `output` must be sized for `out_dims == pads.output_dims(in_dims)`. Every
/// check runs before the first write. With channel padding, the padding lanes
/// of the output's last channel-group carry `value`; without it, groups are
/// copied 1:1 and those lanes keep whatever the input held.
pub fn const_pad<T: Element>(
    input: &[T],
    in_dims: &TensorDims,
    output: &mut [T],
    out_dims: &TensorDims,
    pads: &Pads,
    value: T,
    par_min_groups: usize,
) -> Result<()> {
    pads.check(PadMode::Constant, in_dims, out_dims)?;
    check_lengths(input, in_dims, output, out_dims)?;

    let geo = Geometry::new(in_dims, out_dims, pads);
    let fill = Lane::splat(value);
    let out_s = BlockStrides::nc4hw4(out_dims);

    if !pads.has_channel_padding() {
        // Groups map 1:1, padding lanes included.
        for_each_plane(output, out_s.plane, par_min_groups, |i, dst| {
            let src = &input[geo.input.group_offset(i)..][..geo.input.plane];
            pad_plane(dst, &geo, fill, |h, row| {
                row.copy_from_slice(&src[h * geo.in_row..(h + 1) * geo.in_row]);
            });
        });
        return Ok(());
    }

    let in_s = geo.input;
    let ic = in_dims.channels;
    let aligned = pads.channel_begin % LANE == 0;
    for_each_plane(output, out_s.plane, par_min_groups, |i, dst| {
        let n = i / out_s.groups;
        let c = (i % out_s.groups) * LANE;
        let base = &input[n * in_s.batch..(n + 1) * in_s.batch];
        let ic_mapped = c as isize - pads.channel_begin as isize;

        if ic_mapped + LANE as isize <= 0 || ic_mapped >= ic as isize {
            fill_lanes(dst, fill);
        } else if aligned {
            aligned_plane(dst, base, ic_mapped, ic, &geo, fill);
        } else {
            misaligned_plane(dst, base, ic_mapped, ic, &geo, fill);
        }
    });
    Ok(())
}

/// Destination group maps to exactly one source group.
fn aligned_plane<T: Element>(
    dst: &mut [T],
    base: &[T],
    ic_mapped: isize,
    ic: usize,
    geo: &Geometry,
    fill: Lane<T>,
) {
    match Source::resolve(ic_mapped, ic, &geo.input) {
        Source::Fill => fill_lanes(dst, fill),
        Source::Group { offset, valid } if valid == LANE => {
            pad_plane(dst, geo, fill, |h, row| {
                let start = offset + h * geo.in_row;
                row.copy_from_slice(&base[start..start + geo.in_row]);
            });
        }
        src => {
            // Last source group: trailing lanes beyond `ic` take the fill value.
            pad_plane(dst, geo, fill, |h, row| {
                for (w, out) in row.chunks_exact_mut(LANE).enumerate() {
                    src.lane(base, h * geo.in_row + w * LANE, fill).store(out);
                }
            });
        }
    }
}

/// Destination group straddles two source groups, `shift` channels apart.
fn misaligned_plane<T: Element>(
    dst: &mut [T],
    base: &[T],
    ic_mapped: isize,
    ic: usize,
    geo: &Geometry,
    fill: Lane<T>,
) {
    let lo_start = ic_mapped.div_euclid(LANE as isize) * LANE as isize;
    let shift = ic_mapped.rem_euclid(LANE as isize) as usize;
    let lo = Source::resolve(lo_start, ic, &geo.input);
    let hi = Source::resolve(lo_start + LANE as isize, ic, &geo.input);

    pad_plane(dst, geo, fill, |h, row| {
        for (w, out) in row.chunks_exact_mut(LANE).enumerate() {
            let idx = h * geo.in_row + w * LANE;
            let a = lo.lane(base, idx, fill);
            let b = hi.lane(base, idx, fill);
            Lane::extract(a, b, shift).store(out);
        }
    });
}

/// Reflect-mode pad of an NC4HW4 buffer (height and width only).
///
/// Rows are padded horizontally first; top and bottom border rows are then
/// copied from the already widened rows of the output.
pub fn reflect_pad<T: Element>(
    input: &[T],
    in_dims: &TensorDims,
    output: &mut [T],
    out_dims: &TensorDims,
    pads: &Pads,
    par_min_groups: usize,
) -> Result<()> {
    pads.check(PadMode::Reflect, in_dims, out_dims)?;
    check_lengths(input, in_dims, output, out_dims)?;

    let geo = Geometry::new(in_dims, out_dims, pads);
    let out_s = BlockStrides::nc4hw4(out_dims);
    let (top, bottom, left, right) = (pads.top, pads.bottom, pads.left, pads.right);
    let (ih, iw) = (geo.ih, geo.iw);

    for_each_plane(output, out_s.plane, par_min_groups, |i, dst| {
        let src = &input[geo.input.group_offset(i)..][..geo.input.plane];
        let orow = geo.out_row;

        for h in 0..ih {
            let in_row = &src[h * geo.in_row..(h + 1) * geo.in_row];
            let out_row = &mut dst[(h + top) * orow..(h + top + 1) * orow];
            out_row[left * LANE..(left + iw) * LANE].copy_from_slice(in_row);
            for x in 0..left {
                Lane::load(&in_row[(left - x) * LANE..]).store(&mut out_row[x * LANE..]);
            }
            for x in 0..right {
                Lane::load(&in_row[(iw - 2 - x) * LANE..])
                    .store(&mut out_row[(x + left + iw) * LANE..]);
            }
        }

        for h in 0..top {
            let from = (2 * top - h) * orow;
            dst.copy_within(from..from + orow, h * orow);
        }
        for h in 0..bottom {
            let from = (ih + top - 2 - h) * orow;
            dst.copy_within(from..from + orow, (h + ih + top) * orow);
        }
    });
    Ok(())
}

/// Pad in `mode`, converting the scalar `value` to the element type.
#[allow(clippy::too_many_arguments)]
pub fn pad_nc4hw4<T: Element>(
    input: &[T],
    in_dims: &TensorDims,
    output: &mut [T],
    out_dims: &TensorDims,
    pads: &Pads,
    mode: PadMode,
    value: f32,
    par_min_groups: usize,
) -> Result<()> {
    match mode {
        PadMode::Constant => const_pad(
            input,
            in_dims,
            output,
            out_dims,
            pads,
            T::from_f32(value),
            par_min_groups,
        ),
        PadMode::Reflect => reflect_pad(input, in_dims, output, out_dims, pads, par_min_groups),
        PadMode::Edge => pads.check(mode, in_dims, out_dims),
    }
}
