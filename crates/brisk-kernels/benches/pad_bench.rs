//! Benchmark: NC4HW4 lane pad vs the planar scalar reference.

use std::time::Instant;

use brisk_core::{TensorDims, LANE};
use brisk_kernels::{pad_nc4hw4, pad_nchw, PadMode, Pads, DEFAULT_PAR_MIN_GROUPS};

fn time_it(iters: usize, mut f: impl FnMut()) -> f64 {
    let start = Instant::now();
    for _ in 0..iters {
        f();
    }
    start.elapsed().as_secs_f64() / iters as f64
}

fn packed_len(d: &TensorDims) -> usize {
    d.batch * d.channel_groups() * LANE * d.plane()
}

fn main() {
    println!("=== brisk Pad Benchmark ===");
    println!("Lane backend: {}\n", brisk_kernels::lane_backend());

    let cases: [(&str, [i32; 8], PadMode); 4] = [
        ("const hw", [0, 0, 1, 1, 0, 0, 1, 1], PadMode::Constant),
        ("const c+4", [0, 4, 1, 1, 0, 4, 1, 1], PadMode::Constant),
        ("const c+2", [0, 2, 1, 1, 0, 1, 1, 1], PadMode::Constant),
        ("reflect", [0, 0, 2, 2, 0, 0, 2, 2], PadMode::Reflect),
    ];

    println!(
        "{:<12} {:<18} {:>12} {:>14} {:>12} {:>9}",
        "Case", "Input", "Scalar (ms)", "Lane 1t (ms)", "Lane (ms)", "Speedup"
    );
    println!("{}", "-".repeat(82));

    for &(c, hw) in &[(16usize, 32usize), (32, 64), (64, 112), (128, 56)] {
        let in_dims = TensorDims::new(1, c, hw, hw);
        let planar: Vec<f32> = (0..in_dims.numel()).map(|i| ((i * 7 + 3) % 13) as f32 * 0.1 - 0.6).collect();
        let packed: Vec<f32> = vec![0.5; packed_len(&in_dims)];
        let iters = if hw <= 32 { 200 } else if hw <= 64 { 50 } else { 10 };

        for (name, spec, mode) in &cases {
            let pads = match Pads::from_spec(spec) {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("{name}: {e}");
                    continue;
                }
            };
            let out_dims = pads.output_dims(&in_dims);
            let mut planar_out = vec![0.0f32; out_dims.numel()];
            let mut packed_out = vec![0.0f32; packed_len(&out_dims)];

            let scalar_s = time_it(iters, || {
                let _ = pad_nchw(&planar, &in_dims, &mut planar_out, &out_dims, &pads, *mode, 0.0);
            });
            let single_s = time_it(iters, || {
                let _ = pad_nc4hw4(&packed, &in_dims, &mut packed_out, &out_dims, &pads, *mode, 0.0, usize::MAX);
            });
            let par_s = time_it(iters, || {
                let _ = pad_nc4hw4(
                    &packed,
                    &in_dims,
                    &mut packed_out,
                    &out_dims,
                    &pads,
                    *mode,
                    0.0,
                    DEFAULT_PAR_MIN_GROUPS,
                );
            });

            println!(
                "{:<12} {:<18} {:>10.3}ms {:>12.3}ms {:>10.3}ms {:>8.1}x",
                name,
                in_dims.to_string(),
                scalar_s * 1000.0,
                single_s * 1000.0,
                par_s * 1000.0,
                scalar_s / par_s,
            );
        }
    }
}
