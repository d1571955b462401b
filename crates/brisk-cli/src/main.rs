use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use brisk_core::DeviceKind;
use brisk_edge::{global_registry, HostArray, NetworkConfig};
use brisk_kernels::lane_backend;

#[derive(Parser)]
#[command(
    name = "brisk",
    about = "brisk edge inference runtime",
    long_about = "Run brisk model descriptors on the naive or vector CPU device.\n\nSet RUST_LOG=debug to see accelerator creation and inserted layout conversions.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show the lane backend and registered accelerators
    Info,
    /// Load a model descriptor and run it on a deterministic random input
    Run {
        /// Path to the JSON model descriptor
        model: PathBuf,
        /// Device override: naive, vector_cpu, cuda, mobile_gpu, npu
        #[arg(long, value_parser = parse_device)]
        device: Option<DeviceKind>,
        /// Seed for the input generator
        #[arg(long, default_value = "0")]
        seed: u64,
        /// Number of timed forward passes
        #[arg(long, default_value = "1")]
        iters: usize,
        /// Print every output value
        #[arg(long)]
        dump: bool,
    },
}

fn parse_device(name: &str) -> Result<DeviceKind, String> {
    DeviceKind::from_name(name).ok_or_else(|| format!("unknown device '{name}'"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info => cmd_info(),
        Commands::Run { model, device, seed, iters, dump } => cmd_run(&model, device, seed, iters, dump),
    }
}

fn cmd_info() -> anyhow::Result<()> {
    println!("brisk v{}\n", env!("CARGO_PKG_VERSION"));

    println!("Platform");
    println!("  OS:    {}", std::env::consts::OS);
    println!("  Arch:  {}", std::env::consts::ARCH);
    println!("  Lanes: 4 x 32-bit ({})", lane_backend());

    let registry = global_registry();
    println!("\nAccelerators ({})", registry.len());
    for (op, device, layout) in registry.keys() {
        println!("  {:<6} {:<12} {}", op.to_string(), device.to_string(), layout);
    }
    Ok(())
}

fn cmd_run(model: &Path, device: Option<DeviceKind>, seed: u64, iters: usize, dump: bool) -> anyhow::Result<()> {
    if iters == 0 {
        bail!("--iters must be at least 1");
    }

    let mut module = match device {
        Some(d) => brisk_edge::load_with_config(model, NetworkConfig::default().with_device(d)),
        None => brisk_edge::load(model),
    }
    .with_context(|| format!("loading {}", model.display()))?;

    let instance = module.instance();
    tracing::debug!(model = %model.display(), seed, iters, "loaded model");
    println!("Model:     {}", instance.graph().name);
    println!("Device:    {}", instance.config().device);
    println!("Reformats: {}", instance.reformat_count());

    let mut rng = StdRng::seed_from_u64(seed);
    let mut inputs = Vec::new();
    for name in instance.input_names() {
        let dims = instance.input_dims(name)?;
        let data: Vec<f32> = (0..dims.numel()).map(|_| rng.gen_range(-1.0..1.0)).collect();
        println!("Input:     {name} {dims}");
        inputs.push((name.to_string(), HostArray::new(&dims.as_array(), data)?));
    }
    let bound: Vec<(&str, &HostArray)> = inputs.iter().map(|(n, a)| (n.as_str(), a)).collect();

    let start = Instant::now();
    let mut outputs = Vec::new();
    for _ in 0..iters {
        outputs = module
            .forward_named(&bound)
            .context("forward failed")?;
    }
    let per_iter = start.elapsed().as_secs_f64() / iters as f64;

    for (name, array) in &outputs {
        let sum: f64 = array.data().iter().map(|&v| v as f64).sum();
        let abs: f64 = array.data().iter().map(|&v| v.abs() as f64).sum();
        println!("Output:    {name} {:?} sum={sum:.6} abs_sum={abs:.6}", array.shape());
        if dump {
            println!("{:?}", array.data());
        }
    }
    println!("Time:      {:.3}ms / forward", per_iter * 1000.0);
    Ok(())
}
