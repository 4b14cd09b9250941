//! Command-line front-end: reads a scenario file, runs the simulation, and
//! writes trajectory frames.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mdcell::io::checkpoint::write_checkpoint;
use mdcell::io::scenario::read_scenario;
use mdcell::io::{create_writer, OutputFormat};

/// Benchmark replications used by `--benchmark`.
const BENCHMARK_REPETITIONS: usize = 10;

/// Directory trajectory frames are written to.
const OUTPUT_DIR: &str = "output";

/// Linked-cell molecular dynamics simulator.
#[derive(Parser, Debug)]
#[command(name = "mdcell", version, about)]
struct Args {
    /// Scenario or checkpoint file (TXT).
    input: PathBuf,

    /// Output format; required unless benchmarking.
    #[arg(value_enum, ignore_case = true)]
    format: Option<OutputFormat>,

    /// Disable per-step output, run repetitions, report the mean runtime.
    #[arg(short, long)]
    benchmark: bool,

    /// Allow clearing a non-empty output directory.
    #[arg(short = 'f', long)]
    force_overwrite: bool,

    /// Write a resume checkpoint to this path when the run finishes.
    #[arg(long)]
    checkpoint: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let scenario = read_scenario(&args.input)
        .with_context(|| format!("failed to read scenario {}", args.input.display()))?;
    let setup = scenario
        .into_simulation()
        .context("failed to build the simulation")?;
    let general = setup.general;
    let mut integrator = setup.integrator;

    if args.benchmark {
        let mean = integrator.benchmark(0.0, general.duration, general.dt, BENCHMARK_REPETITIONS);
        println!("mean runtime over {BENCHMARK_REPETITIONS} repetitions: {mean:.2} ms");
    } else {
        let Some(format) = args.format else {
            bail!("an output format (vtk or xyz) is required unless --benchmark is set");
        };
        let writer = create_writer(
            format,
            &general.base_name,
            PathBuf::from(OUTPUT_DIR).as_path(),
            args.force_overwrite,
        )?;
        integrator = integrator.with_writer(writer);
        integrator
            .simulate(0.0, general.duration, general.dt, general.write_freq)
            .context("simulation failed")?;
    }

    if let Some(path) = args.checkpoint {
        write_checkpoint(integrator.env(), &path)
            .with_context(|| format!("failed to write checkpoint {}", path.display()))?;
    }

    Ok(())
}
