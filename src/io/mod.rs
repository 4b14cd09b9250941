//! Scenario input and trajectory output.
//!
//! The scenario reader parses the sectioned TXT format into a [`Scenario`]
//! value which is then turned into a ready-to-run simulation. Output writers
//! emit VTK or XYZ frames on the integrator's write schedule; the CSV writer
//! backs the statistics sampler, and the checkpoint writer produces a
//! scenario-format file from which a run resumes without transient.
//!
//! [`Scenario`]: scenario::Scenario

pub mod checkpoint;
pub mod csv;
pub mod scenario;
mod vtk;
mod xyz;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;

use crate::environment::Environment;
use crate::error::ConfigError;

pub use vtk::VtkWriter;
pub use xyz::XyzWriter;

/// Trajectory frame format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Vtk,
    Xyz,
}

/// Writes one trajectory frame per invocation.
pub trait OutputWriter {
    fn plot(&mut self, env: &Environment, iteration: usize) -> io::Result<()>;
}

/// Creates the output directory and a frame writer for the chosen format.
///
/// A non-empty output directory is a configuration error unless
/// `allow_overwrite` is set, in which case its files are removed first.
pub fn create_writer(
    format: OutputFormat,
    base_name: &str,
    output_dir: &Path,
    allow_overwrite: bool,
) -> Result<Box<dyn OutputWriter>, ConfigError> {
    prepare_output_dir(output_dir, allow_overwrite)?;
    let base = base_name.to_string();
    let dir = output_dir.to_path_buf();
    Ok(match format {
        OutputFormat::Vtk => Box::new(VtkWriter::new(base, dir)),
        OutputFormat::Xyz => Box::new(XyzWriter::new(base, dir)),
    })
}

fn prepare_output_dir(dir: &Path, allow_overwrite: bool) -> Result<(), ConfigError> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(());
    }
    let entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    if entries.is_empty() {
        return Ok(());
    }
    if !allow_overwrite {
        return Err(ConfigError::OutputDirNotEmpty(dir.to_path_buf()));
    }
    for path in entries {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Frame file name `<base>_<iteration:04>.<ext>`.
pub(crate) fn frame_path(dir: &Path, base: &str, iteration: usize, ext: &str) -> PathBuf {
    dir.join(format!("{base}_{iteration:04}.{ext}"))
}
