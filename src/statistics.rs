//! Binned statistical analysis of a running simulation.

use std::io;
use std::path::Path;

use crate::environment::Environment;
use crate::io::csv::CsvWriter;
use crate::particle::ParticleState;

/// A statistics sampler invoked by the integrator on an index-based
/// schedule.
pub trait Statistics {
    /// Number of steps between samples.
    fn compute_freq(&self) -> usize;

    /// Takes one sample of the environment at simulation time `time`.
    fn compute(&mut self, env: &Environment, time: f64) -> io::Result<()>;
}

/// Profile statistics for nano-scale channel flow: the domain is split into
/// bins along the x axis; each sample records the mean y-velocity and the
/// particle-count density per bin.
pub struct NanoFlowStatistics {
    n_bins: usize,
    compute_freq: usize,
    writer: CsvWriter,
}

impl NanoFlowStatistics {
    pub fn new(compute_freq: usize, n_bins: usize, path: &Path) -> io::Result<Self> {
        Ok(Self {
            n_bins,
            compute_freq,
            writer: CsvWriter::create(path, n_bins)?,
        })
    }
}

impl Statistics for NanoFlowStatistics {
    fn compute_freq(&self) -> usize {
        self.compute_freq
    }

    fn compute(&mut self, env: &Environment, time: f64) -> io::Result<()> {
        let extent = env.extent();
        let origin = env.origin();
        let bin_width = extent.x / self.n_bins as f64;
        let bin_volume = extent.y * extent.z * bin_width;

        let mut velocity = vec![0.0; self.n_bins];
        let mut count = vec![0.0; self.n_bins];

        for particle in env.particles() {
            if particle.state != ParticleState::Alive {
                continue;
            }
            let idx = ((particle.position.x - origin.x) / bin_width) as usize;
            let idx = idx.min(self.n_bins - 1);
            velocity[idx] += particle.velocity.y;
            count[idx] += 1.0;
        }

        let mut density = vec![0.0; self.n_bins];
        for i in 0..self.n_bins {
            if count[i] > 0.0 {
                velocity[i] /= count[i];
            }
            density[i] = count[i] / bin_volume;
        }

        tracing::debug!(time, ?velocity, ?density, "nano-flow sample");
        self.writer.write_sample(time, &velocity, &density)
    }
}
