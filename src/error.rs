//! Error types for the simulation engine.
//!
//! Configuration problems surface at [`Environment::build`] or while reading
//! a scenario file and abort the run with a descriptive message. Step-time
//! invariant violations (unknown particle type, cell miss) are programmer
//! bugs, not user input, and panic after logging.
//!
//! [`Environment::build`]: crate::Environment::build

use std::path::PathBuf;

use thiserror::Error;

use crate::math::{DVec3, UVec3};
use crate::particle::ParticleId;

/// Errors raised while configuring or building an environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("boundary extents must be non-negative, got {0}")]
    NegativeExtent(DVec3),

    #[error("particle {id} starts outside the domain at {position}")]
    ParticleOutOfDomain { id: ParticleId, position: DVec3 },

    #[error("grid constant {grid_constant} is below the force cutoff {cutoff}")]
    GridConstantBelowCutoff { grid_constant: f64, cutoff: f64 },

    #[error("grid constant must be positive, got {0}")]
    NonPositiveGridConstant(f64),

    #[error("cannot mix potentials of different kinds (types {0} and {1})")]
    UnmixablePotentials(u32, u32),

    #[error("particle counts must be non-zero in every direction, got {0}")]
    EmptyLattice(UVec3),

    #[error("sphere spawning needs an explicit dimension")]
    SphereNeedsDimension,

    #[error("membranes must be one particle thick, got {0}")]
    MembraneNotPlanar(UVec3),

    #[error("a REPULSIVE_FORCE face requires a boundary force")]
    MissingBoundaryForce,

    #[error("environment is already built")]
    AlreadyBuilt,

    #[error("output directory {} already contains frames (use the overwrite flag to clear it)", .0.display())]
    OutputDirNotEmpty(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading a scenario or checkpoint file.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("{path}:{line}: {message}")]
    Malformed {
        path: String,
        line: usize,
        message: String,
    },

    #[error("cannot read scenario file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ScenarioError {
    pub(crate) fn malformed(path: &str, line: usize, message: impl Into<String>) -> Self {
        ScenarioError::Malformed {
            path: path.to_string(),
            line,
            message: message.into(),
        }
    }
}
