//! # mdcell - Linked-Cell Molecular Dynamics Engine
//!
//! CPU molecular dynamics for short-range pairwise interactions in 2D or
//! 3D: Lennard-Jones fluids, gravitational swarms, membrane meshes, and
//! nano-scale channel flow. The engine advances point particles with the
//! Stoermer-Verlet scheme under per-type pair potentials, per-face boundary
//! rules, an optional thermostat, and time-bounded external forces.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mdcell::prelude::*;
//!
//! let mut env = Environment::new();
//! let mut boundary = Boundary::new();
//! boundary.origin = DVec3::ZERO;
//! boundary.extent = DVec3::new(10.0, 10.0, 1.0);
//! boundary.set_rule(BoundaryRule::Periodic);
//! env.set_boundary(boundary)?;
//! env.set_force(PairPotential::lennard_jones_with_cutoff(5.0, 1.0, 2.5), 0)?;
//! env.add_cuboid(&CuboidSpec { /* ... */ })?;
//! env.build()?;
//!
//! StoermerVerlet::new(env)
//!     .with_strategy(Strategy::SpatialDecomposition)
//!     .with_thermostat(Thermostat::new(Some(40.0), Some(40.0), None), 1000)
//!     .simulate(0.0, 5.0, 0.0002, 100)?;
//! ```
//!
//! ## Core Concepts
//!
//! ### Linked cells
//!
//! The domain is tiled with cells of side at least the force cutoff; force
//! evaluation walks pre-computed neighbour [`CellPair`]s instead of all
//! particle pairs, which makes a step O(N). Pairs crossing a periodic face
//! carry a periodicity flag and evaluate their displacement through the
//! boundary (minimum image).
//!
//! ### Boundary rules
//!
//! Each of the six domain faces has its own [`BoundaryRule`]: outflow,
//! periodic wrap, ghost-wall repulsion, or velocity reflection. Corner
//! crossings are disambiguated by back-tracing the particle path.
//!
//! ### Execution strategies
//!
//! The pairwise force phase runs serially, in parallel with per-cell locks,
//! or in parallel over pre-coloured block sets ([`Strategy`]). All three
//! produce the same trajectories within floating-point tolerance.
//!
//! ### Scenario files
//!
//! The binary front-end reads sectioned TXT scenario files (general,
//! particles, cuboids, spheres, membranes, force, environment, thermostats)
//! and writes VTK or XYZ trajectory frames, checkpoints, and binned flow
//! statistics; see [`io::scenario`].

pub mod boundary;
pub mod effects;
pub mod environment;
pub mod error;
pub mod integrator;
pub mod interactions;
pub mod io;
pub mod math;
pub mod particle;
pub mod spatial;
pub mod statistics;
pub mod thermostat;

pub use boundary::{Boundary, BoundaryRule, FACE_NORMALS};
pub use effects::{ConstantForce, Marker};
pub use environment::{CuboidSpec, Dimension, Environment, MembraneSpec, SphereSpec};
pub use error::{ConfigError, ScenarioError};
pub use glam::{DVec3, IVec3, UVec3};
pub use integrator::{StoermerVerlet, Strategy};
pub use interactions::{ForceRegistry, PairPotential};
pub use particle::{Particle, ParticleId, ParticleState};
pub use spatial::{Block, CellKind, CellPair, GridCell, ParticleGrid, Periodicity};
pub use statistics::{NanoFlowStatistics, Statistics};
pub use thermostat::{maxwell_boltzmann, Thermostat};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use mdcell::prelude::*;
/// ```
pub mod prelude {
    pub use crate::boundary::{Boundary, BoundaryRule};
    pub use crate::effects::{ConstantForce, Marker};
    pub use crate::environment::{CuboidSpec, Dimension, Environment, MembraneSpec, SphereSpec};
    pub use crate::integrator::{StoermerVerlet, Strategy};
    pub use crate::interactions::PairPotential;
    pub use crate::io::{create_writer, OutputFormat};
    pub use crate::particle::{ParticleId, ParticleState};
    pub use crate::statistics::NanoFlowStatistics;
    pub use crate::thermostat::Thermostat;
    pub use crate::{DVec3, IVec3, UVec3};
}
