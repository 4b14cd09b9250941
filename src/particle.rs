//! Per-particle state.
//!
//! Particles live in a dense vector owned by the [`Environment`]; a
//! [`ParticleId`] is an index into that vector. Ids are assigned on creation,
//! are never reused, and stay valid for the lifetime of the environment --
//! a DEAD particle keeps its slot. Cells reference particles by id, which
//! avoids the particle->grid back-reference of a pointer-based design and
//! the aliasing it would create under parallel force evaluation.
//!
//! [`Environment`]: crate::Environment

use crate::math::{DVec3, IVec3};

/// Index of a particle in the environment's particle store.
pub type ParticleId = usize;

/// Lifecycle state of a particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticleState {
    /// Integrated normally.
    Alive,
    /// Participates in force evaluation but never moves. Two stationary
    /// particles exert no force on each other.
    Stationary,
    /// Removed from the grid (outflow). Terminal; the id stays valid.
    Dead,
}

impl ParticleState {
    /// Whether position and velocity updates apply to this state.
    #[inline]
    pub fn is_moving(self) -> bool {
        self == ParticleState::Alive
    }

    /// Whether the particle occupies a grid cell.
    #[inline]
    pub fn in_grid(self) -> bool {
        self != ParticleState::Dead
    }
}

/// A point particle.
#[derive(Clone, Debug)]
pub struct Particle {
    /// Stable id; equals the particle's index in the environment store.
    pub id: ParticleId,
    pub position: DVec3,
    /// Position before the current step's position update. The boundary
    /// engine back-traces the crossing from here.
    pub old_position: DVec3,
    pub velocity: DVec3,
    /// Force accumulated during the current step.
    pub force: DVec3,
    /// Force of the previous step; the Verlet velocity update averages the
    /// two.
    pub old_force: DVec3,
    /// Index of the owning grid cell, `(-1, -1, -1)` when outside.
    pub cell: IVec3,
    pub mass: f64,
    /// Key into the force registry.
    pub type_id: u32,
    pub state: ParticleState,
}

impl Particle {
    pub(crate) fn new(
        id: ParticleId,
        position: DVec3,
        velocity: DVec3,
        mass: f64,
        type_id: u32,
        state: ParticleState,
        force: DVec3,
    ) -> Self {
        Self {
            id,
            position,
            old_position: position,
            velocity,
            force,
            old_force: DVec3::ZERO,
            cell: IVec3::ZERO,
            mass,
            type_id,
            state,
        }
    }

    /// Rotates the force accumulators at the start of a step.
    #[inline]
    pub fn reset_force(&mut self) {
        self.old_force = self.force;
        self.force = DVec3::ZERO;
    }
}
