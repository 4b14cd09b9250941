//! Time-bounded external constant forces.
//!
//! A [`ConstantForce`] binds a direction and strength to a set of particles
//! chosen by a [`Marker`]. The marker is evaluated once after the
//! environment is built, fixing the marked id set; per step the force is
//! added to every marked particle while the simulation time lies inside the
//! active window.

use crate::math::DVec3;
use crate::particle::{Particle, ParticleId};

/// Selects which particles an external force applies to.
#[derive(Clone, Copy, Debug)]
pub enum Marker {
    /// Every particle.
    All,
    /// Particles inside an axis-aligned box.
    Box { min: DVec3, max: DVec3 },
}

impl Marker {
    pub fn matches(&self, particle: &Particle) -> bool {
        match *self {
            Marker::All => true,
            Marker::Box { min, max } => {
                let x = particle.position;
                x.x >= min.x
                    && x.x <= max.x
                    && x.y >= min.y
                    && x.y <= max.y
                    && x.z >= min.z
                    && x.z <= max.z
            }
        }
    }
}

/// A constant external force, optionally scaled to a constant acceleration.
#[derive(Clone, Debug)]
pub struct ConstantForce {
    direction: DVec3,
    strength: f64,
    marker: Marker,
    start_time: f64,
    end_time: f64,
    const_acceleration: bool,
    marked: Vec<ParticleId>,
}

impl ConstantForce {
    pub fn new(
        direction: DVec3,
        strength: f64,
        marker: Marker,
        start_time: f64,
        end_time: f64,
        const_acceleration: bool,
    ) -> Self {
        Self {
            direction,
            strength,
            marker,
            start_time,
            end_time,
            const_acceleration,
            marked: Vec::new(),
        }
    }

    /// Gravity of strength `g` along the given axis (typically negative for
    /// a downward pull): every particle, always active, constant
    /// acceleration.
    pub fn gravity(g: f64, axis: usize) -> Self {
        let mut direction = DVec3::ZERO;
        direction[axis] = 1.0;
        Self::new(direction, g, Marker::All, 0.0, f64::MAX, true)
    }

    /// Evaluates the marker across the population, fixing the marked set.
    pub(crate) fn mark_particles(&mut self, particles: &[Particle]) {
        self.marked = particles
            .iter()
            .filter(|p| self.marker.matches(p))
            .map(|p| p.id)
            .collect();
    }

    /// Ids this force applies to.
    pub fn marked(&self) -> &[ParticleId] {
        &self.marked
    }

    /// Adds the force to the particle if `t` lies in the active window.
    #[inline]
    pub fn apply(&self, particle: &mut Particle, t: f64) {
        if t >= self.start_time && t <= self.end_time {
            let divisor = if self.const_acceleration { particle.mass } else { 1.0 };
            particle.force += self.strength / divisor * self.direction;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleState;

    fn particle_at(position: DVec3, mass: f64) -> Particle {
        Particle::new(0, position, DVec3::ZERO, mass, 0, ParticleState::Alive, DVec3::ZERO)
    }

    #[test]
    fn box_marker_selects_by_position() {
        let marker = Marker::Box {
            min: DVec3::ZERO,
            max: DVec3::new(1.0, 1.0, 1.0),
        };
        assert!(marker.matches(&particle_at(DVec3::new(0.5, 0.5, 0.5), 1.0)));
        assert!(!marker.matches(&particle_at(DVec3::new(1.5, 0.5, 0.5), 1.0)));
    }

    #[test]
    fn force_respects_the_time_window() {
        let force = ConstantForce::new(DVec3::X, 2.0, Marker::All, 1.0, 2.0, false);
        let mut p = particle_at(DVec3::ZERO, 4.0);
        force.apply(&mut p, 0.5);
        assert_eq!(p.force, DVec3::ZERO);
        force.apply(&mut p, 1.5);
        assert_eq!(p.force, DVec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn constant_acceleration_divides_by_mass() {
        let gravity = ConstantForce::gravity(-9.81, 1);
        let mut p = particle_at(DVec3::ZERO, 2.0);
        gravity.apply(&mut p, 0.0);
        assert!((p.force.y + 4.905).abs() < 1e-12);
    }
}
