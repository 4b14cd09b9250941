//! Velocity-scaling thermostat and the Maxwell-Boltzmann sampler.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::environment::Environment;
use crate::math::DVec3;

/// Samples a thermal velocity from the Maxwell-Boltzmann distribution:
/// an independent Gaussian per component for the first `dim` components,
/// scaled by `thermal_v`.
pub fn maxwell_boltzmann(thermal_v: f64, dim: usize, rng: &mut impl Rng) -> DVec3 {
    let mut v = DVec3::ZERO;
    for axis in 0..dim.min(3) {
        let n: f64 = rng.sample(StandardNormal);
        v[axis] = thermal_v * n;
    }
    v
}

/// Drives the system towards a target kinetic temperature by rescaling
/// velocities, with the per-adjustment change clamped to `max_change`.
#[derive(Clone, Copy, Debug)]
pub struct Thermostat {
    init: Option<f64>,
    target: Option<f64>,
    max_change: f64,
}

impl Default for Thermostat {
    fn default() -> Self {
        Self::disabled()
    }
}

impl Thermostat {
    /// `max_change` of `None` means unclamped adjustments.
    pub fn new(init: Option<f64>, target: Option<f64>, max_change: Option<f64>) -> Self {
        Self {
            init,
            target,
            max_change: max_change.unwrap_or(f64::INFINITY),
        }
    }

    /// A thermostat that never touches velocities.
    pub fn disabled() -> Self {
        Self {
            init: None,
            target: None,
            max_change: f64::INFINITY,
        }
    }

    /// Replaces every alive particle's velocity with a Maxwell-Boltzmann
    /// sample at the initial temperature. No-op when no initial temperature
    /// is set.
    pub fn set_initial_temperature(&self, env: &mut Environment) {
        let Some(init) = self.init else { return };
        let dim = env.dim();
        let mut rng = rand::thread_rng();
        for particle in env.particles_mut() {
            if particle.state.is_moving() {
                particle.velocity = maxwell_boltzmann((init / particle.mass).sqrt(), dim, &mut rng);
            }
        }
    }

    /// Scales alive velocities by `beta = sqrt(T_new / T_current)` where
    /// `T_new` approaches the target in steps of at most `max_change`.
    /// No-op without a target temperature or without kinetic energy to
    /// rescale.
    pub fn adjust_temperature(&self, env: &mut Environment) {
        let Some(target) = self.target else { return };

        let current = env.temperature(DVec3::ZERO);
        if current <= 0.0 {
            return;
        }
        let diff = (target - current).clamp(-self.max_change, self.max_change);
        let new_temp = current + diff;
        if new_temp == current {
            return;
        }
        let beta = (new_temp / current).sqrt();
        tracing::debug!(current, new_temp, beta, "thermostat adjustment");
        env.scale_thermal_velocity(beta, DVec3::ZERO);
    }

    pub fn initial_temperature(&self) -> Option<f64> {
        self.init
    }

    pub fn target_temperature(&self) -> Option<f64> {
        self.target
    }
}
