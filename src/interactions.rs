//! Pair potentials, mixing rules, and the per-type force registry.
//!
//! Each particle type is bound to one [`PairPotential`]. At build time the
//! registry produces a dense cross-type table by applying the mixing rules
//! (Lorentz-Berthelot for Lennard-Jones, geometric mean for inverse-square)
//! and records the largest cutoff, which the environment checks against the
//! grid constant so that every interacting pair is covered by a linked cell
//! pair.
//!
//! Bonded harmonic springs (membranes) are registered per ordered id pair
//! and evaluated outside the linked cells.

use std::collections::{BTreeMap, HashMap};

use crate::error::ConfigError;
use crate::math::DVec3;
use crate::particle::{Particle, ParticleId};

/// Sentinel cutoff meaning "derive from the potential parameters":
/// `3 sigma` for Lennard-Jones, `10 g` for inverse-square.
pub const CUTOFF_AUTO: f64 = 0.0;

/// Cutoff for potentials that act at any range.
pub const NO_CUTOFF: f64 = f64::MAX;

/// A short-range pair interaction, evaluated along the inter-particle axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PairPotential {
    /// `24 eps / r^2 * (2 (sigma/r)^12 - (sigma/r)^6)` along the pair axis.
    LennardJones { epsilon: f64, sigma: f64, cutoff: f64 },
    /// `-g * m1 m2 / r^3 * diff`; gravity for `g > 0`, Coulomb-like for
    /// signed pre-factors.
    InverseSquare { g: f64, cutoff: f64 },
    /// `-k (r - r0) / r * diff`; used for bonded membrane springs.
    Harmonic { k: f64, rest_length: f64, cutoff: f64 },
    /// No interaction.
    None,
}

impl PairPotential {
    /// Lennard-Jones potential with the default `3 sigma` cutoff.
    pub fn lennard_jones(epsilon: f64, sigma: f64) -> Self {
        Self::lennard_jones_with_cutoff(epsilon, sigma, CUTOFF_AUTO)
    }

    pub fn lennard_jones_with_cutoff(epsilon: f64, sigma: f64, cutoff: f64) -> Self {
        let cutoff = if cutoff == CUTOFF_AUTO { 3.0 * sigma } else { cutoff };
        PairPotential::LennardJones { epsilon, sigma, cutoff }
    }

    /// Lennard-Jones truncated at its minimum `2^(1/6) sigma`, leaving only
    /// the repulsive branch. This is the ghost-wall form used by
    /// repulsive-force boundaries: the wall starts pushing once the mirror
    /// image comes closer than the potential minimum and the force is
    /// continuous (zero) at activation.
    pub fn lennard_jones_repulsive(epsilon: f64, sigma: f64) -> Self {
        PairPotential::LennardJones {
            epsilon,
            sigma,
            cutoff: 2f64.powf(1.0 / 6.0) * sigma,
        }
    }

    /// Inverse-square potential with the default `10 g` cutoff.
    pub fn inverse_square(g: f64) -> Self {
        Self::inverse_square_with_cutoff(g, CUTOFF_AUTO)
    }

    pub fn inverse_square_with_cutoff(g: f64, cutoff: f64) -> Self {
        let cutoff = if cutoff == CUTOFF_AUTO { 10.0 * g } else { cutoff };
        PairPotential::InverseSquare { g, cutoff }
    }

    pub fn harmonic(k: f64, rest_length: f64, cutoff: f64) -> Self {
        PairPotential::Harmonic { k, rest_length, cutoff }
    }

    /// Interaction range of this potential.
    pub fn cutoff(&self) -> f64 {
        match *self {
            PairPotential::LennardJones { cutoff, .. }
            | PairPotential::InverseSquare { cutoff, .. }
            | PairPotential::Harmonic { cutoff, .. } => cutoff,
            PairPotential::None => 0.0,
        }
    }

    /// Force exerted on the pair, following the convention of the force
    /// accumulation loop: the returned vector is subtracted from the first
    /// particle's force and added to the second's.
    ///
    /// `diff` is the (possibly wrap-corrected) displacement `p2 - p1`.
    pub fn evaluate(&self, diff: DVec3, mass1: f64, mass2: f64) -> DVec3 {
        match *self {
            PairPotential::LennardJones { epsilon, sigma, cutoff } => {
                let dist_squared = diff.length_squared();
                if dist_squared > cutoff * cutoff {
                    return DVec3::ZERO;
                }
                let inv_r2 = 1.0 / dist_squared;
                let sigma_r2 = (sigma * sigma) * inv_r2;
                let sigma_r6 = sigma_r2 * sigma_r2 * sigma_r2;
                let sigma_r12 = sigma_r6 * sigma_r6;
                let scalar = 24.0 * epsilon * inv_r2 * (2.0 * sigma_r12 - sigma_r6);
                scalar * diff
            }
            PairPotential::InverseSquare { g, cutoff } => {
                let dist = diff.length();
                if dist > cutoff {
                    return DVec3::ZERO;
                }
                let f_mag = mass1 * mass2 / (dist * dist * dist);
                -g * f_mag * diff
            }
            PairPotential::Harmonic { k, rest_length, cutoff } => {
                let dist = diff.length();
                if dist > cutoff {
                    return DVec3::ZERO;
                }
                let f_mag = k * (dist - rest_length) / dist;
                -f_mag * diff
            }
            PairPotential::None => DVec3::ZERO,
        }
    }

    /// Cross-type potential produced from two per-type potentials.
    ///
    /// Lennard-Jones pairs mix via Lorentz-Berthelot (`eps = sqrt(e1 e2)`,
    /// `sigma = (s1 + s2) / 2`), inverse-square pairs via the geometric mean
    /// of the pre-factors; the cutoff is the maximum of the two. Potentials
    /// of different kinds cannot interact.
    fn mix(a: &PairPotential, b: &PairPotential) -> Option<PairPotential> {
        match (*a, *b) {
            (
                PairPotential::LennardJones { epsilon: e1, sigma: s1, cutoff: c1 },
                PairPotential::LennardJones { epsilon: e2, sigma: s2, cutoff: c2 },
            ) => Some(PairPotential::LennardJones {
                epsilon: (e1 * e2).sqrt(),
                sigma: (s1 + s2) / 2.0,
                cutoff: c1.max(c2),
            }),
            (
                PairPotential::InverseSquare { g: g1, cutoff: c1 },
                PairPotential::InverseSquare { g: g2, cutoff: c2 },
            ) => Some(PairPotential::InverseSquare {
                g: (g1 * g2).sqrt(),
                cutoff: c1.max(c2),
            }),
            (PairPotential::None, _) | (_, PairPotential::None) => Some(PairPotential::None),
            _ => None,
        }
    }
}

/// A harmonic spring bonded to a specific particle pair.
#[derive(Clone, Copy, Debug)]
pub struct BondedSpring {
    pub first: ParticleId,
    pub second: ParticleId,
    pub potential: PairPotential,
}

/// Per-type pair forces plus the mixed cross-type table.
#[derive(Debug, Default)]
pub struct ForceRegistry {
    /// Registered per-type potentials, ordered for deterministic builds.
    per_type: BTreeMap<u32, PairPotential>,
    /// Maps a type key to its row/column in `table`.
    type_index: HashMap<u32, usize>,
    /// Dense `n x n` cross-type table, filled by `build`.
    table: Vec<PairPotential>,
    springs: Vec<BondedSpring>,
    cutoff: f64,
}

impl ForceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a potential to a particle type. Replaces any previous binding.
    pub fn set_force(&mut self, type_id: u32, potential: PairPotential) {
        self.per_type.insert(type_id, potential);
    }

    /// Registers a bonded spring between two particles.
    pub fn add_spring(&mut self, first: ParticleId, second: ParticleId, potential: PairPotential) {
        self.springs.push(BondedSpring { first, second, potential });
    }

    /// Resolves the cross-type table and the global cutoff.
    pub(crate) fn build(&mut self) -> Result<(), ConfigError> {
        let types: Vec<u32> = self.per_type.keys().copied().collect();
        let n = types.len();
        self.type_index = types.iter().enumerate().map(|(i, t)| (*t, i)).collect();
        self.table = vec![PairPotential::None; n * n];
        self.cutoff = 0.0;

        for (i, t1) in types.iter().enumerate() {
            for (j, t2) in types.iter().enumerate() {
                let mixed = if i == j {
                    self.per_type[t1]
                } else {
                    PairPotential::mix(&self.per_type[t1], &self.per_type[t2])
                        .ok_or(ConfigError::UnmixablePotentials(*t1, *t2))?
                };
                self.cutoff = self.cutoff.max(mixed.cutoff().min(NO_CUTOFF));
                self.table[i * n + j] = mixed;
            }
        }
        Ok(())
    }

    /// Largest cutoff over all (mixed) type pairs.
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Whether any potential has been registered.
    pub fn is_empty(&self) -> bool {
        self.per_type.is_empty()
    }

    pub fn springs(&self) -> &[BondedSpring] {
        &self.springs
    }

    /// Evaluates the pair force for two particles given their wrap-corrected
    /// displacement. An unregistered type is a programmer bug (the build
    /// validated the population) and aborts.
    pub fn evaluate(&self, diff: DVec3, p1: &Particle, p2: &Particle) -> DVec3 {
        let n = self.per_type.len();
        let (i, j) = match (self.type_index.get(&p1.type_id), self.type_index.get(&p2.type_id)) {
            (Some(&i), Some(&j)) => (i, j),
            _ => {
                tracing::error!(
                    type1 = p1.type_id,
                    type2 = p2.type_id,
                    "pair force requested for an unregistered particle type"
                );
                panic!("unregistered particle type in force evaluation");
            }
        };
        self.table[i * n + j].evaluate(diff, p1.mass, p2.mass)
    }

    /// Whether the given type has a registered potential.
    pub fn has_type(&self, type_id: u32) -> bool {
        self.per_type.contains_key(&type_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lennard_jones_defaults_to_three_sigma_cutoff() {
        let lj = PairPotential::lennard_jones(1.0, 1.2);
        assert_eq!(lj.cutoff(), 3.6);
    }

    #[test]
    fn lennard_jones_is_repulsive_below_the_well() {
        let lj = PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 3.0);
        // r = 1 is inside the repulsive wall: the returned vector points from
        // p1 towards p2, and the accumulation convention (p1 -= F) pushes p1
        // away.
        let f = lj.evaluate(DVec3::new(1.0, 0.0, 0.0), 1.0, 1.0);
        assert!(f.x > 0.0);
    }

    #[test]
    fn lennard_jones_vanishes_beyond_cutoff() {
        let lj = PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 2.5);
        assert_eq!(lj.evaluate(DVec3::new(2.6, 0.0, 0.0), 1.0, 1.0), DVec3::ZERO);
    }

    #[test]
    fn inverse_square_attracts() {
        let inv = PairPotential::inverse_square(1.0);
        let f = inv.evaluate(DVec3::new(2.0, 0.0, 0.0), 3.0, 5.0);
        // p1 -= F moves p1 towards p2.
        assert!(f.x < 0.0);
        let expected = 3.0 * 5.0 / 8.0 * 2.0;
        assert!((f.x + expected).abs() < 1e-12);
    }

    #[test]
    fn harmonic_restores_towards_rest_length() {
        let spring = PairPotential::harmonic(2.0, 1.0, NO_CUTOFF);
        // Stretched: pulls the pair together.
        let stretched = spring.evaluate(DVec3::new(2.0, 0.0, 0.0), 1.0, 1.0);
        assert!(stretched.x < 0.0);
        // Compressed: pushes apart.
        let compressed = spring.evaluate(DVec3::new(0.5, 0.0, 0.0), 1.0, 1.0);
        assert!(compressed.x > 0.0);
    }

    #[test]
    fn lorentz_berthelot_mixing() {
        let mut registry = ForceRegistry::new();
        registry.set_force(0, PairPotential::lennard_jones_with_cutoff(4.0, 1.0, 3.0));
        registry.set_force(1, PairPotential::lennard_jones_with_cutoff(1.0, 2.0, 4.0));
        registry.build().unwrap();
        assert_eq!(registry.cutoff(), 4.0);

        let p1 = Particle::new(0, DVec3::ZERO, DVec3::ZERO, 1.0, 0, crate::ParticleState::Alive, DVec3::ZERO);
        let p2 = Particle::new(1, DVec3::ZERO, DVec3::ZERO, 1.0, 1, crate::ParticleState::Alive, DVec3::ZERO);
        // eps_mix = sqrt(4*1) = 2, sigma_mix = 1.5: compare against a
        // directly-constructed mixed potential.
        let mixed = PairPotential::lennard_jones_with_cutoff(2.0, 1.5, 4.0);
        let diff = DVec3::new(1.7, 0.0, 0.0);
        assert_eq!(registry.evaluate(diff, &p1, &p2), mixed.evaluate(diff, 1.0, 1.0));
    }

    #[test]
    fn mixing_different_kinds_fails_at_build() {
        let mut registry = ForceRegistry::new();
        registry.set_force(0, PairPotential::lennard_jones(1.0, 1.0));
        registry.set_force(1, PairPotential::inverse_square(1.0));
        assert!(matches!(
            registry.build(),
            Err(ConfigError::UnmixablePotentials(0, 1))
        ));
    }
}
