//! The simulation environment: particle store, domain, grid, and forces.
//!
//! An environment is populated and configured first (`add_*` / `set_*`),
//! then finalised exactly once with [`Environment::build`], which validates
//! the configuration, resolves sentinels, builds the force table and the
//! linked-cell grid. After the build only per-step particle state mutates;
//! the registry and the grid's cell map are immutable.

use crate::boundary::{face_axis, face_is_high, Boundary, BoundaryRule};
use crate::effects::ConstantForce;
use crate::error::ConfigError;
use crate::interactions::{ForceRegistry, PairPotential};
use crate::math::{
    wrap_diff, DVec3, UVec3, CENTER_BOUNDARY_ORIGIN, GRID_CONSTANT_AUTO, MAX_EXTENT,
};
use crate::particle::{Particle, ParticleId, ParticleState};
use crate::spatial::{CellPair, ParticleGrid, Periodicity, OUTSIDE_CELL};
use crate::thermostat::maxwell_boltzmann;

/// Spatial dimensionality of a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimension {
    Two,
    Three,
    /// Derive from the population: two unless any particle has a z
    /// component in position or velocity.
    Infer,
}

impl Dimension {
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            2 => Some(Dimension::Two),
            3 => Some(Dimension::Three),
            -1 => Some(Dimension::Infer),
            _ => None,
        }
    }
}

/// An axis-aligned lattice of particles.
#[derive(Clone, Debug)]
pub struct CuboidSpec {
    /// Lower left front corner.
    pub origin: DVec3,
    /// Initial velocity of every particle, before thermal noise.
    pub velocity: DVec3,
    /// Particles along each axis.
    pub count: UVec3,
    /// Lattice spacing.
    pub width: f64,
    pub mass: f64,
    /// Scale of the Maxwell-Boltzmann noise added to the velocity.
    pub thermal_v: f64,
    pub type_id: u32,
    pub dimension: Dimension,
    pub state: ParticleState,
}

/// A ball of lattice points.
#[derive(Clone, Debug)]
pub struct SphereSpec {
    /// Center.
    pub origin: DVec3,
    pub velocity: DVec3,
    /// Radius in lattice points.
    pub radius: u32,
    pub width: f64,
    pub mass: f64,
    pub thermal_v: f64,
    pub type_id: u32,
    /// Must be explicit; a sphere cannot infer its dimensionality.
    pub dimension: Dimension,
    pub state: ParticleState,
}

/// A 2-D sheet of particles joined by harmonic springs between all
/// eight-neighbours of the mesh.
#[derive(Clone, Debug)]
pub struct MembraneSpec {
    pub origin: DVec3,
    pub velocity: DVec3,
    /// `count.z` must be 1.
    pub count: UVec3,
    pub width: f64,
    pub mass: f64,
    /// Spring stiffness.
    pub stiffness: f64,
    /// Spring cutoff.
    pub cutoff: f64,
    pub type_id: u32,
}

/// The façade composing particles, boundary, grid, and forces.
pub struct Environment {
    pub(crate) particles: Vec<Particle>,
    pub(crate) boundary: Boundary,
    pub(crate) grid: ParticleGrid,
    pub(crate) forces: ForceRegistry,
    dimension: Dimension,
    grid_constant: f64,
    built: bool,
    stationary: usize,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
            boundary: Boundary::new(),
            // Placeholder; replaced during build.
            grid: ParticleGrid::build(&Boundary::new(), MAX_EXTENT, &mut []),
            forces: ForceRegistry::new(),
            dimension: Dimension::Infer,
            grid_constant: GRID_CONSTANT_AUTO,
            built: false,
            stationary: 0,
        }
    }

    fn ensure_unbuilt(&self) -> Result<(), ConfigError> {
        if self.built {
            Err(ConfigError::AlreadyBuilt)
        } else {
            Ok(())
        }
    }

    /// Binds a pair potential to a particle type.
    pub fn set_force(&mut self, potential: PairPotential, type_id: u32) -> Result<(), ConfigError> {
        self.ensure_unbuilt()?;
        self.forces.set_force(type_id, potential);
        Ok(())
    }

    pub fn set_boundary(&mut self, boundary: Boundary) -> Result<(), ConfigError> {
        self.ensure_unbuilt()?;
        self.boundary = boundary;
        Ok(())
    }

    /// Desired cell side length; [`GRID_CONSTANT_AUTO`] derives it from the
    /// force cutoff.
    pub fn set_grid_constant(&mut self, grid_constant: f64) -> Result<(), ConfigError> {
        self.ensure_unbuilt()?;
        self.grid_constant = grid_constant;
        Ok(())
    }

    pub fn set_dimension(&mut self, dimension: Dimension) -> Result<(), ConfigError> {
        self.ensure_unbuilt()?;
        self.dimension = dimension;
        Ok(())
    }

    /// Appends one particle; returns its id.
    pub fn add_particle(
        &mut self,
        position: DVec3,
        velocity: DVec3,
        mass: f64,
        type_id: u32,
    ) -> Result<ParticleId, ConfigError> {
        self.add_particle_with_force(position, velocity, mass, type_id, ParticleState::Alive, DVec3::ZERO)
    }

    pub fn add_particle_with_state(
        &mut self,
        position: DVec3,
        velocity: DVec3,
        mass: f64,
        type_id: u32,
        state: ParticleState,
    ) -> Result<ParticleId, ConfigError> {
        self.add_particle_with_force(position, velocity, mass, type_id, state, DVec3::ZERO)
    }

    /// Full form used when resuming from a checkpoint: the stored force
    /// becomes the step's `old_force` through the first force rotation.
    pub fn add_particle_with_force(
        &mut self,
        position: DVec3,
        velocity: DVec3,
        mass: f64,
        type_id: u32,
        state: ParticleState,
        force: DVec3,
    ) -> Result<ParticleId, ConfigError> {
        self.ensure_unbuilt()?;
        let id = self.particles.len();
        self.particles
            .push(Particle::new(id, position, velocity, mass, type_id, state, force));
        if state == ParticleState::Stationary {
            self.stationary += 1;
        }
        tracing::trace!(id, ?position, ?velocity, mass, type_id, "particle added");
        Ok(id)
    }

    /// Emits `count.x * count.y * count.z` particles on an axis-aligned
    /// lattice, adding Maxwell-Boltzmann noise to the velocity.
    pub fn add_cuboid(&mut self, cuboid: &CuboidSpec) -> Result<(), ConfigError> {
        self.ensure_unbuilt()?;
        let count = cuboid.count;
        if count.x == 0 || count.y == 0 || count.z == 0 {
            return Err(ConfigError::EmptyLattice(count));
        }
        let dim = match cuboid.dimension {
            Dimension::Two => 2,
            Dimension::Three => 3,
            Dimension::Infer => {
                if count.z == 1 {
                    2
                } else {
                    3
                }
            }
        };
        self.particles.reserve((count.x * count.y * count.z) as usize);
        let mut rng = rand::thread_rng();
        for x in 0..count.x {
            for y in 0..count.y {
                for z in 0..count.z {
                    let position = cuboid.origin
                        + cuboid.width * DVec3::new(x as f64, y as f64, z as f64);
                    let velocity =
                        cuboid.velocity + maxwell_boltzmann(cuboid.thermal_v, dim, &mut rng);
                    self.add_particle_with_state(
                        position,
                        velocity,
                        cuboid.mass,
                        cuboid.type_id,
                        cuboid.state,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Emits every lattice point within `radius * width` of the center.
    pub fn add_sphere(&mut self, sphere: &SphereSpec) -> Result<(), ConfigError> {
        self.ensure_unbuilt()?;
        let dim = match sphere.dimension {
            Dimension::Two => 2,
            Dimension::Three => 3,
            Dimension::Infer => return Err(ConfigError::SphereNeedsDimension),
        };
        let radius = sphere.radius as i32;
        let mut rng = rand::thread_rng();
        for x in -radius..=radius {
            for y in -radius..=radius {
                for z in -radius..=radius {
                    if dim == 2 && z != 0 {
                        continue;
                    }
                    let offset = sphere.width * DVec3::new(x as f64, y as f64, z as f64);
                    if offset.length() <= sphere.radius as f64 * sphere.width {
                        let velocity =
                            sphere.velocity + maxwell_boltzmann(sphere.thermal_v, dim, &mut rng);
                        self.add_particle_with_state(
                            sphere.origin + offset,
                            velocity,
                            sphere.mass,
                            sphere.type_id,
                            sphere.state,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Emits a 2-D particle mesh and registers harmonic springs between all
    /// eight-neighbours, with rest length equal to the initial distance.
    pub fn add_membrane(&mut self, membrane: &MembraneSpec) -> Result<(), ConfigError> {
        self.ensure_unbuilt()?;
        let count = membrane.count;
        if count.x == 0 || count.y == 0 || count.z == 0 {
            return Err(ConfigError::EmptyLattice(count));
        }
        if count.z != 1 {
            return Err(ConfigError::MembraneNotPlanar(count));
        }

        let index = |x: u32, y: u32| (x + count.x * y) as usize;
        let mut ids = vec![0; (count.x * count.y) as usize];
        for x in 0..count.x {
            for y in 0..count.y {
                let position =
                    membrane.origin + membrane.width * DVec3::new(x as f64, y as f64, 0.0);
                ids[index(x, y)] = self.add_particle(
                    position,
                    membrane.velocity,
                    membrane.mass,
                    membrane.type_id,
                )?;
            }
        }

        // Forward half of the eight-neighbour stencil; each bond once.
        const MESH_NEIGHBOURS: [(i64, i64); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];
        for x in 0..count.x as i64 {
            for y in 0..count.y as i64 {
                for (dx, dy) in MESH_NEIGHBOURS {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= count.x as i64 || ny >= count.y as i64 {
                        continue;
                    }
                    let id1 = ids[index(x as u32, y as u32)];
                    let id2 = ids[index(nx as u32, ny as u32)];
                    let rest =
                        (self.particles[id1].position - self.particles[id2].position).length();
                    self.forces.add_spring(
                        id1,
                        id2,
                        PairPotential::harmonic(membrane.stiffness, rest, membrane.cutoff),
                    );
                }
            }
        }
        Ok(())
    }

    /// Finalises the environment: validates the boundary and population,
    /// resolves sentinels, builds the force table and the grid.
    pub fn build(&mut self) -> Result<(), ConfigError> {
        self.ensure_unbuilt()?;
        tracing::info!(particles = self.particles.len(), "building environment");

        if self.boundary.extent.x < 0.0 || self.boundary.extent.y < 0.0 || self.boundary.extent.z < 0.0
        {
            return Err(ConfigError::NegativeExtent(self.boundary.extent));
        }
        for axis in 0..3 {
            if self.boundary.origin[axis] == CENTER_BOUNDARY_ORIGIN {
                self.boundary.origin[axis] = -self.boundary.extent[axis] / 2.0;
            }
        }
        for particle in &self.particles {
            if !self.boundary.contains(particle.position) {
                return Err(ConfigError::ParticleOutOfDomain {
                    id: particle.id,
                    position: particle.position,
                });
            }
        }
        if self.boundary.requires_force() && self.boundary.boundary_force().is_none() {
            return Err(ConfigError::MissingBoundaryForce);
        }

        // Types without a registered potential do not interact.
        for particle in &self.particles {
            if !self.forces.has_type(particle.type_id) {
                self.forces.set_force(particle.type_id, PairPotential::None);
            }
        }
        self.forces.build()?;

        if self.grid_constant != GRID_CONSTANT_AUTO && self.grid_constant < self.forces.cutoff() {
            return Err(ConfigError::GridConstantBelowCutoff {
                grid_constant: self.grid_constant,
                cutoff: self.forces.cutoff(),
            });
        }
        if self.grid_constant == GRID_CONSTANT_AUTO {
            let unbounded = self.boundary.extent == DVec3::splat(MAX_EXTENT);
            self.grid_constant = if unbounded { MAX_EXTENT } else { self.forces.cutoff() };
            tracing::debug!(grid_constant = self.grid_constant, "grid constant resolved");
        }
        if self.grid_constant <= 0.0 {
            return Err(ConfigError::NonPositiveGridConstant(self.grid_constant));
        }

        if self.dimension == Dimension::Infer {
            let flat = self
                .particles
                .iter()
                .all(|p| p.position.z == 0.0 && p.velocity.z == 0.0);
            self.dimension = if flat { Dimension::Two } else { Dimension::Three };
        }

        self.grid = ParticleGrid::build(&self.boundary, self.grid_constant, &mut self.particles);
        self.built = true;
        tracing::info!("environment built");
        Ok(())
    }

    /// Builds the spatial-decomposition block sets for `target_threads`
    /// workers. Requires a built environment; idempotent otherwise.
    pub fn build_blocks(&mut self, target_threads: usize) {
        let periodic = [
            self.boundary.is_periodic(0),
            self.boundary.is_periodic(1),
            self.boundary.is_periodic(2),
        ];
        self.grid.build_blocks(target_threads, periodic);
    }

    /// Pair force between two particles using the wrap-aware displacement of
    /// their cell pair. Zero when both particles are stationary.
    pub fn force(&self, p1: &Particle, p2: &Particle, pair: &CellPair) -> DVec3 {
        pair_force(self.boundary.extent, &self.forces, p1, p2, pair.periodicity)
    }

    /// Applies the boundary rules to one particle, using its current cell
    /// and the cell of its pre-step position.
    pub fn apply_boundary(&mut self, id: ParticleId) {
        let particle = &mut self.particles[id];
        if particle.state != ParticleState::Alive {
            return;
        }

        // Resolve outside crossings face by face; a corner exit of a fully
        // periodic box needs one teleport per axis, a fast particle may need
        // several along one axis.
        let mut rounds = 0;
        while self.grid.cell(particle.cell).kind.is_outside() {
            rounds += 1;
            if rounds > 8 {
                tracing::error!(id, position = ?particle.position, "particle stuck outside the domain");
                panic!("unresolvable boundary crossing for particle {id}");
            }
            let Some(face) = self
                .boundary
                .crossed_face(particle.old_position, particle.position)
            else {
                break;
            };
            match self.boundary.rule_on(face) {
                BoundaryRule::Outflow => {
                    self.grid.remove_particle(id, particle.cell);
                    particle.cell = OUTSIDE_CELL;
                    particle.state = ParticleState::Dead;
                    tracing::trace!(id, "particle left the domain");
                    return;
                }
                BoundaryRule::Periodic => {
                    let axis = face_axis(face);
                    let lo = self.boundary.origin[axis];
                    let extent = self.boundary.extent[axis];
                    while particle.position[axis] >= lo + extent {
                        particle.position[axis] -= extent;
                    }
                    while particle.position[axis] < lo {
                        particle.position[axis] += extent;
                    }
                    let new_cell = self.grid.what_cell(particle.position);
                    self.grid.update_cells(id, particle.cell, new_cell);
                    particle.cell = new_cell;
                }
                // A particle that tunnelled through a repulsive wall is
                // reflected back instead of being lost.
                BoundaryRule::VelocityReflection | BoundaryRule::RepulsiveForce => {
                    let axis = face_axis(face);
                    let plane = self.boundary.face_plane(face);
                    particle.velocity[axis] = -particle.velocity[axis];
                    particle.position[axis] = 2.0 * plane - particle.position[axis];
                    let new_cell = self.grid.what_cell(particle.position);
                    self.grid.update_cells(id, particle.cell, new_cell);
                    particle.cell = new_cell;
                }
            }
        }

        // Ghost-wall repulsion while inside a boundary cell: the boundary
        // potential evaluated against the mirror image across each
        // repulsive face the cell touches.
        let kind = self.grid.cell(particle.cell).kind;
        if kind.is_boundary() {
            if let Some(potential) = self.boundary.boundary_force() {
                for face in kind.faces() {
                    if self.boundary.rule_on(face) != BoundaryRule::RepulsiveForce {
                        continue;
                    }
                    let axis = face_axis(face);
                    let plane = self.boundary.face_plane(face);
                    let dist = (plane - particle.position[axis]).abs();
                    if dist == 0.0 {
                        continue;
                    }
                    let mut diff = DVec3::ZERO;
                    diff[axis] = if face_is_high(face) { 2.0 * dist } else { -2.0 * dist };
                    let ghost = potential.evaluate(diff, particle.mass, particle.mass);
                    particle.force -= ghost;
                }
            }
        }
    }

    /// Kinetic temperature `sum m |v - mean|^2 / (dim * n_alive)`.
    /// Zero when no particle is alive.
    pub fn temperature(&self, mean_velocity: DVec3) -> f64 {
        let alive = self.alive_count();
        if alive == 0 {
            return 0.0;
        }
        let energy: f64 = self
            .particles
            .iter()
            .filter(|p| p.state == ParticleState::Alive)
            .map(|p| p.mass * (p.velocity - mean_velocity).length_squared())
            .sum();
        energy / (self.dim() * alive) as f64
    }

    /// Mean velocity of the alive population.
    pub fn average_velocity(&self) -> DVec3 {
        let alive = self.alive_count();
        if alive == 0 {
            return DVec3::ZERO;
        }
        let sum: DVec3 = self
            .particles
            .iter()
            .filter(|p| p.state == ParticleState::Alive)
            .map(|p| p.velocity)
            .fold(DVec3::ZERO, |acc, v| acc + v);
        sum / alive as f64
    }

    /// Scales alive velocities about `mean`: `v <- scalar (v - mean) + mean`.
    pub fn scale_thermal_velocity(&mut self, scalar: f64, mean: DVec3) {
        for particle in &mut self.particles {
            if particle.state == ParticleState::Alive {
                particle.velocity = scalar * (particle.velocity - mean) + mean;
            }
        }
    }

    pub fn alive_count(&self) -> usize {
        self.grid.particle_count() - self.stationary
    }

    pub fn stationary_count(&self) -> usize {
        self.stationary
    }

    pub fn dead_count(&self) -> usize {
        self.particles.len() - self.grid.particle_count()
    }

    pub fn total_count(&self) -> usize {
        self.particles.len()
    }

    /// Dimensionality as a number; meaningful after build when inference has
    /// been resolved.
    pub fn dim(&self) -> usize {
        match self.dimension {
            Dimension::Two => 2,
            _ => 3,
        }
    }

    pub fn extent(&self) -> DVec3 {
        self.boundary.extent
    }

    pub fn origin(&self) -> DVec3 {
        self.boundary.origin
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn grid(&self) -> &ParticleGrid {
        &self.grid
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// All linked cell pairs.
    pub fn linked_cells(&self) -> &[CellPair] {
        self.grid.cell_pairs()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Fixes the marked id set of an external force against the current
    /// population.
    pub fn mark_external_force(&self, force: &mut ConstantForce) {
        force.mark_particles(&self.particles);
    }
}

impl std::ops::Index<ParticleId> for Environment {
    type Output = Particle;
    fn index(&self, id: ParticleId) -> &Particle {
        &self.particles[id]
    }
}

impl std::ops::IndexMut<ParticleId> for Environment {
    fn index_mut(&mut self, id: ParticleId) -> &mut Particle {
        &mut self.particles[id]
    }
}

/// Wrap-aware pair force shared by the façade and the parallel force loops.
pub(crate) fn pair_force(
    extent: DVec3,
    forces: &ForceRegistry,
    p1: &Particle,
    p2: &Particle,
    periodicity: Periodicity,
) -> DVec3 {
    if p1.state == ParticleState::Stationary && p2.state == ParticleState::Stationary {
        return DVec3::ZERO;
    }
    let mut diff = p2.position - p1.position;
    if periodicity.intersects(Periodicity::X) {
        diff.x = wrap_diff(p1.position.x, p2.position.x, extent.x);
    }
    if periodicity.intersects(Periodicity::Y) {
        diff.y = wrap_diff(p1.position.y, p2.position.y, extent.y);
    }
    if periodicity.intersects(Periodicity::Z) {
        diff.z = wrap_diff(p1.position.z, p2.position.z, extent.z);
    }
    forces.evaluate(diff, p1, p2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded(extent: DVec3, rule: BoundaryRule) -> Boundary {
        let mut b = Boundary::new();
        b.origin = DVec3::ZERO;
        b.extent = extent;
        b.set_rule(rule);
        b
    }

    #[test]
    fn cuboid_emits_a_lattice() {
        let mut env = Environment::new();
        env.set_boundary(bounded(DVec3::new(10.0, 10.0, 10.0), BoundaryRule::Outflow))
            .unwrap();
        env.add_cuboid(&CuboidSpec {
            origin: DVec3::new(1.0, 1.0, 1.0),
            velocity: DVec3::ZERO,
            count: UVec3::new(3, 2, 1),
            width: 1.0,
            mass: 1.0,
            thermal_v: 0.0,
            type_id: 0,
            dimension: Dimension::Infer,
            state: ParticleState::Alive,
        })
        .unwrap();
        assert_eq!(env.total_count(), 6);
        assert_eq!(env.particles()[0].position, DVec3::new(1.0, 1.0, 1.0));
        assert_eq!(env.particles()[5].position, DVec3::new(3.0, 2.0, 1.0));
    }

    #[test]
    fn cuboid_rejects_zero_counts() {
        let mut env = Environment::new();
        let result = env.add_cuboid(&CuboidSpec {
            origin: DVec3::ZERO,
            velocity: DVec3::ZERO,
            count: UVec3::new(3, 0, 1),
            width: 1.0,
            mass: 1.0,
            thermal_v: 0.0,
            type_id: 0,
            dimension: Dimension::Infer,
            state: ParticleState::Alive,
        });
        assert!(matches!(result, Err(ConfigError::EmptyLattice(_))));
    }

    #[test]
    fn sphere_keeps_lattice_points_within_radius() {
        let mut env = Environment::new();
        env.add_sphere(&SphereSpec {
            origin: DVec3::new(5.0, 5.0, 0.0),
            velocity: DVec3::ZERO,
            radius: 2,
            width: 1.0,
            mass: 1.0,
            thermal_v: 0.0,
            type_id: 0,
            dimension: Dimension::Two,
            state: ParticleState::Alive,
        })
        .unwrap();
        // 2-D disc of radius 2 on the unit lattice: 13 points.
        assert_eq!(env.total_count(), 13);
        for p in env.particles() {
            assert!((p.position - DVec3::new(5.0, 5.0, 0.0)).length() <= 2.0 + 1e-12);
        }
    }

    #[test]
    fn membrane_registers_springs_between_mesh_neighbours() {
        let mut env = Environment::new();
        env.add_membrane(&MembraneSpec {
            origin: DVec3::ZERO,
            velocity: DVec3::ZERO,
            count: UVec3::new(3, 3, 1),
            width: 2.2,
            mass: 1.0,
            stiffness: 300.0,
            cutoff: 5.0,
            type_id: 0,
        })
        .unwrap();
        assert_eq!(env.total_count(), 9);
        // 3x3 mesh: 12 axial bonds + 8 diagonal bonds.
        assert_eq!(env.forces.springs().len(), 20);
        let diagonal = env
            .forces
            .springs()
            .iter()
            .filter(|s| match s.potential {
                PairPotential::Harmonic { rest_length, .. } => {
                    (rest_length - 2.2 * std::f64::consts::SQRT_2).abs() < 1e-12
                }
                _ => false,
            })
            .count();
        assert_eq!(diagonal, 8);
    }

    #[test]
    fn build_validates_particles_inside_the_domain() {
        let mut env = Environment::new();
        env.set_boundary(bounded(DVec3::new(10.0, 10.0, 1.0), BoundaryRule::Outflow))
            .unwrap();
        env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 2.5), 0)
            .unwrap();
        env.add_particle(DVec3::new(11.0, 5.0, 0.0), DVec3::ZERO, 1.0, 0)
            .unwrap();
        assert!(matches!(
            env.build(),
            Err(ConfigError::ParticleOutOfDomain { id: 0, .. })
        ));
    }

    #[test]
    fn build_rejects_a_grid_constant_below_the_cutoff() {
        let mut env = Environment::new();
        env.set_boundary(bounded(DVec3::new(10.0, 10.0, 1.0), BoundaryRule::Outflow))
            .unwrap();
        env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 3.0), 0)
            .unwrap();
        env.set_grid_constant(2.0).unwrap();
        env.add_particle(DVec3::new(5.0, 5.0, 0.5), DVec3::ZERO, 1.0, 0)
            .unwrap();
        assert!(matches!(
            env.build(),
            Err(ConfigError::GridConstantBelowCutoff { .. })
        ));
    }

    #[test]
    fn build_centers_a_sentinel_origin() {
        let mut env = Environment::new();
        let mut boundary = Boundary::new();
        boundary.extent = DVec3::new(10.0, 10.0, 10.0);
        env.set_boundary(boundary).unwrap();
        env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 2.5), 0)
            .unwrap();
        env.add_particle(DVec3::ZERO, DVec3::ZERO, 1.0, 0).unwrap();
        env.build().unwrap();
        assert_eq!(env.origin(), DVec3::new(-5.0, -5.0, -5.0));
    }

    #[test]
    fn stationary_pairs_exert_no_force() {
        let mut env = Environment::new();
        env.set_boundary(bounded(DVec3::new(10.0, 10.0, 1.0), BoundaryRule::Outflow))
            .unwrap();
        env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 2.5), 0)
            .unwrap();
        env.add_particle_with_state(
            DVec3::new(4.0, 5.0, 0.0),
            DVec3::ZERO,
            1.0,
            0,
            ParticleState::Stationary,
        )
        .unwrap();
        env.add_particle_with_state(
            DVec3::new(5.0, 5.0, 0.0),
            DVec3::ZERO,
            1.0,
            0,
            ParticleState::Stationary,
        )
        .unwrap();
        env.build().unwrap();
        let pair = CellPair {
            first: 0,
            second: 0,
            periodicity: Periodicity::NONE,
        };
        let f = env.force(&env[0], &env[1], &pair);
        assert_eq!(f, DVec3::ZERO);
    }

    #[test]
    fn temperature_of_a_known_population() {
        let mut env = Environment::new();
        env.set_boundary(bounded(DVec3::new(10.0, 10.0, 1.0), BoundaryRule::Outflow))
            .unwrap();
        env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 2.5), 0)
            .unwrap();
        env.add_particle(DVec3::new(3.0, 5.0, 0.0), DVec3::new(2.0, 0.0, 0.0), 2.0, 0)
            .unwrap();
        env.add_particle(DVec3::new(7.0, 5.0, 0.0), DVec3::new(0.0, 2.0, 0.0), 2.0, 0)
            .unwrap();
        env.build().unwrap();
        // dim = 2, energy = 2*4 + 2*4 = 16, T = 16 / (2 * 2) = 4.
        assert_eq!(env.dim(), 2);
        assert!((env.temperature(DVec3::ZERO) - 4.0).abs() < 1e-12);
    }
}
