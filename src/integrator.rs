//! Stoermer-Verlet time integration.
//!
//! One step runs eight phases in strict order: position update, grid
//! migration, force rotation, boundary handling, pairwise force
//! accumulation, external forces, velocity update, thermostat. Only the two
//! force phases parallelise; everything else is single-threaded, which keeps
//! grid mutation and the outside-cell sink trivially race-free.
//!
//! Three execution strategies share identical step semantics and differ only
//! in how the pairwise phase is scheduled:
//! serial iteration, parallel iteration with per-cell locks, or parallel
//! iteration over the pre-coloured block sets.

use std::marker::PhantomData;
use std::time::Instant;

use rayon::prelude::*;

use crate::effects::ConstantForce;
use crate::environment::{pair_force, Environment};
use crate::error::ConfigError;
use crate::interactions::ForceRegistry;
use crate::io::OutputWriter;
use crate::math::DVec3;
use crate::particle::{Particle, ParticleId};
use crate::spatial::{CellPair, GridCell};
use crate::statistics::Statistics;
use crate::thermostat::Thermostat;

/// How the pairwise force phase is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// One thread walks the cell pairs in order.
    Serial,
    /// Cell pairs in parallel; each pair holds its cells' locks while
    /// writing member forces.
    CellLock,
    /// The coloured block sets in sequence; blocks within a set in parallel,
    /// lock-free by colour disjointness.
    SpatialDecomposition,
}

impl Strategy {
    /// Scenario-file strategy code (0..=2).
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Strategy::Serial),
            1 => Some(Strategy::CellLock),
            2 => Some(Strategy::SpatialDecomposition),
            _ => None,
        }
    }
}

/// Shared force accumulator for the parallel strategies.
///
/// Wraps the particle slice as a raw pointer so worker threads can
/// accumulate forces concurrently. Every write goes through
/// [`ForceWriter::add_force`], whose safety contract is exclusivity for the
/// target particle: the cell-lock strategy holds the owning cell's mutex,
/// the spatial-decomposition strategy relies on the colour sets never
/// sharing a cell within one parallel pass. Reads via
/// [`ForceWriter::particle`] only touch fields that no worker writes
/// (position, mass, type, state).
struct ForceWriter<'a> {
    particles: *mut Particle,
    len: usize,
    _marker: PhantomData<&'a mut [Particle]>,
}

unsafe impl Send for ForceWriter<'_> {}
unsafe impl Sync for ForceWriter<'_> {}

impl<'a> ForceWriter<'a> {
    fn new(particles: &'a mut [Particle]) -> Self {
        Self {
            particles: particles.as_mut_ptr(),
            len: particles.len(),
            _marker: PhantomData,
        }
    }

    /// # Safety
    /// The caller must guarantee no concurrent access to `id`'s force field,
    /// either by holding the owning cell's lock or by colour disjointness.
    #[inline]
    unsafe fn add_force(&self, id: ParticleId, delta: DVec3) {
        debug_assert!(id < self.len);
        let particle = &mut *self.particles.add(id);
        particle.force += delta;
    }

    /// # Safety
    /// The returned reference must only be used to read fields that are not
    /// written during the force phase.
    #[inline]
    unsafe fn particle(&self, id: ParticleId) -> &Particle {
        debug_assert!(id < self.len);
        &*self.particles.add(id)
    }
}

/// The Stoermer-Verlet driver.
///
/// Configure with the `with_*` builder methods, then run with
/// [`StoermerVerlet::simulate`] or [`StoermerVerlet::benchmark`].
pub struct StoermerVerlet {
    env: Environment,
    strategy: Strategy,
    thermostat: Thermostat,
    /// Steps between thermostat adjustments; 0 disables the thermostat hook.
    temp_adjust_freq: usize,
    external_forces: Vec<ConstantForce>,
    writer: Option<Box<dyn OutputWriter>>,
    statistics: Option<Box<dyn Statistics>>,
    /// Scratch id list for the boundary phase, reused across steps.
    boundary_scratch: Vec<ParticleId>,
}

impl StoermerVerlet {
    /// A serial integrator over a built environment.
    pub fn new(env: Environment) -> Self {
        assert!(
            env.is_built(),
            "the environment must be built before attaching the integrator"
        );
        Self {
            env,
            strategy: Strategy::Serial,
            thermostat: Thermostat::disabled(),
            temp_adjust_freq: 0,
            external_forces: Vec::new(),
            writer: None,
            statistics: None,
            boundary_scratch: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        if strategy == Strategy::SpatialDecomposition {
            self.env.build_blocks(rayon::current_num_threads());
        }
        self
    }

    /// Attaches a thermostat, adjusted every `freq` steps.
    pub fn with_thermostat(mut self, thermostat: Thermostat, freq: usize) -> Self {
        self.thermostat = thermostat;
        self.temp_adjust_freq = freq;
        self
    }

    /// Registers an external force; its marker is evaluated immediately.
    pub fn with_external_force(mut self, mut force: ConstantForce) -> Self {
        self.env.mark_external_force(&mut force);
        self.external_forces.push(force);
        self
    }

    pub fn with_writer(mut self, writer: Box<dyn OutputWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_statistics(mut self, statistics: Box<dyn Statistics>) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn into_env(self) -> Environment {
        self.env
    }

    /// Runs the simulation from `t_start` to `t_end`, writing output every
    /// `write_freq` steps (0 disables output).
    pub fn simulate(
        &mut self,
        t_start: f64,
        t_end: f64,
        dt: f64,
        write_freq: usize,
    ) -> Result<(), ConfigError> {
        let total_steps = ((t_end - t_start) / dt) as usize;
        tracing::info!(
            t_start,
            t_end,
            dt,
            total_steps,
            strategy = ?self.strategy,
            "simulation started"
        );

        let mut step_index = 0usize;
        let mut t = t_start;
        while t < t_end {
            self.step(step_index, dt, t);

            if write_freq > 0 && step_index % write_freq == 0 {
                if let Some(writer) = &mut self.writer {
                    tracing::debug!(step_index, t, "writing frame");
                    writer.plot(&self.env, step_index)?;
                }
            }
            if let Some(statistics) = &mut self.statistics {
                let freq = statistics.compute_freq();
                if freq > 0 && step_index % freq == 0 {
                    statistics.compute(&self.env, t)?;
                }
            }

            t += dt;
            step_index += 1;
        }

        tracing::info!("simulation ended");
        Ok(())
    }

    /// Benchmark mode: runs `repetitions` full simulations without per-step
    /// output and returns the mean wall-clock milliseconds.
    pub fn benchmark(&mut self, t_start: f64, t_end: f64, dt: f64, repetitions: usize) -> f64 {
        let mut total_ms = 0.0;
        for rep in 1..=repetitions {
            let start = Instant::now();
            let mut step_index = 0usize;
            let mut t = t_start;
            while t < t_end {
                self.step(step_index, dt, t);
                t += dt;
                step_index += 1;
            }
            let elapsed = start.elapsed().as_secs_f64() * 1e3;
            total_ms += elapsed;
            tracing::info!(
                rep,
                repetitions,
                elapsed_ms = elapsed,
                particles = self.env.total_count(),
                "benchmark repetition finished"
            );
        }
        let mean = total_ms / repetitions as f64;
        tracing::info!(mean_ms = mean, "benchmark finished");
        mean
    }

    /// One Stoermer-Verlet step.
    pub fn step(&mut self, step_index: usize, dt: f64, t: f64) {
        let env = &mut self.env;

        // Phase 1: position update for moving particles.
        for particle in env.particles.iter_mut() {
            if particle.state.is_moving() {
                particle.old_position = particle.position;
                particle.position += dt * particle.velocity
                    + dt * dt / (2.0 * particle.mass) * particle.force;
            }
        }

        // Phase 2: grid migration, single-threaded.
        for id in 0..env.particles.len() {
            let particle = &env.particles[id];
            if !particle.state.is_moving() {
                continue;
            }
            let new_cell = env.grid.what_cell(particle.position);
            if new_cell != particle.cell {
                env.grid.update_cells(id, particle.cell, new_cell);
                env.particles[id].cell = new_cell;
            }
        }

        // Phase 3: rotate force accumulators.
        for particle in env.particles.iter_mut() {
            if particle.state.in_grid() {
                particle.reset_force();
            }
        }

        // Phase 4: boundary handling. Membership of boundary cells changes
        // while rules run, so the affected ids are collected first.
        self.boundary_scratch.clear();
        for &slot in env.grid.boundary_cells() {
            self.boundary_scratch.extend_from_slice(&env.grid.cells()[slot].particles);
        }
        self.boundary_scratch
            .extend_from_slice(&env.grid.cells()[env.grid.outside_slot()].particles);
        for i in 0..self.boundary_scratch.len() {
            env.apply_boundary(self.boundary_scratch[i]);
        }

        // Phase 5: pairwise forces.
        match self.strategy {
            Strategy::Serial => step_forces_serial(env),
            Strategy::CellLock => step_forces_cell_lock(env),
            Strategy::SpatialDecomposition => step_forces_blocks(env),
        }
        step_forces_springs(env);

        // Phase 6: external forces.
        for force in &self.external_forces {
            for &id in force.marked() {
                force.apply(&mut env.particles[id], t);
            }
        }

        // Phase 7: velocity update.
        for particle in env.particles.iter_mut() {
            if particle.state.is_moving() {
                particle.velocity +=
                    dt / (2.0 * particle.mass) * (particle.force + particle.old_force);
            }
        }

        // Phase 8: thermostat.
        if self.temp_adjust_freq > 0 && step_index % self.temp_adjust_freq == 0 {
            self.thermostat.adjust_temperature(&mut self.env);
        }
    }
}

/// Newton-3 accumulation over one cell pair through the shared writer.
///
/// # Safety
/// Exclusive access to the member particles' force fields must be
/// guaranteed by the caller (cell locks or colour disjointness).
unsafe fn accumulate_pair(
    writer: &ForceWriter<'_>,
    cells: &[GridCell],
    pair: &CellPair,
    extent: DVec3,
    forces: &ForceRegistry,
) {
    if pair.first == pair.second {
        let members = &cells[pair.first].particles;
        for (i, &id1) in members.iter().enumerate() {
            for &id2 in &members[i + 1..] {
                let f = pair_force(
                    extent,
                    forces,
                    writer.particle(id1),
                    writer.particle(id2),
                    pair.periodicity,
                );
                writer.add_force(id1, -f);
                writer.add_force(id2, f);
            }
        }
    } else {
        for &id1 in &cells[pair.first].particles {
            for &id2 in &cells[pair.second].particles {
                let f = pair_force(
                    extent,
                    forces,
                    writer.particle(id1),
                    writer.particle(id2),
                    pair.periodicity,
                );
                writer.add_force(id1, -f);
                writer.add_force(id2, f);
            }
        }
    }
}

fn step_forces_serial(env: &mut Environment) {
    let extent = env.boundary.extent;
    let grid = &env.grid;
    let forces = &env.forces;
    let particles = &mut env.particles;

    for pair in grid.cell_pairs() {
        let (c1, c2) = (pair.first, pair.second);
        if grid.cells()[c1].particles.is_empty() || grid.cells()[c2].particles.is_empty() {
            continue;
        }
        if c1 == c2 {
            let members = &grid.cells()[c1].particles;
            for (i, &id1) in members.iter().enumerate() {
                for &id2 in &members[i + 1..] {
                    let f = pair_force(
                        extent,
                        forces,
                        &particles[id1],
                        &particles[id2],
                        pair.periodicity,
                    );
                    particles[id1].force -= f;
                    particles[id2].force += f;
                }
            }
        } else {
            for &id1 in &grid.cells()[c1].particles {
                for &id2 in &grid.cells()[c2].particles {
                    let f = pair_force(
                        extent,
                        forces,
                        &particles[id1],
                        &particles[id2],
                        pair.periodicity,
                    );
                    particles[id1].force -= f;
                    particles[id2].force += f;
                }
            }
        }
    }
}

fn step_forces_cell_lock(env: &mut Environment) {
    let extent = env.boundary.extent;
    let grid = &env.grid;
    let forces = &env.forces;
    let writer = ForceWriter::new(&mut env.particles);

    grid.cell_pairs().par_iter().for_each(|pair| {
        let cells = grid.cells();
        let (c1, c2) = (pair.first, pair.second);
        if cells[c1].particles.is_empty() || cells[c2].particles.is_empty() {
            return;
        }
        // Lock in slot order so opposing pair orientations cannot deadlock.
        let (lo, hi) = if c1 <= c2 { (c1, c2) } else { (c2, c1) };
        let _lock_lo = cells[lo].lock.lock().unwrap();
        let _lock_hi = if lo != hi {
            Some(cells[hi].lock.lock().unwrap())
        } else {
            None
        };
        // SAFETY: both cells' locks are held, so this thread has exclusive
        // access to the member particles' force fields.
        unsafe { accumulate_pair(&writer, cells, pair, extent, forces) };
    });
}

fn step_forces_blocks(env: &mut Environment) {
    let extent = env.boundary.extent;
    let grid = &env.grid;
    let forces = &env.forces;
    let writer = ForceWriter::new(&mut env.particles);

    for set in grid.block_sets() {
        set.par_iter().for_each(|block| {
            let cells = grid.cells();
            for pair in &block.pairs {
                if cells[pair.first].particles.is_empty()
                    || cells[pair.second].particles.is_empty()
                {
                    continue;
                }
                // SAFETY: within one coloured set no two blocks share a
                // cell, so this thread owns the member force fields.
                unsafe { accumulate_pair(&writer, cells, pair, extent, forces) };
            }
        });
    }
}

/// Bonded springs run outside the linked cells, serial tail of phase 5.
fn step_forces_springs(env: &mut Environment) {
    for spring_index in 0..env.forces.springs().len() {
        let spring = env.forces.springs()[spring_index];
        let p1 = &env.particles[spring.first];
        let p2 = &env.particles[spring.second];
        if !p1.state.in_grid() || !p2.state.in_grid() {
            continue;
        }
        let f = spring.potential.evaluate(p2.position - p1.position, p1.mass, p2.mass);
        env.particles[spring.first].force -= f;
        env.particles[spring.second].force += f;
    }
}
