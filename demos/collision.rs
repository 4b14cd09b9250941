//! # Two-Body Collision
//!
//! A small block of particles drops onto a resting slab; both are
//! Lennard-Jones lattices. The slab absorbs the impact and waves travel
//! outward through the periodic side walls.
//!
//! ## What This Demonstrates
//!
//! - `add_cuboid` - spawning particle lattices with thermal noise
//! - mixed boundary rules - periodic sides, outflow top and bottom
//! - `Strategy::SpatialDecomposition` - lock-free parallel forces
//!
//! Run with: `cargo run --release --example collision`

use mdcell::io::create_writer;
use mdcell::prelude::*;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let mut env = Environment::new();
    let mut boundary = Boundary::new();
    boundary.origin = DVec3::new(0.0, -5.0, 0.0);
    boundary.extent = DVec3::new(60.0, 40.0, 1.0);
    boundary.set_rule(BoundaryRule::Outflow);
    boundary.set_rule_on(BoundaryRule::Periodic, IVec3::new(-1, 0, 0));
    boundary.set_rule_on(BoundaryRule::Periodic, IVec3::new(1, 0, 0));
    env.set_boundary(boundary)?;
    env.set_force(PairPotential::lennard_jones_with_cutoff(5.0, 1.0, 3.0), 0)?;
    env.set_grid_constant(3.0)?;

    // Resting slab.
    env.add_cuboid(&CuboidSpec {
        origin: DVec3::new(5.0, 0.0, 0.0),
        velocity: DVec3::ZERO,
        count: UVec3::new(44, 8, 1),
        width: 1.1225,
        mass: 1.0,
        thermal_v: 0.1,
        type_id: 0,
        dimension: Dimension::Two,
        state: ParticleState::Alive,
    })?;
    // Falling block.
    env.add_cuboid(&CuboidSpec {
        origin: DVec3::new(25.0, 20.0, 0.0),
        velocity: DVec3::new(0.0, -10.0, 0.0),
        count: UVec3::new(8, 8, 1),
        width: 1.1225,
        mass: 1.0,
        thermal_v: 0.1,
        type_id: 0,
        dimension: Dimension::Two,
        state: ParticleState::Alive,
    })?;
    env.build()?;

    let writer = create_writer(OutputFormat::Xyz, "collision", "output".as_ref(), true)?;
    StoermerVerlet::new(env)
        .with_strategy(Strategy::SpatialDecomposition)
        .with_writer(writer)
        .simulate(0.0, 5.0, 0.0002, 100)?;

    Ok(())
}
