//! # Nano-Channel Flow
//!
//! Fluid particles driven through a channel whose walls are stationary
//! particles, with a thermostat holding the temperature and binned flow
//! statistics written to CSV.
//!
//! ## What This Demonstrates
//!
//! - `ParticleState::Stationary` - wall particles that push but never move
//! - `ConstantForce::gravity` - a constant drive along the channel
//! - `NanoFlowStatistics` - mean y-velocity and density per x bin
//!
//! Run with: `cargo run --release --example nano_flow`

use mdcell::io::create_writer;
use mdcell::prelude::*;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let mut env = Environment::new();
    let mut boundary = Boundary::new();
    boundary.origin = DVec3::ZERO;
    boundary.extent = DVec3::new(30.0, 30.0, 1.0);
    boundary.set_rule(BoundaryRule::Outflow);
    boundary.set_rule_on(BoundaryRule::Periodic, IVec3::new(0, 1, 0));
    boundary.set_rule_on(BoundaryRule::Periodic, IVec3::new(0, -1, 0));
    env.set_boundary(boundary)?;
    env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 3.0), 0)?;
    env.set_grid_constant(3.0)?;

    // Channel walls: stationary lattices on the left and right.
    for wall_x in [1.0, 27.8] {
        env.add_cuboid(&CuboidSpec {
            origin: DVec3::new(wall_x, 0.2, 0.0),
            velocity: DVec3::ZERO,
            count: UVec3::new(2, 26, 1),
            width: 1.1225,
            mass: 1.0,
            thermal_v: 0.0,
            type_id: 1,
            dimension: Dimension::Two,
            state: ParticleState::Stationary,
        })?;
    }
    // Fluid in between.
    env.add_cuboid(&CuboidSpec {
        origin: DVec3::new(6.0, 0.2, 0.0),
        velocity: DVec3::ZERO,
        count: UVec3::new(16, 24, 1),
        width: 1.1225,
        mass: 1.0,
        thermal_v: 0.5,
        type_id: 0,
        dimension: Dimension::Two,
        state: ParticleState::Alive,
    })?;
    env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.1, 3.0), 1)?;
    env.build()?;

    let statistics = NanoFlowStatistics::new(500, 15, "statistics.csv".as_ref())?;
    let writer = create_writer(OutputFormat::Vtk, "nano_flow", "output".as_ref(), true)?;
    StoermerVerlet::new(env)
        .with_strategy(Strategy::CellLock)
        .with_thermostat(Thermostat::new(Some(0.5), Some(0.5), None), 1000)
        .with_external_force(ConstantForce::gravity(-0.8, 1))
        .with_writer(writer)
        .with_statistics(Box::new(statistics))
        .simulate(0.0, 30.0, 0.0005, 200)?;

    Ok(())
}
