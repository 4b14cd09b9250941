//! # Membrane Pull
//!
//! A harmonic-spring membrane is pulled upward in a marked box for a bounded
//! time window, then relaxes. The eight-neighbour mesh keeps the sheet
//! coherent while the Lennard-Jones self-interaction prevents collapse.
//!
//! ## What This Demonstrates
//!
//! - `add_membrane` - a mesh of bonded harmonic springs
//! - `ConstantForce` with `Marker::Box` and a `[t_start, t_end]` window
//!
//! Run with: `cargo run --release --example membrane_pull`

use mdcell::io::create_writer;
use mdcell::prelude::*;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let mut env = Environment::new();
    let mut boundary = Boundary::new();
    boundary.origin = DVec3::ZERO;
    boundary.extent = DVec3::new(150.0, 150.0, 1.0);
    boundary.set_rule(BoundaryRule::Outflow);
    env.set_boundary(boundary)?;
    env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 4.0), 0)?;
    env.set_grid_constant(4.0)?;
    env.add_membrane(&MembraneSpec {
        origin: DVec3::new(15.0, 15.0, 0.0),
        velocity: DVec3::ZERO,
        count: UVec3::new(50, 50, 1),
        width: 2.2,
        mass: 1.0,
        stiffness: 300.0,
        cutoff: 4.0,
        type_id: 0,
    })?;
    env.build()?;

    // Pull a patch near the center upward for the first time units.
    let pull = ConstantForce::new(
        DVec3::Y,
        0.8,
        Marker::Box {
            min: DVec3::new(68.0, 68.0, 0.0),
            max: DVec3::new(76.0, 76.0, 1.0),
        },
        0.0,
        15.0,
        false,
    );

    let writer = create_writer(OutputFormat::Vtk, "membrane", "output".as_ref(), true)?;
    StoermerVerlet::new(env)
        .with_strategy(Strategy::CellLock)
        .with_external_force(pull)
        .with_writer(writer)
        .simulate(0.0, 50.0, 0.01, 50)?;

    Ok(())
}
