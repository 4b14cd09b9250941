//! Integration properties of the Stoermer-Verlet driver: closed-form single
//! steps, Newton's third law, and the equivalence of the three execution
//! strategies.

use mdcell::prelude::*;

/// A dense LJ lattice in a periodic box, identical on every call.
fn lattice_env() -> Environment {
    let mut env = Environment::new();
    let mut boundary = Boundary::new();
    boundary.origin = DVec3::ZERO;
    boundary.extent = DVec3::new(12.0, 12.0, 1.0);
    boundary.set_rule(BoundaryRule::Periodic);
    env.set_boundary(boundary).unwrap();
    env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 3.0), 0)
        .unwrap();
    env.set_grid_constant(3.0).unwrap();
    env.add_cuboid(&CuboidSpec {
        origin: DVec3::new(2.0, 2.0, 0.0),
        velocity: DVec3::new(0.5, -0.2, 0.0),
        count: UVec3::new(7, 7, 1),
        width: 1.1225,
        mass: 1.0,
        thermal_v: 0.0,
        type_id: 0,
        dimension: Dimension::Two,
        state: ParticleState::Alive,
    })
    .unwrap();
    env.build().unwrap();
    env
}

#[test]
fn single_step_two_body_closed_form() {
    let mut env = Environment::new();
    let mut boundary = Boundary::new();
    boundary.origin = DVec3::new(-50.0, -50.0, -50.0);
    boundary.extent = DVec3::new(100.0, 100.0, 100.0);
    boundary.set_rule(BoundaryRule::Outflow);
    env.set_boundary(boundary).unwrap();
    env.set_force(PairPotential::inverse_square_with_cutoff(1.0, 100.0), 0)
        .unwrap();
    env.add_particle(DVec3::new(1.0, 5.0, 4.0), DVec3::new(3.0, 3.0, 3.0), 5.0, 0)
        .unwrap();
    env.add_particle(DVec3::new(3.0, 2.0, 1.0), DVec3::ZERO, 5.0, 0)
        .unwrap();
    env.build().unwrap();

    let mut sim = StoermerVerlet::new(env);
    sim.simulate(0.0, 1.0, 1.0, 0).unwrap();

    // With no initial force the position advances by dt * v alone.
    assert!((sim.env()[0].position - DVec3::new(4.0, 8.0, 7.0)).length() < 1e-12);
    assert!((sim.env()[1].position - DVec3::new(3.0, 2.0, 1.0)).length() < 1e-12);

    // Closed form of the velocity half-kick at the new positions
    // (r = sqrt(73), m1 m2 = 25).
    let diff = DVec3::new(-1.0, -6.0, -6.0);
    let force_on_p1 = 25.0 / diff.length().powi(3) * diff;
    let expected_v1 = DVec3::splat(3.0) + 0.1 * force_on_p1;
    let expected_v2 = -0.1 * force_on_p1;
    assert!((sim.env()[0].velocity - expected_v1).length() < 1e-12);
    assert!((sim.env()[1].velocity - expected_v2).length() < 1e-12);
    assert!((sim.env()[0].velocity.x - (3.0 - 0.0040083)).abs() < 1e-6);
}

#[test]
fn pairwise_forces_sum_to_zero() {
    let mut sim = StoermerVerlet::new(lattice_env());
    for step in 0..10 {
        sim.step(step, 0.0005, step as f64 * 0.0005);
        let total = sim
            .env()
            .particles()
            .iter()
            .map(|p| p.force)
            .fold(DVec3::ZERO, |acc, f| acc + f);
        assert!(total.length() < 1e-9, "net force {total:?} after step {step}");
    }
}

#[test]
fn strategies_agree_within_tolerance() {
    let steps = 50;
    let dt = 0.0005;

    let mut reference = StoermerVerlet::new(lattice_env()).with_strategy(Strategy::Serial);
    for step in 0..steps {
        reference.step(step, dt, step as f64 * dt);
    }

    for strategy in [Strategy::CellLock, Strategy::SpatialDecomposition] {
        let mut sim = StoermerVerlet::new(lattice_env()).with_strategy(strategy);
        for step in 0..steps {
            sim.step(step, dt, step as f64 * dt);
        }
        for id in 0..reference.env().total_count() {
            let a = &reference.env()[id];
            let b = &sim.env()[id];
            assert!(
                (a.position - b.position).length() < 1e-10,
                "{strategy:?}: position diverged for particle {id}"
            );
            assert!(
                (a.velocity - b.velocity).length() < 1e-10,
                "{strategy:?}: velocity diverged for particle {id}"
            );
            assert!(
                (a.force - b.force).length() < 1e-10,
                "{strategy:?}: force diverged for particle {id}"
            );
        }
    }
}

#[test]
fn stationary_particles_never_move_but_push_others() {
    let mut env = Environment::new();
    let mut boundary = Boundary::new();
    boundary.origin = DVec3::ZERO;
    boundary.extent = DVec3::new(10.0, 10.0, 1.0);
    boundary.set_rule(BoundaryRule::Outflow);
    env.set_boundary(boundary).unwrap();
    env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 2.5), 0)
        .unwrap();
    env.set_grid_constant(2.5).unwrap();
    let wall_id = env
        .add_particle_with_state(
            DVec3::new(5.0, 5.0, 0.0),
            DVec3::ZERO,
            1.0,
            0,
            ParticleState::Stationary,
        )
        .unwrap();
    let mover_id = env
        .add_particle(DVec3::new(5.0, 6.0, 0.0), DVec3::new(0.0, -0.5, 0.0), 1.0, 0)
        .unwrap();
    env.build().unwrap();

    let mut sim = StoermerVerlet::new(env);
    sim.simulate(0.0, 0.5, 0.001, 0).unwrap();

    // The stationary particle held its place and deflected the mover.
    assert_eq!(sim.env()[wall_id].position, DVec3::new(5.0, 5.0, 0.0));
    assert_eq!(sim.env()[wall_id].velocity, DVec3::ZERO);
    assert!(sim.env()[mover_id].position.y > 5.5);
    assert!(sim.env()[mover_id].velocity.y > 0.0);
}

#[test]
fn external_force_accelerates_marked_particles_in_its_window() {
    let mut env = Environment::new();
    let mut boundary = Boundary::new();
    boundary.origin = DVec3::ZERO;
    boundary.extent = DVec3::new(100.0, 100.0, 1.0);
    boundary.set_rule(BoundaryRule::Outflow);
    env.set_boundary(boundary).unwrap();
    env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 2.5), 0)
        .unwrap();
    env.set_grid_constant(2.5).unwrap();
    env.add_particle(DVec3::new(10.0, 50.0, 0.0), DVec3::ZERO, 2.0, 0)
        .unwrap();
    env.add_particle(DVec3::new(90.0, 50.0, 0.0), DVec3::ZERO, 2.0, 0)
        .unwrap();
    env.build().unwrap();

    // Pull only the first particle, only during the first half.
    let pull = ConstantForce::new(
        DVec3::X,
        4.0,
        Marker::Box {
            min: DVec3::ZERO,
            max: DVec3::new(50.0, 100.0, 1.0),
        },
        0.0,
        0.5,
        false,
    );
    let mut sim = StoermerVerlet::new(env).with_external_force(pull);
    sim.simulate(0.0, 0.5, 0.001, 0).unwrap();
    let v_mid = sim.env()[0].velocity.x;
    // a = F/m = 2: after 0.5 time units v = 1.
    assert!((v_mid - 1.0).abs() < 0.01);
    assert_eq!(sim.env()[1].velocity, DVec3::ZERO);

    sim.simulate(0.5, 1.0, 0.001, 0).unwrap();
    // Outside the window the velocity stays put.
    assert!((sim.env()[0].velocity.x - v_mid).abs() < 0.01);
}

#[test]
fn membrane_springs_hold_the_mesh_together() {
    let mut env = Environment::new();
    let mut boundary = Boundary::new();
    boundary.origin = DVec3::ZERO;
    boundary.extent = DVec3::new(20.0, 20.0, 1.0);
    boundary.set_rule(BoundaryRule::Outflow);
    env.set_boundary(boundary).unwrap();
    env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 2.5), 0)
        .unwrap();
    env.set_grid_constant(2.5).unwrap();
    env.add_membrane(&MembraneSpec {
        origin: DVec3::new(7.0, 7.0, 0.0),
        velocity: DVec3::ZERO,
        count: UVec3::new(3, 3, 1),
        width: 2.2,
        mass: 1.0,
        stiffness: 50.0,
        cutoff: 5.0,
        type_id: 0,
    })
    .unwrap();
    env.build().unwrap();

    // Kick the center particle; the springs pull it back instead of letting
    // it drift away.
    let center = 4;
    let mut sim = StoermerVerlet::new(env);
    sim.env_mut()[center].velocity = DVec3::new(0.0, 2.0, 0.0);
    sim.simulate(0.0, 2.0, 0.001, 0).unwrap();

    let displacement = (sim.env()[center].position - DVec3::new(9.2, 9.2, 0.0)).length();
    assert!(displacement < 1.0, "center drifted {displacement}");
    assert_eq!(sim.env().alive_count(), 9);
}
