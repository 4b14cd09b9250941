//! Scenario files end to end: reading from disk, building a simulation,
//! writing frames, and resuming from a checkpoint.

use std::fs;
use std::path::PathBuf;

use mdcell::io::checkpoint::write_checkpoint;
use mdcell::io::scenario::{parse_scenario, read_scenario};
use mdcell::io::{create_writer, OutputFormat};
use mdcell::prelude::*;

fn temp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mdcell-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn scenario_file_runs_from_disk() {
    let path = temp_path("outflow.txt");
    fs::write(
        &path,
        "\
general:
1 0.001 0 2.5 0 outflow_test

particles:
2 4 0   -4 4 0   1 0
4 8 0    4 4 0   1 0
8 6 0    4 -4 0  1 0
6 2 0   -4 -4 0  1 0

force:
lennard_jones 1 1 0

environment:
0 0 0   10 10 1   2.5   0 0 0 0 0 0
",
    )
    .unwrap();

    let setup = read_scenario(&path).unwrap().into_simulation().unwrap();
    let general = setup.general;
    let mut integrator = setup.integrator;
    integrator
        .simulate(0.0, general.duration, general.dt, 0)
        .unwrap();

    // All four particles leave through the outflow faces.
    assert_eq!(integrator.env().dead_count(), 4);
}

#[test]
fn checkpoint_resumes_without_transient() {
    // Run a few steps, checkpoint, and rebuild: the particle rows must
    // reproduce position, velocity, and the previous step's force.
    let mut env = Environment::new();
    let mut boundary = Boundary::new();
    boundary.origin = DVec3::ZERO;
    boundary.extent = DVec3::new(10.0, 10.0, 1.0);
    boundary.set_rule(BoundaryRule::Periodic);
    env.set_boundary(boundary).unwrap();
    env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 2.5), 0)
        .unwrap();
    env.set_grid_constant(2.5).unwrap();
    env.add_particle(DVec3::new(4.0, 5.0, 0.0), DVec3::new(0.3, 0.0, 0.0), 1.0, 0)
        .unwrap();
    env.add_particle(DVec3::new(5.5, 5.0, 0.0), DVec3::ZERO, 1.0, 0)
        .unwrap();
    env.build().unwrap();

    let mut sim = StoermerVerlet::new(env);
    sim.simulate(0.0, 0.01, 0.001, 0).unwrap();

    let path = temp_path("resume.txt");
    write_checkpoint(sim.env(), &path).unwrap();

    let scenario = read_scenario(&path).unwrap();
    assert_eq!(scenario.particles.len(), 2);
    for (row, id) in scenario.particles.iter().zip(0..) {
        let original = &sim.env()[id];
        assert!((row.position - original.position).length() < 1e-9);
        assert!((row.velocity - original.velocity).length() < 1e-9);
        assert!((row.old_force - original.old_force).length() < 1e-9);
    }
}

#[test]
fn parse_rejects_data_before_a_section() {
    assert!(parse_scenario("1 2 3\n", "inline").is_err());
}

#[test]
fn writers_emit_frames_with_padded_indices() {
    let mut env = Environment::new();
    let mut boundary = Boundary::new();
    boundary.origin = DVec3::ZERO;
    boundary.extent = DVec3::new(10.0, 10.0, 1.0);
    boundary.set_rule(BoundaryRule::Outflow);
    env.set_boundary(boundary).unwrap();
    env.set_force(PairPotential::lennard_jones_with_cutoff(1.0, 1.0, 2.5), 0)
        .unwrap();
    env.add_particle(DVec3::new(5.0, 5.0, 0.0), DVec3::ZERO, 1.5, 0)
        .unwrap();
    env.build().unwrap();

    let dir = temp_path("frames");
    let writer = create_writer(OutputFormat::Xyz, "traj", &dir, true).unwrap();
    let mut sim = StoermerVerlet::new(env).with_writer(writer);
    sim.simulate(0.0, 0.003, 0.001, 1).unwrap();

    let frame = dir.join("traj_0000.xyz");
    let content = fs::read_to_string(&frame).unwrap();
    assert!(content.starts_with("1\n"));
    assert!(content.contains("Ar 5 5 0"));
    assert!(dir.join("traj_0002.xyz").exists());

    // A second writer refuses the now non-empty directory without the
    // overwrite flag.
    assert!(create_writer(OutputFormat::Vtk, "traj", &dir, false).is_err());
}
