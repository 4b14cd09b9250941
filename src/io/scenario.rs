//! Sectioned TXT scenario reader.
//!
//! A scenario file declares `general:`, `particles:`, `cuboids:`,
//! `spheres:`, `membranes:`, `force:`, `environment:` and `thermostats:`
//! sections; blank lines and `#` comments are skipped. Parsing is
//! two-phase: the file is read into a [`Scenario`] value first and the
//! environment is assembled afterwards, so section order in the file does
//! not matter. Checkpoint files reuse the same grammar; their particle rows
//! carry the previous step's force as three extra columns.

use std::fs;
use std::path::Path;

use crate::boundary::{Boundary, BoundaryRule, FACE_NORMALS};
use crate::effects::{ConstantForce, Marker};
use crate::environment::{CuboidSpec, Dimension, Environment, MembraneSpec, SphereSpec};
use crate::error::ScenarioError;
use crate::integrator::{StoermerVerlet, Strategy};
use crate::interactions::PairPotential;
use crate::math::{DVec3, UVec3};
use crate::particle::ParticleState;
use crate::thermostat::Thermostat;

/// The `general:` section.
#[derive(Clone, Debug)]
pub struct General {
    pub duration: f64,
    pub dt: f64,
    pub write_freq: usize,
    pub cutoff: f64,
    pub strategy: Strategy,
    pub base_name: String,
}

/// The `environment:` section.
#[derive(Clone, Debug)]
pub struct EnvironmentSettings {
    pub origin: DVec3,
    pub extent: DVec3,
    pub grid_constant: f64,
    /// In file order: left, right, top, bottom, front, back.
    pub rules: [BoundaryRule; 6],
}

/// The `thermostats:` section; `-1` fields map to `None`.
#[derive(Clone, Copy, Debug)]
pub struct ThermostatSettings {
    pub init: Option<f64>,
    pub adjust_freq: usize,
    pub target: Option<f64>,
    pub max_change: Option<f64>,
}

/// One `particles:` row.
#[derive(Clone, Copy, Debug)]
pub struct ParticleRow {
    pub position: DVec3,
    pub velocity: DVec3,
    pub mass: f64,
    pub type_id: u32,
    /// Previous-step force from a checkpoint row; zero otherwise.
    pub old_force: DVec3,
}

/// A per-type potential before the global cutoff is known.
#[derive(Clone, Copy, Debug)]
pub enum TypePotential {
    LennardJones { epsilon: f64, sigma: f64 },
    InverseSquare { g: f64 },
}

/// A parsed scenario file.
#[derive(Debug, Default)]
pub struct Scenario {
    pub general: Option<General>,
    pub particles: Vec<ParticleRow>,
    pub cuboids: Vec<CuboidSpec>,
    pub spheres: Vec<SphereSpec>,
    pub membranes: Vec<MembraneSpec>,
    pub type_forces: Vec<(u32, TypePotential)>,
    pub external_forces: Vec<ConstantForce>,
    pub environment: Option<EnvironmentSettings>,
    pub thermostat: Option<ThermostatSettings>,
}

/// A scenario resolved into a ready-to-run integrator.
pub struct SimulationSetup {
    pub integrator: StoermerVerlet,
    pub general: General,
}

/// Reads and parses a scenario file.
pub fn read_scenario(path: &Path) -> Result<Scenario, ScenarioError> {
    let label = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: label.clone(),
        source,
    })?;
    parse_scenario(&text, &label)
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    General,
    Particles,
    Cuboids,
    Spheres,
    Membranes,
    Force,
    Environment,
    Thermostats,
}

/// Parses scenario text; `label` names the source in error messages.
pub fn parse_scenario(text: &str, label: &str) -> Result<Scenario, ScenarioError> {
    let mut scenario = Scenario::default();
    let mut section = Section::None;

    for (line_no, raw) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let header = match line {
            "general:" => Some(Section::General),
            "particles:" => Some(Section::Particles),
            "cuboids:" => Some(Section::Cuboids),
            "spheres:" => Some(Section::Spheres),
            "membranes:" => Some(Section::Membranes),
            "force:" => Some(Section::Force),
            "environment:" => Some(Section::Environment),
            "thermostats:" => Some(Section::Thermostats),
            _ => None,
        };
        if let Some(next) = header {
            section = next;
            continue;
        }

        match section {
            Section::None => {
                return Err(ScenarioError::malformed(
                    label,
                    line_no,
                    format!("data before any section header: {line}"),
                ));
            }
            Section::General => parse_general(line, label, line_no, &mut scenario)?,
            Section::Particles => parse_particle(line, label, line_no, &mut scenario)?,
            Section::Cuboids => parse_cuboid(line, label, line_no, &mut scenario)?,
            Section::Spheres => parse_sphere(line, label, line_no, &mut scenario)?,
            Section::Membranes => parse_membrane(line, label, line_no, &mut scenario)?,
            Section::Force => parse_force(line, label, line_no, &mut scenario)?,
            Section::Environment => parse_environment(line, label, line_no, &mut scenario)?,
            Section::Thermostats => parse_thermostat(line, label, line_no, &mut scenario)?,
        }
    }

    Ok(scenario)
}

fn parse_values(
    line: &str,
    expected: usize,
    label: &str,
    line_no: usize,
) -> Result<Vec<f64>, ScenarioError> {
    let mut values = Vec::new();
    for token in line.split_whitespace() {
        match token.parse::<f64>() {
            Ok(v) => values.push(v),
            Err(_) => {
                return Err(ScenarioError::malformed(
                    label,
                    line_no,
                    format!("not a number: {token}"),
                ))
            }
        }
    }
    if values.len() < expected {
        return Err(ScenarioError::malformed(
            label,
            line_no,
            format!("expected at least {expected} values, got {}", values.len()),
        ));
    }
    Ok(values)
}

fn vec3(values: &[f64], at: usize) -> DVec3 {
    DVec3::new(values[at], values[at + 1], values[at + 2])
}

fn parse_general(
    line: &str,
    label: &str,
    line_no: usize,
    scenario: &mut Scenario,
) -> Result<(), ScenarioError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 6 {
        return Err(ScenarioError::malformed(
            label,
            line_no,
            "general needs: duration dt write_freq cutoff strategy basename",
        ));
    }
    let number = |i: usize| -> Result<f64, ScenarioError> {
        tokens[i]
            .parse()
            .map_err(|_| ScenarioError::malformed(label, line_no, format!("not a number: {}", tokens[i])))
    };
    let strategy_code = number(4)? as u32;
    scenario.general = Some(General {
        duration: number(0)?,
        dt: number(1)?,
        write_freq: number(2)? as usize,
        cutoff: number(3)?,
        strategy: Strategy::from_code(strategy_code).ok_or_else(|| {
            ScenarioError::malformed(label, line_no, format!("unknown parallel strategy {strategy_code}"))
        })?,
        base_name: tokens[5].to_string(),
    });
    Ok(())
}

fn parse_particle(
    line: &str,
    label: &str,
    line_no: usize,
    scenario: &mut Scenario,
) -> Result<(), ScenarioError> {
    let values = parse_values(line, 8, label, line_no)?;
    let old_force = if values.len() >= 11 { vec3(&values, 8) } else { DVec3::ZERO };
    scenario.particles.push(ParticleRow {
        position: vec3(&values, 0),
        velocity: vec3(&values, 3),
        mass: values[6],
        type_id: values[7] as u32,
        old_force,
    });
    Ok(())
}

fn parse_state(value: f64) -> ParticleState {
    if value == 1.0 {
        ParticleState::Alive
    } else {
        ParticleState::Stationary
    }
}

fn parse_dimension(value: f64, label: &str, line_no: usize) -> Result<Dimension, ScenarioError> {
    Dimension::from_value(value as i32).ok_or_else(|| {
        ScenarioError::malformed(label, line_no, format!("invalid dimension {value}"))
    })
}

fn parse_cuboid(
    line: &str,
    label: &str,
    line_no: usize,
    scenario: &mut Scenario,
) -> Result<(), ScenarioError> {
    let values = parse_values(line, 15, label, line_no)?;
    scenario.cuboids.push(CuboidSpec {
        origin: vec3(&values, 0),
        velocity: vec3(&values, 3),
        count: UVec3::new(values[6] as u32, values[7] as u32, values[8] as u32),
        width: values[9],
        mass: values[10],
        thermal_v: values[11],
        dimension: parse_dimension(values[12], label, line_no)?,
        type_id: values[13] as u32,
        state: parse_state(values[14]),
    });
    Ok(())
}

fn parse_sphere(
    line: &str,
    label: &str,
    line_no: usize,
    scenario: &mut Scenario,
) -> Result<(), ScenarioError> {
    let values = parse_values(line, 13, label, line_no)?;
    scenario.spheres.push(SphereSpec {
        origin: vec3(&values, 0),
        velocity: vec3(&values, 3),
        radius: values[6] as u32,
        width: values[7],
        mass: values[8],
        thermal_v: values[9],
        dimension: parse_dimension(values[10], label, line_no)?,
        type_id: values[11] as u32,
        state: parse_state(values[12]),
    });
    Ok(())
}

fn parse_membrane(
    line: &str,
    label: &str,
    line_no: usize,
    scenario: &mut Scenario,
) -> Result<(), ScenarioError> {
    let values = parse_values(line, 13, label, line_no)?;
    scenario.membranes.push(MembraneSpec {
        origin: vec3(&values, 0),
        velocity: vec3(&values, 3),
        count: UVec3::new(values[6] as u32, values[7] as u32, values[8] as u32),
        width: values[9],
        mass: values[10],
        stiffness: values[11],
        // Resolved against the general cutoff when the scenario is built.
        cutoff: 0.0,
        type_id: values[12] as u32,
    });
    Ok(())
}

fn parse_force(
    line: &str,
    label: &str,
    line_no: usize,
    scenario: &mut Scenario,
) -> Result<(), ScenarioError> {
    let mut tokens = line.split_whitespace();
    let name = tokens
        .next()
        .ok_or_else(|| ScenarioError::malformed(label, line_no, "missing force name"))?
        .to_lowercase()
        .replace(['-', '_'], " ");
    let mut values = Vec::new();
    for token in tokens {
        let value = token.parse::<f64>().map_err(|_| {
            ScenarioError::malformed(label, line_no, format!("not a number: {token}"))
        })?;
        values.push(value);
    }
    let need = |n: usize| -> Result<(), ScenarioError> {
        if values.len() < n {
            Err(ScenarioError::malformed(
                label,
                line_no,
                format!("force '{name}' needs {n} parameters, got {}", values.len()),
            ))
        } else {
            Ok(())
        }
    };

    match name.as_str() {
        "lennard jones" => {
            need(3)?;
            scenario.type_forces.push((
                values[2] as u32,
                TypePotential::LennardJones { epsilon: values[0], sigma: values[1] },
            ));
        }
        "inverse square" => {
            need(2)?;
            scenario
                .type_forces
                .push((values[1] as u32, TypePotential::InverseSquare { g: values[0] }));
        }
        "gravity" => {
            need(4)?;
            scenario.external_forces.push(ConstantForce::new(
                vec3(&values, 0),
                values[3],
                Marker::All,
                0.0,
                f64::MAX,
                true,
            ));
        }
        "pull force" => {
            need(12)?;
            let const_acceleration = values.len() >= 13 && values[12] == 1.0;
            scenario.external_forces.push(ConstantForce::new(
                vec3(&values, 0),
                values[3],
                Marker::Box { min: vec3(&values, 4), max: vec3(&values, 7) },
                values[10],
                values[11],
                const_acceleration,
            ));
        }
        other => {
            return Err(ScenarioError::malformed(
                label,
                line_no,
                format!("unknown force '{other}'"),
            ));
        }
    }
    Ok(())
}

fn parse_environment(
    line: &str,
    label: &str,
    line_no: usize,
    scenario: &mut Scenario,
) -> Result<(), ScenarioError> {
    let values = parse_values(line, 13, label, line_no)?;
    let mut rules = [BoundaryRule::Outflow; 6];
    for (i, rule) in rules.iter_mut().enumerate() {
        let code = values[7 + i] as u32;
        *rule = BoundaryRule::from_code(code).ok_or_else(|| {
            ScenarioError::malformed(label, line_no, format!("unknown boundary rule {code}"))
        })?;
    }
    scenario.environment = Some(EnvironmentSettings {
        origin: vec3(&values, 0),
        extent: vec3(&values, 3),
        grid_constant: values[6],
        rules,
    });
    Ok(())
}

fn parse_thermostat(
    line: &str,
    label: &str,
    line_no: usize,
    scenario: &mut Scenario,
) -> Result<(), ScenarioError> {
    let values = parse_values(line, 4, label, line_no)?;
    let optional = |v: f64| if v == -1.0 { None } else { Some(v) };
    scenario.thermostat = Some(ThermostatSettings {
        init: optional(values[0]),
        adjust_freq: values[1] as usize,
        target: optional(values[2]),
        max_change: optional(values[3]),
    });
    Ok(())
}

impl Scenario {
    /// Assembles the environment and integrator described by the scenario.
    pub fn into_simulation(self) -> Result<SimulationSetup, ScenarioError> {
        let general = self.general.ok_or_else(|| ScenarioError::Malformed {
            path: String::new(),
            line: 0,
            message: "scenario is missing the general section".into(),
        })?;

        let mut env = Environment::new();
        let mut boundary = Boundary::new();
        if let Some(settings) = &self.environment {
            boundary.origin = settings.origin;
            boundary.extent = settings.extent;
            // File rule order: left, right, top, bottom, front, back.
            let file_order = [
                FACE_NORMALS[0],
                FACE_NORMALS[1],
                FACE_NORMALS[3],
                FACE_NORMALS[2],
                FACE_NORMALS[5],
                FACE_NORMALS[4],
            ];
            for (normal, rule) in file_order.iter().zip(settings.rules) {
                boundary.set_rule_on(rule, *normal);
            }
        }

        for (type_id, potential) in &self.type_forces {
            match *potential {
                TypePotential::LennardJones { epsilon, sigma } => {
                    env.set_force(
                        PairPotential::lennard_jones_with_cutoff(epsilon, sigma, general.cutoff),
                        *type_id,
                    )?;
                    // Repulsive walls use the repulsive branch of the
                    // particle potential.
                    boundary
                        .set_boundary_force(PairPotential::lennard_jones_repulsive(epsilon, sigma));
                }
                TypePotential::InverseSquare { g } => {
                    env.set_force(
                        PairPotential::inverse_square_with_cutoff(g, general.cutoff),
                        *type_id,
                    )?;
                }
            }
        }

        env.set_boundary(boundary)?;
        if let Some(settings) = &self.environment {
            env.set_grid_constant(settings.grid_constant)?;
        }

        for row in &self.particles {
            env.add_particle_with_force(
                row.position,
                row.velocity,
                row.mass,
                row.type_id,
                ParticleState::Alive,
                row.old_force,
            )?;
        }
        for cuboid in &self.cuboids {
            env.add_cuboid(cuboid)?;
        }
        for sphere in &self.spheres {
            env.add_sphere(sphere)?;
        }
        for membrane in &self.membranes {
            let mut membrane = membrane.clone();
            membrane.cutoff = general.cutoff;
            env.add_membrane(&membrane)?;
        }

        env.build()?;

        let mut integrator = StoermerVerlet::new(env).with_strategy(general.strategy);
        if let Some(settings) = self.thermostat {
            let thermostat =
                Thermostat::new(settings.init, settings.target, settings.max_change);
            thermostat.set_initial_temperature(integrator.env_mut());
            integrator = integrator.with_thermostat(thermostat, settings.adjust_freq);
        }
        for force in self.external_forces {
            integrator = integrator.with_external_force(force);
        }

        Ok(SimulationSetup { integrator, general })
    }
}
