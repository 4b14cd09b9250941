//! Checkpoint writer.
//!
//! A checkpoint is a scenario-format TXT file whose particle rows carry the
//! previous step's force as three extra columns, so a resumed run continues
//! the Verlet scheme without transient. The non-particle sections are
//! emitted as commented templates for the user to fill in, mirroring the
//! original scenario layout.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::environment::Environment;
use crate::particle::ParticleState;

const GENERAL_HEADER: &str = "# duration   delta_t   write_freq   cutoff_radius   parallel_strategy   output_basename";
const PARTICLE_HEADER: &str = "# position           velocity         mass   type   old_force";
const FORCE_HEADER: &str = "# name   parameters   particle_type";
const ENVIRONMENT_HEADER: &str = "# boundary_origin   boundary_extent   grid_constant   \
boundary_conds(left, right, top, bottom, front, back; 0=OUTFLOW 1=PERIODIC 2=REPULSIVE_FORCE 3=VELOCITY_REFLECTION)";
const THERMOSTAT_HEADER: &str = "# T_init   adjust_freq   T_target(-1 = none)   delta_T(-1 = unbounded)";

/// Writes a checkpoint for the current environment state.
pub fn write_checkpoint(env: &Environment, path: &Path) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    tracing::debug!(path = %path.display(), "writing checkpoint");

    writeln!(file, "# mdcell checkpoint")?;
    writeln!(file)?;

    template_section(&mut file, "general:", GENERAL_HEADER)?;

    writeln!(file, "particles:")?;
    writeln!(file, "{PARTICLE_HEADER}")?;
    for p in env.particles() {
        if p.state == ParticleState::Dead {
            continue;
        }
        writeln!(
            file,
            "{} {} {}     {} {} {}     {}     {}     {} {} {}",
            p.position.x,
            p.position.y,
            p.position.z,
            p.velocity.x,
            p.velocity.y,
            p.velocity.z,
            p.mass,
            p.type_id,
            p.old_force.x,
            p.old_force.y,
            p.old_force.z,
        )?;
    }
    writeln!(file)?;

    template_section(&mut file, "force:", FORCE_HEADER)?;
    template_section(&mut file, "environment:", ENVIRONMENT_HEADER)?;
    template_section(&mut file, "thermostats:", THERMOSTAT_HEADER)?;

    file.flush()
}

fn template_section(file: &mut impl Write, name: &str, header: &str) -> io::Result<()> {
    writeln!(file, "{name}")?;
    writeln!(file, "{header}")?;
    writeln!(file, "# -- fill in or delete this section --")?;
    writeln!(file)?;
    Ok(())
}
