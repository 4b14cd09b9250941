//! XYZ frame writer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::environment::Environment;
use crate::io::{frame_path, OutputWriter};
use crate::particle::ParticleState;

pub struct XyzWriter {
    base_name: String,
    dir: PathBuf,
}

impl XyzWriter {
    pub fn new(base_name: String, dir: PathBuf) -> Self {
        Self { base_name, dir }
    }
}

impl OutputWriter for XyzWriter {
    fn plot(&mut self, env: &Environment, iteration: usize) -> io::Result<()> {
        let path = frame_path(&self.dir, &self.base_name, iteration, "xyz");
        let mut file = BufWriter::new(File::create(&path)?);

        let plotted: Vec<_> = env
            .particles()
            .iter()
            .filter(|p| p.state != ParticleState::Dead)
            .collect();

        writeln!(file, "{}", plotted.len())?;
        writeln!(
            file,
            "Generated by mdcell. See http://openbabel.org/wiki/XYZ_(format) for file format doku."
        )?;
        for p in plotted {
            writeln!(file, "Ar {} {} {}", p.position.x, p.position.y, p.position.z)?;
        }
        file.flush()
    }
}
