//! VTK unstructured-grid frame writer.
//!
//! Emits ASCII `.vtu` files readable by ParaView. Per point: mass, velocity,
//! the previous step's force, and the particle type.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::environment::Environment;
use crate::io::{frame_path, OutputWriter};
use crate::particle::{Particle, ParticleState};

pub struct VtkWriter {
    base_name: String,
    dir: PathBuf,
}

impl VtkWriter {
    pub fn new(base_name: String, dir: PathBuf) -> Self {
        Self { base_name, dir }
    }
}

impl OutputWriter for VtkWriter {
    fn plot(&mut self, env: &Environment, iteration: usize) -> io::Result<()> {
        let path = frame_path(&self.dir, &self.base_name, iteration, "vtu");
        let mut file = BufWriter::new(File::create(&path)?);

        let plotted: Vec<&Particle> = env
            .particles()
            .iter()
            .filter(|p| p.state != ParticleState::Dead)
            .collect();

        writeln!(file, "<?xml version=\"1.0\"?>")?;
        writeln!(
            file,
            "<VTKFile type=\"UnstructuredGrid\" version=\"0.1\" byte_order=\"LittleEndian\">"
        )?;
        writeln!(file, "  <UnstructuredGrid>")?;
        writeln!(
            file,
            "    <Piece NumberOfPoints=\"{}\" NumberOfCells=\"0\">",
            plotted.len()
        )?;

        writeln!(file, "      <PointData>")?;
        writeln!(
            file,
            "        <DataArray type=\"Float32\" Name=\"mass\" format=\"ascii\">"
        )?;
        for p in &plotted {
            writeln!(file, "          {}", p.mass)?;
        }
        writeln!(file, "        </DataArray>")?;
        writeln!(
            file,
            "        <DataArray type=\"Float32\" Name=\"velocity\" NumberOfComponents=\"3\" format=\"ascii\">"
        )?;
        for p in &plotted {
            writeln!(file, "          {} {} {}", p.velocity.x, p.velocity.y, p.velocity.z)?;
        }
        writeln!(file, "        </DataArray>")?;
        writeln!(
            file,
            "        <DataArray type=\"Float32\" Name=\"force\" NumberOfComponents=\"3\" format=\"ascii\">"
        )?;
        for p in &plotted {
            writeln!(file, "          {} {} {}", p.old_force.x, p.old_force.y, p.old_force.z)?;
        }
        writeln!(file, "        </DataArray>")?;
        writeln!(
            file,
            "        <DataArray type=\"Int32\" Name=\"type\" format=\"ascii\">"
        )?;
        for p in &plotted {
            writeln!(file, "          {}", p.type_id)?;
        }
        writeln!(file, "        </DataArray>")?;
        writeln!(file, "      </PointData>")?;

        writeln!(file, "      <CellData/>")?;
        writeln!(file, "      <Points>")?;
        writeln!(
            file,
            "        <DataArray type=\"Float32\" Name=\"points\" NumberOfComponents=\"3\" format=\"ascii\">"
        )?;
        for p in &plotted {
            writeln!(file, "          {} {} {}", p.position.x, p.position.y, p.position.z)?;
        }
        writeln!(file, "        </DataArray>")?;
        writeln!(file, "      </Points>")?;

        // ParaView requires the cell arrays even when there are no cells.
        writeln!(file, "      <Cells>")?;
        writeln!(
            file,
            "        <DataArray type=\"Int32\" Name=\"connectivity\" format=\"ascii\"/>"
        )?;
        writeln!(
            file,
            "        <DataArray type=\"Int32\" Name=\"offsets\" format=\"ascii\"/>"
        )?;
        writeln!(
            file,
            "        <DataArray type=\"UInt8\" Name=\"types\" format=\"ascii\"/>"
        )?;
        writeln!(file, "      </Cells>")?;

        writeln!(file, "    </Piece>")?;
        writeln!(file, "  </UnstructuredGrid>")?;
        writeln!(file, "</VTKFile>")?;
        file.flush()
    }
}
