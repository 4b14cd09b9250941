//! CSV writer for binned statistics.
//!
//! Layout: a header `time&vel&dens/bins,1,...,n`, then per sample a `t,`
//! row followed by a `v,...` row of mean velocities and a `d,...` row of
//! densities.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub struct CsvWriter {
    file: BufWriter<File>,
    bins: usize,
}

impl CsvWriter {
    pub fn create(path: &Path, bins: usize) -> io::Result<Self> {
        let mut file = BufWriter::new(File::create(path)?);
        write!(file, "time&vel&dens/bins,")?;
        for i in 1..=bins {
            if i < bins {
                write!(file, "{i},")?;
            } else {
                writeln!(file, "{i}")?;
            }
        }
        Ok(Self { file, bins })
    }

    pub fn write_sample(&mut self, time: f64, velocity: &[f64], density: &[f64]) -> io::Result<()> {
        writeln!(self.file, "{time},")?;
        self.write_row('v', velocity)?;
        self.write_row('d', density)?;
        self.file.flush()
    }

    fn write_row(&mut self, label: char, values: &[f64]) -> io::Result<()> {
        write!(self.file, "{label},")?;
        for i in 0..self.bins {
            if i + 1 < self.bins {
                write!(self.file, "{},", values[i])?;
            } else {
                writeln!(self.file, "{}", values[i])?;
            }
        }
        Ok(())
    }
}
