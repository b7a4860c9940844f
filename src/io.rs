// io.rs
// Population dumps and the running statistics file. Dumps are bincode,
// optionally gzip-compressed, written to a temporary file first so an
// interrupted run never leaves a truncated dump behind.

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::input::OutputConfig;
use crate::population::{Population, PopulationStats};
use crate::profile_scope;

#[derive(Clone, Serialize, Deserialize)]
pub struct PopulationDump {
    pub step: usize,
    pub np: usize,
    pub weight: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl PopulationDump {
    pub fn from_population(population: &Population, step: usize) -> Self {
        Self {
            step,
            np: population.len(),
            weight: population.weight.to_vec(),
            x: population.pos.iter().map(|p| p.x).collect(),
            y: population.pos.iter().map(|p| p.y).collect(),
        }
    }
}

pub fn dump_population(output: &OutputConfig, population: &Population, step: usize) -> Result<()> {
    profile_scope!("dump_population");
    let dump = PopulationDump::from_population(population, step);
    let path = output.directory.join(format!("population{step:04}.dmp"));

    // write to a temporary file first, rename once complete
    let tmp_path = path.with_extension("dmp.tmp");
    {
        let file = File::create(&tmp_path)?;
        let writer = BufWriter::new(file);
        if output.compress {
            let mut encoder = GzEncoder::new(writer, Compression::fast());
            bincode::serialize_into(&mut encoder, &dump)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            let mut writer = encoder.finish()?;
            writer.flush()?;
        } else {
            bincode::serialize_into(writer, &dump)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        }
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn load_dump<P: AsRef<Path>>(path: P) -> Result<PopulationDump> {
    let data = std::fs::read(path.as_ref())?;
    let bytes = match maybe_decompress_gzip(&data)? {
        Some(decoded) => decoded,
        None => data,
    };
    let dump = bincode::deserialize(&bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    Ok(dump)
}

fn maybe_decompress_gzip(data: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
    if data.len() < 2 || data[0] != 0x1f || data[1] != 0x8b {
        return Ok(None);
    }
    let mut decoder = GzDecoder::new(Cursor::new(data));
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded)?;
    Ok(Some(decoded))
}

/// Appends one CSV row of population statistics per step.
pub struct StatsWriter {
    path: PathBuf,
}

impl StatsWriter {
    pub fn new(directory: &Path) -> Self {
        Self {
            path: directory.join("population.sta"),
        }
    }

    pub fn append(&self, step: usize, np: usize, stats: &PopulationStats) -> Result<()> {
        let mut file = if step == 0 {
            let mut file = File::create(&self.path)?;
            writeln!(file, "step,np,wmin,wmax,total_weight,cm_x,cm_y")?;
            file
        } else {
            OpenOptions::new().append(true).open(&self.path)?
        };
        writeln!(
            file,
            "{step},{np},{},{},{},{},{}",
            stats.wmin,
            stats.wmax,
            stats.total_weight,
            stats.center_of_mass.x,
            stats.center_of_mass.y
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultraviolet::DVec2;

    fn sample_population() -> Population {
        Population::new(
            vec![10.0, 20.0, 30.0],
            vec![
                DVec2::new(0.0, 0.5),
                DVec2::new(1.0, 1.5),
                DVec2::new(2.0, 2.5),
            ],
            vec![DVec2::zero(); 3],
        )
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("particle_cluster_io_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn dump_survives_a_round_trip() {
        let dir = temp_dir("plain");
        let output = OutputConfig {
            directory: dir.clone(),
            dump_interval: 1,
            compress: false,
        };
        let pop = sample_population();
        dump_population(&output, &pop, 7).unwrap();
        let dump = load_dump(dir.join("population0007.dmp")).unwrap();
        assert_eq!(dump.step, 7);
        assert_eq!(dump.np, 3);
        assert_eq!(dump.weight, vec![10.0, 20.0, 30.0]);
        assert_eq!(dump.x, vec![0.0, 1.0, 2.0]);
        assert_eq!(dump.y, vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn compressed_dump_loads_transparently() {
        let dir = temp_dir("gzip");
        let output = OutputConfig {
            directory: dir.clone(),
            dump_interval: 1,
            compress: true,
        };
        let pop = sample_population();
        dump_population(&output, &pop, 0).unwrap();
        let raw = std::fs::read(dir.join("population0000.dmp")).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        let dump = load_dump(dir.join("population0000.dmp")).unwrap();
        assert_eq!(dump.np, 3);
    }

    #[test]
    fn stats_file_gets_a_header_and_rows() {
        let dir = temp_dir("stats");
        let writer = StatsWriter::new(&dir);
        let pop = sample_population();
        let stats = pop.stats();
        writer.append(0, pop.len(), &stats).unwrap();
        writer.append(1, pop.len(), &stats).unwrap();
        let content = std::fs::read_to_string(dir.join("population.sta")).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "step,np,wmin,wmax,total_weight,cm_x,cm_y");
        assert!(lines[1].starts_with("0,3,10,30,60,"));
    }
}
