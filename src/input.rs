// input.rs
// Handles loading and parsing the input deck (grids, evolution parameters,
// output options) from a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config;
use crate::error::{EvolutionError, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputDeck {
    /// Grid the generating field is computed on.
    pub gen_field_grid: GridConfig,
    /// Grid the particle population lives on; also the visualization canvas.
    pub particle_grid: GridConfig,
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GridConfig {
    pub ex: usize,
    pub ey: usize,
    pub xs: f64,
    pub xe: f64,
    pub ys: f64,
    pub ye: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvolutionConfig {
    /// Iteration cap for the generating field.
    pub field_iterations: usize,
    /// Number of evolution steps.
    pub steps: usize,
    /// Timestep.
    pub dt: f64,
    /// Total rank count: one coordinator plus `ranks - 1` workers.
    pub ranks: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory receiving frames, dumps and statistics.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Steps between population dumps.
    #[serde(default = "default_dump_interval")]
    pub dump_interval: usize,
    /// Gzip-compress population dumps.
    #[serde(default)]
    pub compress: bool,
}

fn default_directory() -> PathBuf {
    PathBuf::from("out")
}

fn default_dump_interval() -> usize {
    config::DEFAULT_DUMP_INTERVAL
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            dump_interval: default_dump_interval(),
            compress: false,
        }
    }
}

impl InputDeck {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let deck: InputDeck =
            toml::from_str(&content).map_err(|e| EvolutionError::Input(e.to_string()))?;
        deck.validate()?;
        Ok(deck)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, grid) in [
            ("gen_field_grid", &self.gen_field_grid),
            ("particle_grid", &self.particle_grid),
        ] {
            if grid.ex < 3 || grid.ey < 3 {
                return Err(EvolutionError::Input(format!(
                    "{name}: extensions must be at least 3x3, got {}x{}",
                    grid.ex, grid.ey
                )));
            }
            if grid.xe <= grid.xs || grid.ye <= grid.ys {
                return Err(EvolutionError::Input(format!(
                    "{name}: bounds must satisfy xs < xe and ys < ye"
                )));
            }
        }
        if !self.evolution.dt.is_finite() || self.evolution.dt <= 0.0 {
            return Err(EvolutionError::Input(format!(
                "evolution.dt must be a positive finite number, got {}",
                self.evolution.dt
            )));
        }
        if self.output.dump_interval == 0 {
            return Err(EvolutionError::Input(
                "output.dump_interval must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
