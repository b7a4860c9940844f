// population.rs
// The particle population: index-aligned parallel arrays of weight, position
// and velocity. Created once from the generating field; afterwards every rank
// holds a replicated mutable copy of positions and velocities and a shared
// read-only view of the weights.

use rayon::prelude::*;
use std::sync::Arc;
use ultraviolet::DVec2;

use crate::config;
use crate::error::{EvolutionError, Result};
use crate::grid::Grid2D;

#[derive(Clone, Debug)]
pub struct Population {
    /// Particle weights, immutable for the run's duration.
    pub weight: Arc<Vec<f64>>,
    pub pos: Vec<DVec2>,
    pub vel: Vec<DVec2>,
}

/// Per-step aggregate statistics over the population.
#[derive(Clone, Copy, Debug)]
pub struct PopulationStats {
    pub wmin: f64,
    pub wmax: f64,
    pub total_weight: f64,
    pub center_of_mass: DVec2,
}

impl Population {
    pub fn new(weight: Vec<f64>, pos: Vec<DVec2>, vel: Vec<DVec2>) -> Self {
        debug_assert_eq!(weight.len(), pos.len());
        debug_assert_eq!(weight.len(), vel.len());
        Self {
            weight: Arc::new(weight),
            pos,
            vel,
        }
    }

    pub fn len(&self) -> usize {
        self.pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos.is_empty()
    }

    /// Generate the population from the value distribution of the generating
    /// field. Cells whose value lies in the acceptance band spawn one
    /// particle, placed inside the particle grid at half scale with a quarter
    /// offset, with weight proportional to the field value and zero initial
    /// velocity. Deterministic: the same field always yields the same
    /// population.
    pub fn from_field(field: &Grid2D, pgrid: &Grid2D) -> Result<Self> {
        let vmax = field.max_value();
        let vmin = field.min_value();
        let floor = (vmax as f64 + (config::THRESHOLD_BLEND - 1.0) * vmin as f64)
            / config::THRESHOLD_BLEND;
        let accept = |v: i32| v as f64 >= floor && v <= vmax;

        let np = field.values.par_iter().filter(|&&v| accept(v)).count();

        let mut weight = Vec::new();
        let mut pos = Vec::new();
        let mut vel = Vec::new();
        weight
            .try_reserve_exact(np)
            .map_err(|source| EvolutionError::Allocation {
                stage: "population weights",
                source,
            })?;
        pos.try_reserve_exact(np)
            .map_err(|source| EvolutionError::Allocation {
                stage: "population positions",
                source,
            })?;
        vel.try_reserve_exact(np)
            .map_err(|source| EvolutionError::Allocation {
                stage: "population velocities",
                source,
            })?;

        let (pw, ph) = pgrid.extent();
        for ix in 0..field.ex {
            for iy in 0..field.ey {
                let v = field.get(ix, iy);
                if !accept(v) {
                    continue;
                }
                weight.push(v as f64 * config::WEIGHT_SCALE);
                let px = pgrid.xs + pw / 4.0 + pw * ix as f64 / (field.ex as f64 * 2.0);
                let py = pgrid.ys + ph / 4.0 + ph * iy as f64 / (field.ey as f64 * 2.0);
                pos.push(DVec2::new(px, py));
                vel.push(DVec2::zero()); // at start particles are still
            }
        }
        Ok(Self::new(weight, pos, vel))
    }

    /// Min/max/total weight and center of mass, reduced in parallel. The
    /// reductions are commutative and associative; floating-point reordering
    /// across runs is tolerated here (this feeds diagnostics, not state).
    pub fn stats(&self) -> PopulationStats {
        if self.is_empty() {
            return PopulationStats {
                wmin: 0.0,
                wmax: 0.0,
                total_weight: 0.0,
                center_of_mass: DVec2::zero(),
            };
        }
        let (wmin, wmax, total, weighted) = self
            .weight
            .par_iter()
            .zip(self.pos.par_iter())
            .map(|(&w, &p)| (w, w, w, p * w))
            .reduce(
                || (f64::INFINITY, f64::NEG_INFINITY, 0.0, DVec2::zero()),
                |a, b| (a.0.min(b.0), a.1.max(b.1), a.2 + b.2, a.3 + b.3),
            );
        PopulationStats {
            wmin,
            wmax,
            total_weight: total,
            center_of_mass: weighted / total,
        }
    }

    /// True when any position or velocity component is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        let bad = |v: &DVec2| !v.x.is_finite() || !v.y.is_finite();
        self.pos.par_iter().any(bad) || self.vel.par_iter().any(bad)
    }
}
