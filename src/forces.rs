// forces.rs
// Pairwise force kernel and the per-step force accumulator. The kernel is
// pure; the accumulator is reborn every iteration and only the owning rank's
// partition holds meaningful values after the accumulation phase.

use rayon::prelude::*;
use std::ops::Range;
use ultraviolet::DVec2;

use crate::config;
use crate::error::{EvolutionError, Result};
use crate::population::Population;
use crate::profile_scope;

/// Force that the particle at `p2` exerts on the particle at `p1`.
/// Antisymmetric by construction. A squared distance below the singularity
/// floor is clamped to it, so coincident particles produce a finite force.
#[inline]
pub fn force_between(w1: f64, p1: DVec2, w2: f64, p2: DVec2) -> DVec2 {
    let d = p2 - p1;
    let mut d2 = d.mag_sq();
    if d2 < config::SINGULARITY_FLOOR {
        d2 = config::SINGULARITY_FLOOR;
    }
    let magnitude = config::FORCE_COUPLING * w1 * w2 / d2;
    d * (magnitude / d2.sqrt())
}

/// Transient array of per-particle force sums. Every rank allocates the full
/// `np` entries for indexing uniformity even though only its own partition is
/// ever written.
pub struct ForceAccumulator {
    values: Vec<DVec2>,
}

impl ForceAccumulator {
    pub fn new(np: usize) -> Result<Self> {
        let mut values = Vec::new();
        values
            .try_reserve_exact(np)
            .map_err(|source| EvolutionError::Allocation {
                stage: "force accumulator",
                source,
            })?;
        values.resize(np, DVec2::zero());
        Ok(Self { values })
    }

    pub fn values(&self) -> &[DVec2] {
        &self.values
    }

    /// Zero the whole array. Data-independent writes, parallel.
    pub fn reset(&mut self) {
        self.values.par_iter_mut().for_each(|f| *f = DVec2::zero());
    }

    /// Accumulate pairwise forces for the owned index range against the full
    /// population. The outer loop is parallel over owned indices; the inner
    /// loop is a sequential sum over all particles, skipping self-interaction,
    /// which fixes the accumulation order per particle and keeps the result
    /// deterministic.
    pub fn accumulate(&mut self, owned: Range<usize>, population: &Population) {
        profile_scope!("force_accumulation");
        let weight = &population.weight;
        let pos = &population.pos;
        let start = owned.start;
        self.values[owned]
            .par_iter_mut()
            .enumerate()
            .for_each(|(k, f)| {
                let i = start + k;
                let wi = weight[i];
                let pi = pos[i];
                let mut sum = DVec2::zero();
                for (j, (&wj, &pj)) in weight.iter().zip(pos.iter()).enumerate() {
                    if j != i {
                        sum += force_between(wi, pi, wj, pj);
                    }
                }
                *f += sum;
            });
    }
}
