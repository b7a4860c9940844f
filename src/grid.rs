// grid.rs
// Row-major 2D grid of integer field values with world-space bounds. Used
// both for the generating field and as the canvas for visualization frames.

use rayon::prelude::*;

use crate::error::{EvolutionError, Result};
use crate::input::GridConfig;

#[derive(Clone, Debug)]
pub struct Grid2D {
    /// Extensions in the X and Y directions (cells).
    pub ex: usize,
    pub ey: usize,
    /// World-space bounds.
    pub xs: f64,
    pub xe: f64,
    pub ys: f64,
    pub ye: f64,
    /// Row-major values, `ex * ey` entries.
    pub values: Vec<i32>,
}

impl Grid2D {
    pub fn new(config: &GridConfig) -> Result<Self> {
        let cells = config.ex * config.ey;
        let mut values = Vec::new();
        values
            .try_reserve_exact(cells)
            .map_err(|source| EvolutionError::Allocation {
                stage: "grid values",
                source,
            })?;
        values.resize(cells, 0);
        Ok(Self {
            ex: config.ex,
            ey: config.ey,
            xs: config.xs,
            xe: config.xe,
            ys: config.ys,
            ye: config.ye,
            values,
        })
    }

    #[inline]
    pub fn index(&self, ix: usize, iy: usize) -> usize {
        ix + iy * self.ex
    }

    #[inline]
    pub fn get(&self, ix: usize, iy: usize) -> i32 {
        self.values[self.index(ix, iy)]
    }

    #[inline]
    pub fn set(&mut self, ix: usize, iy: usize, value: i32) {
        let idx = self.index(ix, iy);
        self.values[idx] = value;
    }

    pub fn min_value(&self) -> i32 {
        self.values.par_iter().copied().min().unwrap_or(0)
    }

    pub fn max_value(&self) -> i32 {
        self.values.par_iter().copied().max().unwrap_or(0)
    }

    /// World-space width and height.
    pub fn extent(&self) -> (f64, f64) {
        (self.xe - self.xs, self.ye - self.ys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ex: usize, ey: usize) -> GridConfig {
        GridConfig {
            ex,
            ey,
            xs: 0.0,
            xe: 1.0,
            ys: 0.0,
            ye: 2.0,
        }
    }

    #[test]
    fn indexing_is_row_major() {
        let mut grid = Grid2D::new(&config(4, 3)).unwrap();
        grid.set(1, 2, 7);
        assert_eq!(grid.values[1 + 2 * 4], 7);
        assert_eq!(grid.get(1, 2), 7);
    }

    #[test]
    fn min_max_over_values() {
        let mut grid = Grid2D::new(&config(3, 3)).unwrap();
        grid.set(0, 0, -4);
        grid.set(2, 2, 11);
        assert_eq!(grid.min_value(), -4);
        assert_eq!(grid.max_value(), 11);
    }
}
