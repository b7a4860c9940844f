// render.rs
// Projects the particle population onto the particle grid and writes one
// plain-text PPM frame per step. The color range is frozen at the first
// frame so the whole sequence shares a palette.

use once_cell::sync::Lazy;
use palette::{Hsluv, IntoColor, Srgb};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config;
use crate::error::Result;
use crate::grid::Grid2D;
use crate::population::Population;
use crate::profile_scope;

static COLORMAP: Lazy<Vec<[u8; 3]>> = Lazy::new(|| {
    (0..config::COLOR_LEVELS)
        .map(|i| {
            let t = i as f32 / (config::COLOR_LEVELS - 1) as f32;
            let start_h = -100.0;
            let end_h = 80.0;
            let h = start_h + (end_h - start_h) * t;
            let s = 100.0;
            let l = t * 100.0;
            let rgb: Srgb = Hsluv::new(h, s, l).into_color();
            [
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ]
        })
        .collect()
});

pub struct Visualizer {
    grid: Grid2D,
    /// Color range captured from the first frame.
    range: Option<(i32, i32)>,
    dir: PathBuf,
}

impl Visualizer {
    pub fn new(grid: Grid2D, dir: &Path) -> Self {
        Self {
            grid,
            range: None,
            dir: dir.to_path_buf(),
        }
    }

    pub fn render(&mut self, population: &Population, step: usize) -> Result<()> {
        profile_scope!("render_frame");
        self.deposit(population);
        self.write_ppm(step)
    }

    /// Splat each particle onto the grid as a 5-point stamp whose intensity
    /// encodes the weight on a 0..=10 scale. Particles in the one-cell border
    /// or outside the grid are skipped.
    fn deposit(&mut self, population: &Population) {
        self.grid.values.par_iter_mut().for_each(|v| *v = 0);

        let stats = population.stats();
        let wint = stats.wmax - stats.wmin;
        let (width, height) = self.grid.extent();
        let (ex, ey) = (self.grid.ex, self.grid.ey);

        for (n, p) in population.pos.iter().enumerate() {
            let fx = ex as f64 * (p.x - self.grid.xs) / width;
            let fy = ey as f64 * (p.y - self.grid.ys) / height;
            if !fx.is_finite() || !fy.is_finite() {
                continue;
            }
            let (ix, iy) = (fx as isize, fy as isize);
            // keep a one-cell border free
            if ix <= 0 || ix >= ex as isize - 1 || iy <= 0 || iy >= ey as isize - 1 {
                continue;
            }
            let (ix, iy) = (ix as usize, iy as usize);
            let wp = if wint > 0.0 {
                (10.0 * (population.weight[n] - stats.wmin) / wint) as i32
            } else {
                0
            };
            self.grid.set(ix, iy, wp);
            self.grid.set(ix - 1, iy, wp);
            self.grid.set(ix + 1, iy, wp);
            self.grid.set(ix, iy - 1, wp);
            self.grid.set(ix, iy + 1, wp);
        }
    }

    fn write_ppm(&mut self, step: usize) -> Result<()> {
        let (rmin, rmax) = *self
            .range
            .get_or_insert((self.grid.min_value(), self.grid.max_value()));

        let path = self.dir.join(format!("stage{step:03}.ppm"));
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "P3")?;
        writeln!(out, "{} {}", self.grid.ex, self.grid.ey)?;
        writeln!(out, "255")?;

        let span = (rmax - rmin).max(1) as f64;
        let mut per_line = 0;
        for iy in 0..self.grid.ey {
            for ix in 0..self.grid.ex {
                let value = self.grid.get(ix, iy).clamp(rmin, rmax);
                let vp = ((value - rmin) as f64 * (config::COLOR_LEVELS - 1) as f64 / span)
                    as usize;
                let [r, g, b] = COLORMAP[vp.min(config::COLOR_LEVELS - 1)];
                write!(out, " {r:3} {g:3} {b:3}")?;
                per_line += 1;
                if per_line >= 10 {
                    writeln!(out)?;
                    per_line = 0;
                }
            }
            writeln!(out)?;
            per_line = 0;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::GridConfig;
    use ultraviolet::DVec2;

    fn canvas() -> Grid2D {
        Grid2D::new(&GridConfig {
            ex: 16,
            ey: 16,
            xs: 0.0,
            xe: 8.0,
            ys: 0.0,
            ye: 8.0,
        })
        .unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("particle_cluster_render_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn one_particle() -> Population {
        Population::new(vec![5.0], vec![DVec2::new(4.0, 4.0)], vec![DVec2::zero()])
    }

    #[test]
    fn writes_a_parseable_ppm_header() {
        let dir = temp_dir("header");
        let mut vis = Visualizer::new(canvas(), &dir);
        vis.render(&one_particle(), 0).unwrap();
        let content = std::fs::read_to_string(dir.join("stage000.ppm")).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("P3"));
        assert_eq!(lines.next(), Some("16 16"));
        assert_eq!(lines.next(), Some("255"));
    }

    #[test]
    fn stamp_covers_the_cross_around_the_cell() {
        let dir = temp_dir("stamp");
        let mut vis = Visualizer::new(canvas(), &dir);
        let pop = Population::new(
            vec![1.0, 2.0],
            vec![DVec2::new(2.0, 2.0), DVec2::new(6.0, 6.0)],
            vec![DVec2::zero(); 2],
        );
        vis.deposit(&pop);
        // heavier particle lands at cell (12, 12) with full intensity
        assert_eq!(vis.grid.get(12, 12), 10);
        assert_eq!(vis.grid.get(11, 12), 10);
        assert_eq!(vis.grid.get(13, 12), 10);
        assert_eq!(vis.grid.get(12, 11), 10);
        assert_eq!(vis.grid.get(12, 13), 10);
        // lighter one maps to zero intensity
        assert_eq!(vis.grid.get(4, 4), 0);
    }

    #[test]
    fn border_and_outside_particles_are_skipped() {
        let dir = temp_dir("border");
        let mut vis = Visualizer::new(canvas(), &dir);
        let pop = Population::new(
            vec![1.0, 2.0],
            vec![DVec2::new(0.1, 4.0), DVec2::new(100.0, 4.0)],
            vec![DVec2::zero(); 2],
        );
        vis.deposit(&pop);
        assert!(vis.grid.values.iter().all(|&v| v == 0));
    }

    #[test]
    fn color_range_is_frozen_after_the_first_frame() {
        let dir = temp_dir("frozen");
        let mut vis = Visualizer::new(canvas(), &dir);
        vis.render(&one_particle(), 0).unwrap();
        let frozen = vis.range;
        assert!(frozen.is_some());
        vis.render(&one_particle(), 1).unwrap();
        assert_eq!(vis.range, frozen);
        assert!(dir.join("stage001.ppm").exists());
    }
}
