// field.rs
// Computes the generating field: a fractal-style escape-time iteration over
// the grid. Cells that never escape within the iteration cap store 0; cells
// that escape store the iteration at which they did.

use rayon::prelude::*;

use crate::config;
use crate::grid::Grid2D;
use crate::profile_scope;

pub fn generate(grid: &mut Grid2D, max_iterations: usize) {
    profile_scope!("generating_field");
    let ex = grid.ex;
    let (width, height) = grid.extent();
    let xinc = width / ex as f64;
    let yinc = height / grid.ey as f64;
    let (xs, ys) = (grid.xs, grid.ys);

    // Rows are independent; the per-cell iteration count varies wildly, so
    // let rayon steal between rows.
    grid.values
        .par_chunks_mut(ex)
        .enumerate()
        .for_each(|(iy, row)| {
            for (ix, cell) in row.iter_mut().enumerate() {
                let ca = xinc * ix as f64 + xs;
                let cb = yinc * iy as f64 + ys;
                *cell = escape_iteration(ca, cb, max_iterations) as i32;
            }
        });
}

fn escape_iteration(ca: f64, cb: f64, max_iterations: usize) -> usize {
    let mut rad = ca.hypot(cb);
    let mut zan = 0.0_f64;
    let mut zbn = 0.0_f64;
    let mut iz = 0;
    for it in 1..=max_iterations {
        iz = it;
        if rad > config::FIELD_ESCAPE_RADIUS {
            break;
        }
        let za = zan;
        let zb = zbn;
        zan = ca + (za - zb) * (za + zb);
        zbn = 2.0 * (za * zb + cb / 2.0);
        rad = zan.hypot(zbn);
    }
    // Cells still bounded at the cap count as interior.
    if iz >= max_iterations {
        iz = 0;
    }
    iz
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::GridConfig;

    fn sample_grid() -> Grid2D {
        Grid2D::new(&GridConfig {
            ex: 32,
            ey: 32,
            xs: -2.0,
            xe: 2.0,
            ys: -2.0,
            ye: 2.0,
        })
        .unwrap()
    }

    #[test]
    fn values_stay_within_iteration_cap() {
        let mut grid = sample_grid();
        generate(&mut grid, 100);
        assert!(grid
            .values
            .iter()
            .all(|&v| (0..100).contains(&(v as usize))));
    }

    #[test]
    fn generation_is_deterministic() {
        let mut a = sample_grid();
        let mut b = sample_grid();
        generate(&mut a, 250);
        generate(&mut b, 250);
        assert_eq!(a.values, b.values);
    }

    #[test]
    fn interior_cells_store_zero_and_far_cells_escape_fast() {
        // The origin never escapes; a point far outside the escape radius
        // leaves on the first iteration.
        assert_eq!(escape_iteration(0.0, 0.0, 500), 0);
        assert_eq!(escape_iteration(3.0, 3.0, 500), 1);
    }
}
