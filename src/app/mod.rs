use std::path::Path;
use std::time::Instant;

use crate::engine::{self, ClusterParams};
use crate::error::Result;
use crate::grid::Grid2D;
use crate::input::InputDeck;
use crate::population::Population;
use crate::{config, field};

pub fn run(input: &Path) -> Result<()> {
    // Global rayon pool with threads = max(3, total cores) - 2. The rank
    // threads themselves are plain std threads on top of this pool.
    let threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(config::MIN_THREADS)
        .max(config::MIN_THREADS)
        - config::THREADS_LEAVE_FREE;
    let _ = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global();

    let deck = InputDeck::load_from_file(input)?;

    let t0 = Instant::now();
    let mut field_grid = Grid2D::new(&deck.gen_field_grid)?;
    field::generate(&mut field_grid, deck.evolution.field_iterations);
    println!(
        "generating field: {}x{} cells in {:.2?}",
        field_grid.ex,
        field_grid.ey,
        t0.elapsed()
    );

    let canvas = Grid2D::new(&deck.particle_grid)?;
    let population = Population::from_field(&field_grid, &canvas)?;
    println!("population: {} particles", population.len());

    let params = ClusterParams {
        ranks: deck.evolution.ranks,
        steps: deck.evolution.steps,
        dt: deck.evolution.dt,
    };
    let t0 = Instant::now();
    let outcome = engine::run_cluster(&population, &canvas, &params, &deck.output)?;
    println!(
        "evolution: {} steps on {} ranks in {:.2?}",
        params.steps,
        params.ranks,
        t0.elapsed()
    );
    println!(
        "per-worker means: compute {:.2?}, comm {:.2?}",
        outcome.telemetry.mean_compute, outcome.telemetry.mean_comm
    );

    #[cfg(feature = "profiling")]
    crate::PROFILER.lock().print_and_clear();

    Ok(())
}
