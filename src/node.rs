// node.rs
// Per-rank roles. The coordinator never computes forces; it drives the output
// sinks (frames, dumps, statistics) each step. Workers zero and refill their
// force partition. Both run inside the same step loop in the engine.

use std::ops::Range;

use crate::engine::SimulationClock;
use crate::error::Result;
use crate::forces::ForceAccumulator;
use crate::grid::Grid2D;
use crate::input::OutputConfig;
use crate::io::{self, StatsWriter};
use crate::partition::PartitionTable;
use crate::population::Population;
use crate::render::Visualizer;
use ultraviolet::DVec2;

pub struct Coordinator {
    visualizer: Visualizer,
    stats: StatsWriter,
    output: OutputConfig,
}

impl Coordinator {
    pub fn new(canvas: Grid2D, output: &OutputConfig) -> Result<Self> {
        std::fs::create_dir_all(&output.directory)?;
        let mut output = output.clone();
        output.dump_interval = output.dump_interval.max(1);
        Ok(Self {
            visualizer: Visualizer::new(canvas, &output.directory),
            stats: StatsWriter::new(&output.directory),
            output,
        })
    }

    fn advance(&mut self, population: &Population, clock: &SimulationClock) -> Result<()> {
        let step = clock.step();
        println!("step {} of {}", step + 1, clock.total_steps());
        self.visualizer.render(population, step)?;
        if step % self.output.dump_interval == 0 {
            io::dump_population(&self.output, population, step)?;
        }
        self.stats
            .append(step, population.len(), &population.stats())?;
        Ok(())
    }
}

pub struct Worker {
    forces: ForceAccumulator,
    owned: Range<usize>,
}

impl Worker {
    fn advance(&mut self, population: &Population) {
        self.forces.reset();
        self.forces.accumulate(self.owned.clone(), population);
    }
}

pub enum Node {
    Coordinator(Coordinator),
    Worker(Worker),
}

impl Node {
    pub fn coordinator(canvas: Grid2D, output: &OutputConfig) -> Result<Self> {
        Ok(Self::Coordinator(Coordinator::new(canvas, output)?))
    }

    pub fn worker(table: &PartitionTable, rank: usize) -> Result<Self> {
        Ok(Self::Worker(Worker {
            forces: ForceAccumulator::new(table.np())?,
            owned: table.range(rank),
        }))
    }

    /// One step's role-specific work: sinks on the coordinator, force
    /// accumulation on workers. Reads positions only, so it may overlap with
    /// a velocity gather still in flight.
    pub fn advance(&mut self, population: &Population, clock: &SimulationClock) -> Result<()> {
        match self {
            Node::Coordinator(c) => c.advance(population, clock),
            Node::Worker(w) => {
                w.advance(population);
                Ok(())
            }
        }
    }

    pub fn forces(&self) -> &[DVec2] {
        match self {
            Node::Coordinator(_) => &[],
            Node::Worker(w) => w.forces.values(),
        }
    }
}
