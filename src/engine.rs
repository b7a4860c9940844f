// engine.rs
// The evolution loop. Every rank runs one `Evolution` over the same step
// sequence: role-specific work, await of the previous step's gather,
// integration, publish of the new velocities. The publish from step t is
// awaited at the start of step t+1, so communication overlaps with the next
// force accumulation; the last handle is drained during shutdown.

use std::time::{Duration, Instant};

use crate::cluster::gather::{GatherHandle, VelocityGather};
use crate::cluster::{mesh, Endpoint, Message};
use crate::error::{EvolutionError, Result};
use crate::grid::Grid2D;
use crate::input::OutputConfig;
use crate::integrator::integrate;
use crate::node::Node;
use crate::partition::PartitionTable;
use crate::population::Population;
use crate::telemetry::{TelemetryReport, TelemetrySample};

#[derive(Clone, Copy, Debug)]
pub struct SimulationClock {
    step: usize,
    total_steps: usize,
    dt: f64,
}

impl SimulationClock {
    pub fn new(total_steps: usize, dt: f64) -> Self {
        Self {
            step: 0,
            total_steps,
            dt,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn finished(&self) -> bool {
        self.step >= self.total_steps
    }

    pub fn advance(&mut self) {
        self.step += 1;
    }
}

/// Evolution parameters shared by every rank.
#[derive(Clone, Copy, Debug)]
pub struct ClusterParams {
    pub ranks: usize,
    pub steps: usize,
    pub dt: f64,
}

/// One rank's view of the running evolution.
pub struct Evolution {
    clock: SimulationClock,
    population: Population,
    gather: VelocityGather,
    link: Endpoint,
    node: Node,
    pending: Option<GatherHandle>,
    telemetry: TelemetrySample,
}

/// What a single rank hands back after shutdown. Only the coordinator
/// carries a telemetry report.
pub struct EvolutionOutput {
    pub population: Population,
    pub telemetry: TelemetrySample,
    pub report: Option<TelemetryReport>,
}

impl Evolution {
    pub fn new(
        population: Population,
        gather: VelocityGather,
        link: Endpoint,
        node: Node,
        steps: usize,
        dt: f64,
    ) -> Self {
        Self {
            clock: SimulationClock::new(steps, dt),
            population,
            gather,
            link,
            node,
            pending: None,
            telemetry: TelemetrySample::default(),
        }
    }

    pub fn run(mut self) -> Result<EvolutionOutput> {
        while !self.clock.finished() {
            self.step()?;
        }
        self.finalize()
    }

    fn step(&mut self) -> Result<()> {
        let step_start = Instant::now();
        let mut comm = Duration::ZERO;

        // role work first: it reads positions only, so it is safe to run
        // while the previous step's gather is still in flight
        self.node.advance(&self.population, &self.clock)?;

        if let Some(handle) = self.pending.take() {
            let t = Instant::now();
            self.gather
                .wait(&self.link, handle, &mut self.population.vel)?;
            comm += t.elapsed();
        }

        let owned = self.gather.table().range(self.link.rank());
        integrate(
            &mut self.population,
            self.node.forces(),
            owned,
            self.clock.dt(),
        );

        let t = Instant::now();
        self.pending = Some(self.gather.publish(
            &self.link,
            &self.population.vel,
            self.clock.step(),
        )?);
        comm += t.elapsed();

        self.telemetry.comm += comm;
        self.telemetry.compute += step_start.elapsed().saturating_sub(comm);
        self.clock.advance();
        Ok(())
    }

    /// Drain the last in-flight gather, then exchange telemetry: workers send
    /// their sample to the coordinator, which reduces them into the report.
    fn finalize(mut self) -> Result<EvolutionOutput> {
        if let Some(handle) = self.pending.take() {
            self.gather
                .wait(&self.link, handle, &mut self.population.vel)?;
        }

        let report = match &self.node {
            Node::Worker(_) => {
                self.link.send(
                    0,
                    Message::Telemetry {
                        from: self.link.rank(),
                        sample: self.telemetry,
                    },
                )?;
                None
            }
            Node::Coordinator(_) => {
                let mut samples = Vec::with_capacity(self.link.size() - 1);
                for peer in 1..self.link.size() {
                    match self.link.recv(peer)? {
                        Message::Telemetry { sample, .. } => samples.push(sample),
                        Message::Velocities { step, from, .. } => {
                            return Err(EvolutionError::Communication(format!(
                                "stray step {step} velocities from rank {from} at shutdown"
                            )));
                        }
                    }
                }
                Some(TelemetryReport::from_samples(&samples))
            }
        };

        Ok(EvolutionOutput {
            population: self.population,
            telemetry: self.telemetry,
            report,
        })
    }
}

/// Final state of a cluster run, as seen by the coordinator.
pub struct EvolutionOutcome {
    pub population: Population,
    pub telemetry: TelemetryReport,
}

/// Run the full evolution: one worker thread per worker rank, the coordinator
/// on the calling thread. Every rank starts from its own replica of the
/// population; the returned population is the coordinator's, identical to
/// every worker's after the final gather.
pub fn run_cluster(
    population: &Population,
    canvas: &Grid2D,
    params: &ClusterParams,
    output: &OutputConfig,
) -> Result<EvolutionOutcome> {
    let table = PartitionTable::new(population.len(), params.ranks)?;
    let mut endpoints = mesh(params.ranks);
    let coordinator_link = endpoints.remove(0);

    let output_state = std::thread::scope(|s| -> Result<EvolutionOutput> {
        let mut workers = Vec::with_capacity(endpoints.len());
        for link in endpoints {
            let table = table.clone();
            let replica = population.clone();
            let (steps, dt) = (params.steps, params.dt);
            workers.push(s.spawn(move || -> Result<()> {
                let node = Node::worker(&table, link.rank())?;
                let evolution =
                    Evolution::new(replica, VelocityGather::new(table), link, node, steps, dt);
                evolution.run()?;
                Ok(())
            }));
        }

        let node = Node::coordinator(canvas.clone(), output)?;
        let evolution = Evolution::new(
            population.clone(),
            VelocityGather::new(table.clone()),
            coordinator_link,
            node,
            params.steps,
            params.dt,
        );
        let result = evolution.run();

        // a worker failure explains any coordinator-side channel error, so
        // it takes precedence
        let mut worker_error = None;
        for handle in workers {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    worker_error.get_or_insert(e);
                }
                Err(_) => {
                    worker_error.get_or_insert(EvolutionError::Communication(
                        "a worker rank panicked".into(),
                    ));
                }
            }
        }
        if let Some(e) = worker_error {
            return Err(e);
        }
        result
    })?;

    let telemetry = output_state.report.ok_or_else(|| {
        EvolutionError::Communication("coordinator finished without a telemetry report".into())
    })?;
    Ok(EvolutionOutcome {
        population: output_state.population,
        telemetry,
    })
}
