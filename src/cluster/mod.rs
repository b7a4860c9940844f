// cluster
// In-process rank mesh. Every rank runs on its own thread and owns one
// endpoint of a fully connected mesh of unbounded channels, one channel per
// ordered rank pair. Channels preserve per-sender order, which is what the
// gather protocol relies on.

pub mod gather;

use crossbeam::channel::{unbounded, Receiver, Sender};
use ultraviolet::DVec2;

use crate::error::{EvolutionError, Result};
use crate::telemetry::TelemetrySample;

#[derive(Clone, Debug)]
pub enum Message {
    /// Velocity slice for the sender's partition at the given step.
    Velocities {
        step: usize,
        from: usize,
        slice: Vec<DVec2>,
    },
    /// End-of-run timing sample, worker to coordinator only.
    Telemetry { from: usize, sample: TelemetrySample },
}

/// One rank's view of the mesh: a sender and receiver per peer, `None` at the
/// rank's own slot.
pub struct Endpoint {
    rank: usize,
    senders: Vec<Option<Sender<Message>>>,
    receivers: Vec<Option<Receiver<Message>>>,
}

impl Endpoint {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.senders.len()
    }

    pub fn send(&self, to: usize, message: Message) -> Result<()> {
        let sender = self.senders[to].as_ref().ok_or_else(|| {
            EvolutionError::Communication(format!("rank {} sending to itself", self.rank))
        })?;
        sender.send(message).map_err(|_| {
            EvolutionError::Communication(format!(
                "rank {} lost its link to rank {to}",
                self.rank
            ))
        })
    }

    pub fn recv(&self, from: usize) -> Result<Message> {
        let receiver = self.receivers[from].as_ref().ok_or_else(|| {
            EvolutionError::Communication(format!("rank {} receiving from itself", self.rank))
        })?;
        receiver.recv().map_err(|_| {
            EvolutionError::Communication(format!(
                "rank {} saw rank {from} hang up",
                self.rank
            ))
        })
    }
}

/// Build a fully connected mesh of `size` endpoints.
pub fn mesh(size: usize) -> Vec<Endpoint> {
    let mut senders: Vec<Vec<Option<Sender<Message>>>> = (0..size)
        .map(|_| (0..size).map(|_| None).collect())
        .collect();
    let mut receivers: Vec<Vec<Option<Receiver<Message>>>> = (0..size)
        .map(|_| (0..size).map(|_| None).collect())
        .collect();

    for from in 0..size {
        for to in 0..size {
            if from == to {
                continue;
            }
            let (tx, rx) = unbounded();
            senders[from][to] = Some(tx);
            receivers[to][from] = Some(rx);
        }
    }

    senders
        .into_iter()
        .zip(receivers)
        .enumerate()
        .map(|(rank, (senders, receivers))| Endpoint {
            rank,
            senders,
            receivers,
        })
        .collect()
}
