// gather.rs
// Non-blocking all-gather of velocity partitions. `publish` sends the local
// slice to every peer and returns a handle; `wait` consumes the handle and
// merges every peer's slice into the local velocity array. A published gather
// may stay in flight across one whole step, overlapping with the next force
// accumulation.

use ultraviolet::DVec2;

use crate::cluster::{Endpoint, Message};
use crate::error::{EvolutionError, Result};
use crate::partition::PartitionTable;
use crate::profile_scope;

/// Proof that a gather was published for `step`. Must be awaited before the
/// next position pass and before shutdown.
#[must_use = "a published gather must be awaited"]
pub struct GatherHandle {
    step: usize,
}

pub struct VelocityGather {
    table: PartitionTable,
}

impl VelocityGather {
    pub fn new(table: PartitionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PartitionTable {
        &self.table
    }

    /// Send this rank's velocity slice to every other rank. Ranks with an
    /// empty partition (the coordinator, possibly idle workers) publish
    /// nothing but still get a handle so the wait side stays uniform.
    pub fn publish(&self, link: &Endpoint, vel: &[DVec2], step: usize) -> Result<GatherHandle> {
        profile_scope!("gather_publish");
        let own = self.table.range(link.rank());
        if !own.is_empty() {
            let slice = &vel[own];
            for peer in 0..self.table.size() {
                if peer == link.rank() {
                    continue;
                }
                link.send(
                    peer,
                    Message::Velocities {
                        step,
                        from: link.rank(),
                        slice: slice.to_vec(),
                    },
                )?;
            }
        }
        Ok(GatherHandle { step })
    }

    /// Block until every peer's slice for the handle's step has arrived and
    /// merge the slices into `vel`. Per-sender channel order guarantees the
    /// next message from each peer is the one for this step; anything else is
    /// a protocol violation.
    pub fn wait(&self, link: &Endpoint, handle: GatherHandle, vel: &mut [DVec2]) -> Result<()> {
        profile_scope!("gather_wait");
        for peer in 0..self.table.size() {
            if peer == link.rank() || self.table.count(peer) == 0 {
                continue;
            }
            match link.recv(peer)? {
                Message::Velocities { step, from, slice } => {
                    if step != handle.step || from != peer {
                        return Err(EvolutionError::Communication(format!(
                            "rank {}: expected step {} velocities from rank {peer}, \
                             got step {step} from rank {from}",
                            link.rank(),
                            handle.step
                        )));
                    }
                    let range = self.table.range(peer);
                    if slice.len() != range.len() {
                        return Err(EvolutionError::Communication(format!(
                            "rank {}: rank {peer} sent {} velocities, partition holds {}",
                            link.rank(),
                            slice.len(),
                            range.len()
                        )));
                    }
                    vel[range].copy_from_slice(&slice);
                }
                Message::Telemetry { from, .. } => {
                    return Err(EvolutionError::Communication(format!(
                        "rank {}: telemetry from rank {from} arrived mid-gather",
                        link.rank()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::mesh;

    fn marked(table: &PartitionTable, rank: usize, step: usize) -> Vec<DVec2> {
        // each rank fills its own slice with a recognizable value
        let mut vel = vec![DVec2::zero(); table.np()];
        for i in table.range(rank) {
            vel[i] = DVec2::new(rank as f64, (step * 100 + i) as f64);
        }
        vel
    }

    #[test]
    fn all_ranks_agree_after_one_round() {
        let table = PartitionTable::new(10, 4).unwrap();
        let nodes = mesh(4);

        let handles: Vec<_> = std::thread::scope(|s| {
            nodes
                .iter()
                .map(|link| {
                    let table = table.clone();
                    s.spawn(move || {
                        let gather = VelocityGather::new(table);
                        let mut vel = marked(gather.table(), link.rank(), 0);
                        let handle = gather.publish(link, &vel, 0)?;
                        gather.wait(link, handle, &mut vel)?;
                        Ok::<_, EvolutionError>(vel)
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect()
        });

        for vel in &handles[1..] {
            assert_eq!(vel, &handles[0]);
        }
        // every slot carries its owner's mark
        for rank in 1..4 {
            for i in table.range(rank) {
                assert_eq!(handles[0][i].x, rank as f64);
            }
        }
    }

    #[test]
    fn pipelined_steps_arrive_in_order() {
        let table = PartitionTable::new(6, 3).unwrap();
        let nodes = mesh(3);

        let results: Vec<_> = std::thread::scope(|s| {
            nodes
                .iter()
                .map(|link| {
                    let table = table.clone();
                    s.spawn(move || {
                        let gather = VelocityGather::new(table);
                        let mut vel = marked(gather.table(), link.rank(), 0);
                        // publish step 0, update the owned slice locally,
                        // publish step 1, then drain both in order
                        let h0 = gather.publish(link, &vel, 0)?;
                        let own = gather.table().range(link.rank());
                        let step1 = marked(gather.table(), link.rank(), 1);
                        vel[own.clone()].copy_from_slice(&step1[own]);
                        let h1 = gather.publish(link, &vel, 1)?;
                        gather.wait(link, h0, &mut vel)?;
                        gather.wait(link, h1, &mut vel)?;
                        Ok::<_, EvolutionError>(vel)
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect()
        });

        // the second wait must have overwritten every owned slot with the
        // step 1 marks, on every rank
        for vel in &results {
            for rank in 1..3 {
                for i in table.range(rank) {
                    assert_eq!(vel[i].y, (100 + i) as f64);
                }
            }
        }
    }
}
