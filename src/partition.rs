// partition.rs
// Splits the population index space over the worker ranks. Rank 0 is the
// coordinator and owns the empty range; workers get contiguous, even stripes
// with the last worker absorbing the remainder. The displacement/count
// tables drive the velocity gather.

use std::ops::Range;

use crate::error::{EvolutionError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionTable {
    displs: Vec<usize>,
    counts: Vec<usize>,
}

impl PartitionTable {
    /// Deterministic: identical `(np, size)` always yields identical ranges.
    pub fn new(np: usize, size: usize) -> Result<Self> {
        if size < 2 {
            return Err(EvolutionError::MalformedPartition { size });
        }
        let workers = size - 1;
        let step = np / workers;

        let mut displs = vec![0; size];
        let mut counts = vec![0; size];
        // rank 0 keeps the empty range [0, 0)
        for rank in 1..size {
            displs[rank] = (rank - 1) * step;
            counts[rank] = step;
        }
        // last worker absorbs the remainder
        let last_start = (workers - 1) * step;
        displs[size - 1] = last_start;
        counts[size - 1] = np - last_start;

        Ok(Self { displs, counts })
    }

    /// Number of ranks, coordinator included.
    pub fn size(&self) -> usize {
        self.displs.len()
    }

    /// Total particle count covered by the table.
    pub fn np(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn displacement(&self, rank: usize) -> usize {
        self.displs[rank]
    }

    pub fn count(&self, rank: usize) -> usize {
        self.counts[rank]
    }

    /// The half-open index range owned by `rank`.
    pub fn range(&self, rank: usize) -> Range<usize> {
        self.displs[rank]..self.displs[rank] + self.counts[rank]
    }
}
