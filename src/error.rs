// Error taxonomy for the distributed evolution. Any of these is job-fatal:
// there is no retry or partial-result salvage, the whole run terminates with
// a diagnostic naming the failing stage.

use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvolutionError {
    /// The rank roster is too small to assign at least one worker.
    #[error("partitioning failed: need a coordinator plus at least one worker, got {size} rank(s)")]
    MalformedPartition { size: usize },

    /// A per-rank buffer could not be sized. No rank can continue with a
    /// mismatched partition table, so this aborts the run.
    #[error("allocation failed while sizing {stage}: {source}")]
    Allocation {
        stage: &'static str,
        source: TryReserveError,
    },

    /// The underlying transport reported failure (a peer hung up, or a
    /// message arrived out of contract).
    #[error("communication failed: {0}")]
    Communication(String),

    /// The input deck could not be parsed or failed validation.
    #[error("input deck error: {0}")]
    Input(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EvolutionError>;
