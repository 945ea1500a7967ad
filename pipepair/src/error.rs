//! Error taxonomy of the coordinator and its units

use std::io;

use crate::fdtable::DescriptorsExhausted;
use crate::unit::Role;

/// A pipe could not be created
#[derive(Debug, thiserror::Error)]
#[error("pipe: {source}")]
pub struct ResourceError {
    #[from]
    pub source: DescriptorsExhausted,
}

/// A unit could not be started (EAGAIN)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("spawn {role}: unit table full (limit {limit})")]
pub struct SpawnError {
    pub role: Role,
    pub limit: usize,
}

/// A producer write did not move a whole message
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("write: short transfer of {written} of {expected} bytes")]
    Short { written: usize, expected: usize },

    #[error("write: {0}")]
    Io(#[from] io::Error),
}

/// Termination of a unit could not be observed
#[derive(Debug, thiserror::Error)]
#[error("wait: {reason}")]
pub struct WaitError {
    pub reason: String,
}

/// Failure of a coordinator operation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Spawn(#[from] SpawnError),
}
