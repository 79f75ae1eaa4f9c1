use thiserror::Error;

use crate::network::NetworkError;

#[derive(Error, Debug)]
pub enum RaftError {
    #[error("Log is full (capacity {capacity})")]
    LogFull { capacity: usize },

    #[error("Command too long: {len} bytes (maximum {max})")]
    CommandTooLong { len: usize, max: usize },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}
