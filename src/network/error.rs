use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RPC timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(u32),

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u16),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),
}
