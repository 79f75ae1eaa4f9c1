mod error;

pub mod client;
pub mod codec;
pub mod server;

pub use client::RaftClient;
pub use error::NetworkError;
pub use server::RaftServer;
