// Election core: node state, role state machine, timer and heartbeat loops
pub mod raft;

// Peer registry and RPC transport
pub mod config;
pub mod network;

// Public exports
pub use config::{Peer, PeerRegistry};
pub use raft::{Raft, RaftConfig, RaftNode};
