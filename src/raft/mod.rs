mod config;
mod error;
mod log;
mod node;
mod rpc;
mod state;

pub mod election;
pub mod heartbeat;

pub use self::config::{RaftConfig, VotePolicy};
pub use self::error::RaftError;
pub use self::log::{Log, LogEntry};
pub use self::node::{majority, Event, Outbound, RaftNode};
pub use self::rpc::{AppendEntriesArgs, AppendEntriesReply, RequestVoteArgs, RequestVoteReply};
pub use self::state::{NodeRole, NodeState};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
// Use external log crate, not our own log module
use ::log::info;

use crate::config::PeerRegistry;
use crate::network::RaftServer;

/// The node record shared by the timer, the heartbeat driver and every
/// inbound connection. Hold the lock only while mutating; never across I/O.
pub type SharedNode = Arc<Mutex<RaftNode>>;

/// Handles to the background loops started by [`Raft::start`].
pub struct RaftTasks {
    pub election_timer: JoinHandle<()>,
    pub heartbeat: JoinHandle<()>,
}

impl RaftTasks {
    pub fn abort(&self) {
        self.election_timer.abort();
        self.heartbeat.abort();
    }
}

// Main Raft service
pub struct Raft {
    pub node: SharedNode,
    peers: PeerRegistry,
    config: RaftConfig,
}

impl Raft {
    pub fn new(config: RaftConfig, peers: PeerRegistry) -> Self {
        let node = RaftNode::new(config.clone(), peers.len());
        Self {
            node: Arc::new(Mutex::new(node)),
            peers,
            config,
        }
    }

    pub fn config(&self) -> &RaftConfig {
        &self.config
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    /// Binds the inbound RPC listener for this node.
    pub async fn bind(&self, addr: &str) -> Result<RaftServer, RaftError> {
        let server = RaftServer::bind(addr, Arc::clone(&self.node), &self.config).await?;
        Ok(server)
    }

    /// Spawns the election timer and the heartbeat driver.
    pub fn start(&self) -> RaftTasks {
        info!(
            "Starting node {} as follower with {} peers",
            self.config.node_id,
            self.peers.len()
        );

        let election_timer = tokio::spawn(election::run_election_timer(
            Arc::clone(&self.node),
            self.peers.clone(),
            Duration::from_millis(self.config.election_tick),
            self.config.rpc_timeout(),
        ));

        let heartbeat = tokio::spawn(heartbeat::run_heartbeat_driver(
            Arc::clone(&self.node),
            self.peers.clone(),
            Duration::from_millis(self.config.heartbeat_interval),
            self.config.rpc_timeout(),
        ));

        RaftTasks {
            election_timer,
            heartbeat,
        }
    }
}
