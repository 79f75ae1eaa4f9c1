use std::fmt;
use std::time::{Duration, Instant};

use super::Log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Follower,
    Candidate,
    Leader,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Follower => write!(f, "follower"),
            NodeRole::Candidate => write!(f, "candidate"),
            NodeRole::Leader => write!(f, "leader"),
        }
    }
}

/// The consensus record of one node. Lives for the whole process and is only
/// ever touched through the owning [`RaftNode`](super::RaftNode).
#[derive(Debug)]
pub struct NodeState {
    pub current_term: u64,
    pub voted_for: Option<u64>,
    pub role: NodeRole,
    pub leader_id: Option<u64>,
    pub commit_index: u64,
    pub last_applied: u64,
    pub log: Log,
    // Only meaningful while role == Candidate
    pub vote_count: usize,
    pub last_heartbeat: Instant,
    pub election_timeout: Duration,
}

impl NodeState {
    pub fn new(log: Log, election_timeout: Duration) -> Self {
        Self {
            current_term: 0,
            voted_for: None,
            role: NodeRole::Follower,
            leader_id: None,
            commit_index: 0,
            last_applied: 0,
            log,
            vote_count: 0,
            last_heartbeat: Instant::now(),
            election_timeout,
        }
    }

    pub fn since_last_heartbeat(&self) -> Duration {
        self.last_heartbeat.elapsed()
    }

    /// Candidate is at least as up to date as this log.
    pub fn is_log_up_to_date(&self, last_log_index: i64, last_log_term: u64) -> bool {
        let our_last_term = self.log.last_term();
        last_log_term > our_last_term
            || (last_log_term == our_last_term && last_log_index >= self.log.last_index())
    }
}
