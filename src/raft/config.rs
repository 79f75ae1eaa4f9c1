use std::time::Duration;

/// How a node answers RequestVote and AppendEntries RPCs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VotePolicy {
    /// Compare the caller's term against ours, step down on a higher term,
    /// grant at most one vote per term and reject stale leaders.
    #[default]
    TermChecked,
    /// Grant every vote and accept every heartbeat, echoing the caller's term.
    Unconditional,
}

#[derive(Debug, Clone)]
pub struct RaftConfig {
    pub node_id: u64,
    pub election_timeout_min: u64, // in milliseconds
    pub election_timeout_max: u64, // in milliseconds
    pub election_tick: u64,        // in milliseconds
    pub heartbeat_interval: u64,   // in milliseconds
    pub rpc_timeout: u64,          // in milliseconds
    pub max_inbound_connections: usize,
    pub log_capacity: usize,
    pub max_command_len: usize,
    pub vote_policy: VotePolicy,
}

impl RaftConfig {
    pub fn new(node_id: u64) -> Self {
        Self {
            node_id,
            election_timeout_min: 150,
            election_timeout_max: 300,
            election_tick: 10,
            heartbeat_interval: 50,
            rpc_timeout: 100,
            max_inbound_connections: 64,
            log_capacity: 1024,
            max_command_len: 256,
            vote_policy: VotePolicy::default(),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout)
    }
}
