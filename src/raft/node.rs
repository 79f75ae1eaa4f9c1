use rand::Rng;
use std::time::{Duration, Instant};
// Use external log crate, not our own log module
use ::log::{debug, info};

use super::{
    AppendEntriesArgs, AppendEntriesReply, Log, NodeRole, NodeState, RaftConfig,
    RequestVoteArgs, RequestVoteReply, VotePolicy,
};

/// Inputs to the role state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The election timer expired without hearing from a leader.
    Timeout,
    /// A leader's AppendEntries was accepted.
    HeartbeatReceived,
    /// A peer answered the RequestVote sent for `election_term`.
    VoteResponseReceived {
        election_term: u64,
        reply_term: u64,
        granted: bool,
    },
}

/// Network work the state machine asks its caller to perform once the node
/// lock has been released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outbound {
    /// Send this RequestVote to every peer, in registry order, and feed each
    /// reply back as [`Event::VoteResponseReceived`].
    RequestVotes(RequestVoteArgs),
}

/// Votes needed to win an election in a cluster of `peer_count + 1` nodes.
pub fn majority(peer_count: usize) -> usize {
    (peer_count + 1) / 2 + 1
}

pub struct RaftNode {
    id: u64,
    config: RaftConfig,
    peer_count: usize,
    state: NodeState,
}

impl RaftNode {
    pub fn new(config: RaftConfig, peer_count: usize) -> Self {
        let log = Log::new(config.log_capacity, config.max_command_len);
        let election_timeout = random_election_timeout(&config);

        Self {
            id: config.node_id,
            state: NodeState::new(log, election_timeout),
            config,
            peer_count,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn role(&self) -> NodeRole {
        self.state.role
    }

    pub fn current_term(&self) -> u64 {
        self.state.current_term
    }

    pub fn is_leader(&self) -> bool {
        matches!(self.state.role, NodeRole::Leader)
    }

    pub fn majority(&self) -> usize {
        majority(self.peer_count)
    }

    pub fn election_timeout_elapsed(&self) -> bool {
        !self.is_leader() && self.state.since_last_heartbeat() >= self.state.election_timeout
    }

    /// Draws a fresh election timeout and restarts the countdown from now.
    pub fn reset_election_timer(&mut self) {
        self.state.election_timeout = random_election_timeout(&self.config);
        self.state.last_heartbeat = Instant::now();
    }

    /// Applies one event to the current role. Never blocks and never performs
    /// I/O; any RPCs the transition calls for are returned to the caller.
    pub fn handle(&mut self, event: Event) -> Option<Outbound> {
        match (self.state.role, event) {
            (NodeRole::Follower, Event::Timeout) => Some(self.become_candidate()),
            (NodeRole::Candidate, Event::Timeout) => {
                info!(
                    "Node {} election for term {} timed out, restarting",
                    self.id, self.state.current_term
                );
                Some(self.become_candidate())
            }
            (NodeRole::Leader, Event::Timeout) => {
                // Heartbeats are owned by the heartbeat driver.
                None
            }
            (NodeRole::Follower, Event::HeartbeatReceived) => {
                self.state.last_heartbeat = Instant::now();
                debug!("Node {} received heartbeat, resetting timeout", self.id);
                None
            }
            (_, Event::HeartbeatReceived) => None,
            (
                _,
                Event::VoteResponseReceived {
                    election_term,
                    reply_term,
                    granted,
                },
            ) => {
                self.handle_vote_response(election_term, reply_term, granted);
                None
            }
        }
    }

    fn handle_vote_response(&mut self, election_term: u64, reply_term: u64, granted: bool) {
        if self.observe_term(reply_term) {
            return;
        }

        // Replies for an earlier election, or arriving after stepping down, are ignored
        if self.state.role == NodeRole::Follower || election_term != self.state.current_term {
            debug!(
                "Node {} ignoring vote response for term {} (now {} in term {})",
                self.id, election_term, self.state.role, self.state.current_term
            );
            return;
        }

        if granted {
            self.state.vote_count += 1;
            debug!(
                "Node {} vote granted, count = {}",
                self.id, self.state.vote_count
            );
        }

        // Late grants still count once leader, but only a candidate is promoted
        if self.state.vote_count >= self.majority() {
            self.become_leader();
        }
    }

    /// Steps down if `term` is newer than ours. Returns true when it did.
    pub fn observe_term(&mut self, term: u64) -> bool {
        if term > self.state.current_term {
            self.become_follower(term);
            true
        } else {
            false
        }
    }

    pub fn become_follower(&mut self, term: u64) {
        debug_assert!(term >= self.state.current_term);

        self.state.role = NodeRole::Follower;
        self.state.current_term = term;
        self.state.voted_for = None;
        self.state.vote_count = 0;
        self.state.leader_id = None;

        info!("Node {} transition to FOLLOWER (term {term})", self.id);
    }

    fn become_candidate(&mut self) -> Outbound {
        self.state.role = NodeRole::Candidate;
        self.state.current_term += 1;
        self.state.voted_for = Some(self.id);
        self.state.vote_count = 1;
        self.state.leader_id = None;

        // Restart the countdown before any RPC goes out so the timer does not
        // fire again while the vote requests are in flight.
        self.reset_election_timer();

        info!(
            "Node {} transition to CANDIDATE (term {}), requesting votes from {} peers",
            self.id, self.state.current_term, self.peer_count
        );

        let args = RequestVoteArgs {
            term: self.state.current_term,
            candidate_id: self.id,
            last_log_index: self.state.log.last_index(),
            last_log_term: self.state.log.last_term(),
        };

        // A single-node cluster wins on its own vote
        if self.state.vote_count >= self.majority() {
            self.become_leader();
        }

        Outbound::RequestVotes(args)
    }

    fn become_leader(&mut self) {
        if self.state.role != NodeRole::Candidate {
            return;
        }

        self.state.role = NodeRole::Leader;
        self.state.leader_id = Some(self.id);

        info!(
            "Node {} transition to LEADER (term {}) with {} votes",
            self.id, self.state.current_term, self.state.vote_count
        );
    }

    /// Arguments for the next heartbeat round, or `None` when not leading.
    pub fn heartbeat_args(&self) -> Option<AppendEntriesArgs> {
        if !self.is_leader() {
            return None;
        }

        Some(AppendEntriesArgs {
            term: self.state.current_term,
            leader_id: self.id,
            prev_log_index: self.state.log.last_index(),
            prev_log_term: self.state.log.last_term(),
            leader_commit: self.state.commit_index,
        })
    }

    pub fn handle_request_vote(&mut self, args: &RequestVoteArgs) -> RequestVoteReply {
        if self.config.vote_policy == VotePolicy::Unconditional {
            return RequestVoteReply {
                term: args.term,
                vote_granted: true,
            };
        }

        if args.term < self.state.current_term {
            debug!(
                "Node {} rejecting vote for {}: stale term {} < {}",
                self.id, args.candidate_id, args.term, self.state.current_term
            );
            return RequestVoteReply {
                term: self.state.current_term,
                vote_granted: false,
            };
        }

        self.observe_term(args.term);

        let can_vote = self
            .state
            .voted_for
            .is_none_or(|voted| voted == args.candidate_id);
        let vote_granted =
            can_vote && self.state.is_log_up_to_date(args.last_log_index, args.last_log_term);

        if vote_granted {
            self.state.voted_for = Some(args.candidate_id);
            self.state.last_heartbeat = Instant::now();
            info!(
                "Node {} voted for {} in term {}",
                self.id, args.candidate_id, self.state.current_term
            );
        }

        RequestVoteReply {
            term: self.state.current_term,
            vote_granted,
        }
    }

    pub fn handle_append_entries(&mut self, args: &AppendEntriesArgs) -> AppendEntriesReply {
        if self.config.vote_policy == VotePolicy::Unconditional {
            self.handle(Event::HeartbeatReceived);
            return AppendEntriesReply {
                term: args.term,
                success: true,
            };
        }

        if args.term < self.state.current_term {
            debug!(
                "Node {} rejecting heartbeat from {}: stale term {} < {}",
                self.id, args.leader_id, args.term, self.state.current_term
            );
            return AppendEntriesReply {
                term: self.state.current_term,
                success: false,
            };
        }

        if !self.observe_term(args.term) && self.state.role != NodeRole::Follower {
            // Another node already won this term; keep our vote
            info!(
                "Node {} stepping down, {} leads term {}",
                self.id, args.leader_id, args.term
            );
            self.state.role = NodeRole::Follower;
            self.state.vote_count = 0;
        }

        self.state.leader_id = Some(args.leader_id);
        self.handle(Event::HeartbeatReceived);

        AppendEntriesReply {
            term: self.state.current_term,
            success: true,
        }
    }
}

fn random_election_timeout(config: &RaftConfig) -> Duration {
    let mut rng = rand::rng();
    let timeout_ms = rng.random_range(config.election_timeout_min..=config.election_timeout_max);
    Duration::from_millis(timeout_ms)
}
