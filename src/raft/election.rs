use std::time::Duration;

use ::log::{debug, info, warn};
use tokio::time::{interval, MissedTickBehavior};

use super::{Event, Outbound, RequestVoteArgs, SharedNode};
use crate::config::PeerRegistry;
use crate::network::RaftClient;

/// Polls the node every `tick` and raises [`Event::Timeout`] once a
/// non-leader has gone a full election timeout without a heartbeat. Runs for
/// the life of the process.
pub async fn run_election_timer(
    node: SharedNode,
    peers: PeerRegistry,
    tick: Duration,
    rpc_timeout: Duration,
) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let outbound = {
            let mut node = node.lock().await;
            if !node.election_timeout_elapsed() {
                continue;
            }

            info!(
                "Election timer expired after {} ms, triggering election",
                node.state().since_last_heartbeat().as_millis()
            );
            let outbound = node.handle(Event::Timeout);
            node.reset_election_timer();
            outbound
        };

        if let Some(Outbound::RequestVotes(args)) = outbound {
            request_votes(&node, &peers, args, rpc_timeout).await;
        }
    }
}

/// Asks every peer, in registry order, for its vote and feeds each answer back
/// into the state machine as it arrives. An unreachable peer counts as no vote.
/// Returns the number of peers that answered.
pub async fn request_votes(
    node: &SharedNode,
    peers: &PeerRegistry,
    args: RequestVoteArgs,
    rpc_timeout: Duration,
) -> usize {
    let mut answered = 0;

    for peer in peers.iter() {
        debug!("Sending RequestVote RPC to {peer} (term {})", args.term);

        let client = RaftClient::new(&peer.address(), rpc_timeout);
        match client.request_vote(&args).await {
            Ok(reply) => {
                answered += 1;
                node.lock().await.handle(Event::VoteResponseReceived {
                    election_term: args.term,
                    reply_term: reply.term,
                    granted: reply.vote_granted,
                });
            }
            Err(e) => warn!("RequestVote RPC to {peer} failed: {e}"),
        }
    }

    answered
}
