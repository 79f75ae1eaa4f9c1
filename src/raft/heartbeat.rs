use std::time::Duration;

use ::log::{debug, error, info, warn};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};

use super::{AppendEntriesArgs, SharedNode};
use crate::config::PeerRegistry;
use crate::network::RaftClient;

/// While this node leads, sends an empty AppendEntries to every peer each
/// `period`. Failed sends are logged and otherwise ignored.
pub async fn run_heartbeat_driver(
    node: SharedNode,
    peers: PeerRegistry,
    period: Duration,
    rpc_timeout: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let args = node.lock().await.heartbeat_args();
        if let Some(args) = args {
            send_heartbeats(&node, &peers, args, rpc_timeout).await;
        }
    }
}

/// One heartbeat round. Peers are contacted concurrently so a hung peer cannot
/// hold up the others. Returns how many peers acknowledged.
pub async fn send_heartbeats(
    node: &SharedNode,
    peers: &PeerRegistry,
    args: AppendEntriesArgs,
    rpc_timeout: Duration,
) -> usize {
    let mut calls = JoinSet::new();
    for peer in peers.iter().cloned() {
        calls.spawn(async move {
            debug!("Sending AppendEntries RPC to {peer} (term {})", args.term);
            let client = RaftClient::new(&peer.address(), rpc_timeout);
            let result = client.append_entries(&args).await;
            (peer, result)
        });
    }

    let mut acknowledged = 0;
    while let Some(joined) = calls.join_next().await {
        match joined {
            Ok((peer, Ok(reply))) => {
                debug!(
                    "AppendEntries RPC to {peer} success={}, term={}",
                    reply.success, reply.term
                );
                if node.lock().await.observe_term(reply.term) {
                    info!("{peer} reported term {}, no longer leader", reply.term);
                } else if reply.success {
                    acknowledged += 1;
                }
            }
            Ok((peer, Err(e))) => warn!("AppendEntries RPC to {peer} failed: {e}"),
            Err(e) => error!("Heartbeat task failed: {e}"),
        }
    }

    acknowledged
}
