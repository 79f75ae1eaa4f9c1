use std::sync::Arc;
use std::time::Duration;

use raftlet::config::PeerRegistry;
use raftlet::network::codec::{encode_request, MessageKind, PROTOCOL_VERSION};
use raftlet::network::{NetworkError, RaftClient, RaftServer};
use raftlet::raft::{
    AppendEntriesArgs, AppendEntriesReply, NodeRole, Raft, RaftConfig, RequestVoteArgs,
    RequestVoteReply, VotePolicy,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::sleep;

const RPC_TIMEOUT: Duration = Duration::from_millis(300);

async fn start_server(config: RaftConfig) -> (Raft, String, JoinHandle<()>) {
    let raft = Raft::new(config, PeerRegistry::default());
    let server = raft.bind("127.0.0.1:0").await.expect("bind raft server");
    let addr = server.local_addr().expect("local addr").to_string();
    let handle = tokio::spawn(server.run());
    (raft, addr, handle)
}

fn vote_request(term: u64, candidate_id: u64) -> RequestVoteArgs {
    RequestVoteArgs {
        term,
        candidate_id,
        last_log_index: -1,
        last_log_term: 0,
    }
}

fn heartbeat(term: u64, leader_id: u64) -> AppendEntriesArgs {
    AppendEntriesArgs {
        term,
        leader_id,
        prev_log_index: -1,
        prev_log_term: 0,
        leader_commit: 0,
    }
}

#[tokio::test]
async fn request_vote_is_granted_over_tcp() {
    let (raft, addr, server) = start_server(RaftConfig::new(2)).await;

    let client = RaftClient::new(&addr, RPC_TIMEOUT);
    let reply = client.request_vote(&vote_request(1, 1)).await.expect("rpc");

    assert_eq!(
        reply,
        RequestVoteReply {
            term: 1,
            vote_granted: true
        }
    );
    let node = raft.node.lock().await;
    assert_eq!(node.current_term(), 1);
    assert_eq!(node.state().voted_for, Some(1));

    server.abort();
}

#[tokio::test]
async fn unconditional_policy_echoes_caller_term() {
    let mut config = RaftConfig::new(2);
    config.vote_policy = VotePolicy::Unconditional;
    let (raft, addr, server) = start_server(config).await;
    raft.node.lock().await.become_follower(8);

    let client = RaftClient::new(&addr, RPC_TIMEOUT);
    let vote = client.request_vote(&vote_request(3, 1)).await.expect("rpc");
    let ack = client.append_entries(&heartbeat(3, 1)).await.expect("rpc");

    assert_eq!(
        vote,
        RequestVoteReply {
            term: 3,
            vote_granted: true
        }
    );
    assert_eq!(
        ack,
        AppendEntriesReply {
            term: 3,
            success: true
        }
    );
    assert_eq!(raft.node.lock().await.current_term(), 8);

    server.abort();
}

#[tokio::test]
async fn append_entries_resets_follower_clock() {
    let (raft, addr, server) = start_server(RaftConfig::new(2)).await;
    sleep(Duration::from_millis(200)).await;

    let client = RaftClient::new(&addr, RPC_TIMEOUT);
    let reply = client.append_entries(&heartbeat(2, 1)).await.expect("rpc");

    assert_eq!(
        reply,
        AppendEntriesReply {
            term: 2,
            success: true
        }
    );
    let node = raft.node.lock().await;
    assert_eq!(node.role(), NodeRole::Follower);
    assert_eq!(node.state().leader_id, Some(1));
    assert!(node.state().since_last_heartbeat() < Duration::from_millis(150));

    server.abort();
}

#[tokio::test]
async fn unreachable_peer_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();
    drop(listener);

    let client = RaftClient::new(&addr, RPC_TIMEOUT);
    let result = client.request_vote(&vote_request(1, 1)).await;

    assert!(matches!(result, Err(NetworkError::Io(_))), "{result:?}");
}

#[tokio::test]
async fn silent_peer_times_out() {
    // Connections queue in the backlog but are never answered
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();

    let client = RaftClient::new(&addr, Duration::from_millis(100));
    let result = client.append_entries(&heartbeat(1, 1)).await;

    assert!(matches!(result, Err(NetworkError::Timeout(_))), "{result:?}");
    drop(listener);
}

#[tokio::test]
async fn unknown_message_type_is_dropped_without_reply() {
    let (raft, addr, server) = start_server(RaftConfig::new(2)).await;

    let mut stream = TcpStream::connect(&addr).await.expect("connect");
    let mut frame = PROTOCOL_VERSION.to_be_bytes().to_vec();
    frame.extend_from_slice(&9u32.to_be_bytes());
    stream.write_all(&frame).await.expect("write");

    let mut reply = Vec::new();
    let _ = stream.read_to_end(&mut reply).await;

    assert!(reply.is_empty());
    assert_eq!(raft.node.lock().await.current_term(), 0);

    server.abort();
}

#[tokio::test]
async fn truncated_arguments_are_dropped_without_reply() {
    let (raft, addr, server) = start_server(RaftConfig::new(2)).await;

    let frame = encode_request(MessageKind::RequestVote, &vote_request(4, 1)).expect("encode");
    let mut stream = TcpStream::connect(&addr).await.expect("connect");
    stream.write_all(&frame[..frame.len() - 5]).await.expect("write");
    stream.shutdown().await.expect("half close");

    let mut reply = Vec::new();
    let _ = stream.read_to_end(&mut reply).await;

    assert!(reply.is_empty());
    assert_eq!(raft.node.lock().await.state().voted_for, None);

    server.abort();
}

#[tokio::test]
async fn busy_server_drops_extra_connections() {
    let mut config = RaftConfig::new(2);
    config.max_inbound_connections = 1;
    config.rpc_timeout = 2_000;
    let raft = Raft::new(config, PeerRegistry::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();
    let server = RaftServer::new(listener, Arc::clone(&raft.node), raft.config());
    let server = tokio::spawn(server.run());

    // Occupies the only handler slot until the server-side timeout
    let _idle = TcpStream::connect(&addr).await.expect("connect");
    sleep(Duration::from_millis(100)).await;

    let client = RaftClient::new(&addr, RPC_TIMEOUT);
    let result = client.request_vote(&vote_request(1, 1)).await;

    assert!(result.is_err(), "expected dropped connection, got {result:?}");
    assert_eq!(raft.node.lock().await.state().voted_for, None);

    server.abort();
}
