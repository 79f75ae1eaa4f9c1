use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use super::codec::{read_header, read_record, write_record, MessageKind};
use super::NetworkError;
use crate::raft::{AppendEntriesArgs, RaftConfig, RequestVoteArgs, SharedNode};

/// Inbound side of the transport.
///
/// The accept loop never waits on RPC processing: every connection is handed to
/// its own task. At most `max_connections` tasks run at once; connections that
/// arrive while all slots are busy are closed without a reply, which the
/// sender sees as an unreachable peer.
pub struct RaftServer {
    listener: TcpListener,
    node: SharedNode,
    handlers: Arc<Semaphore>,
    max_connections: usize,
    timeout: Duration,
}

impl RaftServer {
    pub fn new(listener: TcpListener, node: SharedNode, config: &RaftConfig) -> Self {
        Self {
            listener,
            node,
            handlers: Arc::new(Semaphore::new(config.max_inbound_connections)),
            max_connections: config.max_inbound_connections,
            timeout: config.rpc_timeout(),
        }
    }

    pub async fn bind(
        addr: &str,
        node: SharedNode,
        config: &RaftConfig,
    ) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::new(listener, node, config))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) {
        match self.local_addr() {
            Ok(addr) => info!("Raft server listening on {addr}"),
            Err(e) => warn!("Raft server listening on unknown address: {e}"),
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(e) => warn!("Failed to accept connection: {e}"),
            }
        }
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        let permit = match Arc::clone(&self.handlers).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    "Dropping connection from {peer}: {} handlers already running",
                    self.max_connections
                );
                return;
            }
        };

        let node = Arc::clone(&self.node);
        let timeout = self.timeout;

        tokio::spawn(async move {
            let _permit = permit;
            match tokio::time::timeout(timeout, handle_connection(stream, node)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Dropped connection from {peer}: {e}"),
                Err(_) => warn!("Connection from {peer} timed out after {timeout:?}"),
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, node: SharedNode) -> Result<(), NetworkError> {
    match read_header(&mut stream).await? {
        MessageKind::RequestVote => {
            let args: RequestVoteArgs = read_record(&mut stream).await?;
            debug!(
                "Received RequestVote RPC (term {}, candidate {})",
                args.term, args.candidate_id
            );

            let reply = node.lock().await.handle_request_vote(&args);
            write_record(&mut stream, &reply).await?;
        }
        MessageKind::AppendEntries => {
            let args: AppendEntriesArgs = read_record(&mut stream).await?;
            debug!(
                "Received AppendEntries RPC (term {}, leader {})",
                args.term, args.leader_id
            );

            let reply = node.lock().await.handle_append_entries(&args);
            write_record(&mut stream, &reply).await?;
        }
    }

    stream.shutdown().await?;
    Ok(())
}
