use std::time::Duration;

use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::codec::{encode_request, read_record, MessageKind, WireRecord};
use super::NetworkError;
use crate::raft::{AppendEntriesArgs, AppendEntriesReply, RequestVoteArgs, RequestVoteReply};

/// Outbound RPCs to one peer. Every call opens its own connection, performs a
/// single request/reply exchange and closes it again.
pub struct RaftClient {
    address: String,
    timeout: Duration,
}

impl RaftClient {
    pub fn new(address: &str, timeout: Duration) -> Self {
        Self {
            address: address.to_string(),
            timeout,
        }
    }

    pub async fn request_vote(
        &self,
        args: &RequestVoteArgs,
    ) -> Result<RequestVoteReply, NetworkError> {
        let reply: RequestVoteReply = self.call(MessageKind::RequestVote, args).await?;
        debug!(
            "Received vote reply from {}: vote_granted={}, term={}",
            self.address, reply.vote_granted, reply.term
        );
        Ok(reply)
    }

    pub async fn append_entries(
        &self,
        args: &AppendEntriesArgs,
    ) -> Result<AppendEntriesReply, NetworkError> {
        let reply: AppendEntriesReply = self.call(MessageKind::AppendEntries, args).await?;
        debug!(
            "Received AppendEntries reply from {}: success={}, term={}",
            self.address, reply.success, reply.term
        );
        Ok(reply)
    }

    /// Bounds the whole exchange (connect, write, read) by the client timeout.
    async fn call<A, R>(&self, kind: MessageKind, args: &A) -> Result<R, NetworkError>
    where
        A: WireRecord,
        R: WireRecord,
    {
        tokio::time::timeout(self.timeout, self.exchange(kind, args))
            .await
            .map_err(|_| NetworkError::Timeout(self.timeout))?
    }

    async fn exchange<A, R>(&self, kind: MessageKind, args: &A) -> Result<R, NetworkError>
    where
        A: WireRecord,
        R: WireRecord,
    {
        let frame = encode_request(kind, args)?;

        let mut stream = TcpStream::connect(&self.address).await?;
        stream.write_all(&frame).await?;

        let reply = read_record(&mut stream).await?;

        // The reply is complete; a failed close is not the caller's problem
        let _ = stream.shutdown().await;

        Ok(reply)
    }
}
