//! Wire format for the two RPCs.
//!
//! A request is one frame on a fresh connection:
//!
//! ```text
//! +-------------+-------------+------------------------+
//! | version u16 | tag u32     | argument record        |
//! +-------------+-------------+------------------------+
//! ```
//!
//! and the server answers with the matching reply record before closing. Every
//! integer is big-endian and fixed width; booleans are a single `0`/`1` byte.
//! Records have no length prefix, so each has a constant encoded size.

use bincode::config::{self, BigEndian, Configuration, Fixint};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::NetworkError;
use crate::raft::{AppendEntriesArgs, AppendEntriesReply, RequestVoteArgs, RequestVoteReply};

pub const PROTOCOL_VERSION: u16 = 1;

/// Bytes taken by the version and message-type tag.
pub const HEADER_LEN: usize = 6;

const WIRE_CONFIG: Configuration<BigEndian, Fixint> =
    config::standard().with_big_endian().with_fixed_int_encoding();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    RequestVote,
    AppendEntries,
}

impl MessageKind {
    pub fn tag(self) -> u32 {
        match self {
            MessageKind::RequestVote => 1,
            MessageKind::AppendEntries => 2,
        }
    }
}

impl TryFrom<u32> for MessageKind {
    type Error = NetworkError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(MessageKind::RequestVote),
            2 => Ok(MessageKind::AppendEntries),
            other => Err(NetworkError::UnknownMessageType(other)),
        }
    }
}

/// A fixed-layout record that travels on the wire.
pub trait WireRecord: Serialize + DeserializeOwned {
    const ENCODED_LEN: usize;
}

impl WireRecord for RequestVoteArgs {
    const ENCODED_LEN: usize = 32;
}

impl WireRecord for RequestVoteReply {
    const ENCODED_LEN: usize = 9;
}

impl WireRecord for AppendEntriesArgs {
    const ENCODED_LEN: usize = 40;
}

impl WireRecord for AppendEntriesReply {
    const ENCODED_LEN: usize = 9;
}

pub fn encode<T: WireRecord>(record: &T) -> Result<Vec<u8>, NetworkError> {
    let bytes = bincode::serde::encode_to_vec(record, WIRE_CONFIG)
        .map_err(|e| NetworkError::Encode(e.to_string()))?;
    debug_assert_eq!(bytes.len(), T::ENCODED_LEN);
    Ok(bytes)
}

pub fn decode<T: WireRecord>(bytes: &[u8]) -> Result<T, NetworkError> {
    if bytes.len() != T::ENCODED_LEN {
        return Err(NetworkError::Decode(format!(
            "expected {} bytes, got {}",
            T::ENCODED_LEN,
            bytes.len()
        )));
    }

    let (record, _) = bincode::serde::decode_from_slice(bytes, WIRE_CONFIG)
        .map_err(|e| NetworkError::Decode(e.to_string()))?;
    Ok(record)
}

/// Builds a complete request frame.
pub fn encode_request<T: WireRecord>(kind: MessageKind, args: &T) -> Result<Vec<u8>, NetworkError> {
    let mut frame = Vec::with_capacity(HEADER_LEN + T::ENCODED_LEN);
    frame.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    frame.extend_from_slice(&kind.tag().to_be_bytes());
    frame.extend_from_slice(&encode(args)?);
    Ok(frame)
}

pub async fn read_header<R>(reader: &mut R) -> Result<MessageKind, NetworkError>
where
    R: AsyncRead + Unpin,
{
    let version = reader.read_u16().await?;
    if version != PROTOCOL_VERSION {
        return Err(NetworkError::UnsupportedVersion(version));
    }

    let tag = reader.read_u32().await?;
    MessageKind::try_from(tag)
}

pub async fn read_record<R, T>(reader: &mut R) -> Result<T, NetworkError>
where
    R: AsyncRead + Unpin,
    T: WireRecord,
{
    let mut buf = vec![0u8; T::ENCODED_LEN];
    reader.read_exact(&mut buf).await?;
    decode(&buf)
}

pub async fn write_record<W, T>(writer: &mut W, record: &T) -> Result<(), NetworkError>
where
    W: AsyncWrite + Unpin,
    T: WireRecord,
{
    writer.write_all(&encode(record)?).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_vote_layout_is_big_endian() {
        let args = RequestVoteArgs {
            term: 2,
            candidate_id: 7,
            last_log_index: -1,
            last_log_term: 0,
        };

        let bytes = encode(&args).unwrap();

        assert_eq!(bytes.len(), RequestVoteArgs::ENCODED_LEN);
        assert_eq!(&bytes[0..8], &[0, 0, 0, 0, 0, 0, 0, 2]);
        assert_eq!(&bytes[8..16], &[0, 0, 0, 0, 0, 0, 0, 7]);
        assert_eq!(&bytes[16..24], &[0xff; 8]);
        assert_eq!(&bytes[24..32], &[0; 8]);
    }

    #[test]
    fn reply_layout_ends_with_flag_byte() {
        let reply = AppendEntriesReply {
            term: 258,
            success: true,
        };

        let bytes = encode(&reply).unwrap();

        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 1, 2, 1]);
        assert_eq!(decode::<AppendEntriesReply>(&bytes).unwrap(), reply);
    }

    #[test]
    fn append_entries_args_have_fixed_size() {
        let args = AppendEntriesArgs {
            term: u64::MAX,
            leader_id: 3,
            prev_log_index: 41,
            prev_log_term: 9,
            leader_commit: 5,
        };

        let bytes = encode(&args).unwrap();

        assert_eq!(bytes.len(), AppendEntriesArgs::ENCODED_LEN);
        assert_eq!(decode::<AppendEntriesArgs>(&bytes).unwrap(), args);
    }

    #[test]
    fn request_frame_starts_with_version_and_tag() {
        let args = AppendEntriesArgs {
            term: 1,
            leader_id: 1,
            prev_log_index: -1,
            prev_log_term: 0,
            leader_commit: 0,
        };

        let frame = encode_request(MessageKind::AppendEntries, &args).unwrap();

        assert_eq!(frame.len(), HEADER_LEN + AppendEntriesArgs::ENCODED_LEN);
        assert_eq!(&frame[..HEADER_LEN], &[0, 1, 0, 0, 0, 2]);
    }

    #[test]
    fn decode_rejects_wrong_length_and_bad_flag() {
        assert!(matches!(
            decode::<RequestVoteReply>(&[0; 4]),
            Err(NetworkError::Decode(_))
        ));
        assert!(matches!(
            decode::<RequestVoteReply>(&[0, 0, 0, 0, 0, 0, 0, 1, 7]),
            Err(NetworkError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn header_round_trips_through_stream() {
        let args = RequestVoteArgs {
            term: 4,
            candidate_id: 2,
            last_log_index: 0,
            last_log_term: 4,
        };
        let frame = encode_request(MessageKind::RequestVote, &args).unwrap();

        let mut reader = &frame[..];
        assert_eq!(
            read_header(&mut reader).await.unwrap(),
            MessageKind::RequestVote
        );
        let decoded: RequestVoteArgs = read_record(&mut reader).await.unwrap();
        assert_eq!(decoded, args);
    }

    #[tokio::test]
    async fn header_rejects_unknown_version_and_tag() {
        let mut reader: &[u8] = &[0, 9, 0, 0, 0, 1];
        assert!(matches!(
            read_header(&mut reader).await,
            Err(NetworkError::UnsupportedVersion(9))
        ));

        let mut reader: &[u8] = &[0, 1, 0, 0, 0, 3];
        assert!(matches!(
            read_header(&mut reader).await,
            Err(NetworkError::UnknownMessageType(3))
        ));

        let mut reader: &[u8] = &[0, 1, 0];
        assert!(matches!(
            read_header(&mut reader).await,
            Err(NetworkError::Io(_))
        ));
    }

    #[tokio::test]
    async fn write_record_emits_encoded_bytes() {
        let reply = RequestVoteReply {
            term: 1,
            vote_granted: false,
        };
        let mut out = Vec::new();

        write_record(&mut out, &reply).await.unwrap();

        assert_eq!(out, vec![0, 0, 0, 0, 0, 0, 0, 1, 0]);
    }
}
