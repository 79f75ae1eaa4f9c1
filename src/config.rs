use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

/// Upper bound on the number of peers accepted from the command line.
pub const DEFAULT_MAX_PEERS: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid peer format: {0} (expected host:port)")]
    InvalidPeer(String),

    #[error("Invalid peer port: {0}")]
    InvalidPort(String),

    #[error("Peer has an empty host: {0}")]
    EmptyHost(String),

    #[error("Too many peers: {count} (maximum is {max})")]
    TooManyPeers { count: usize, max: usize },
}

/// One other member of the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Peer {
    pub host: String,
    pub port: u16,
}

impl Peer {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Peer {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidPeer(s.to_string()))?;

        if host.is_empty() {
            return Err(ConfigError::EmptyHost(s.to_string()));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(s.to_string()))?;

        Ok(Peer::new(host, port))
    }
}

/// Read-only, ordered list of peers loaded once at startup.
///
/// Cloning is cheap; every clone shares the same list. The position of a peer
/// in the registry is stable for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    peers: Arc<[Peer]>,
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PeerRegistry {
    pub fn new(peers: Vec<Peer>) -> Self {
        Self {
            peers: peers.into(),
        }
    }

    /// Parses a comma-separated `host:port` list.
    ///
    /// An empty string yields an empty registry (a single-node cluster). Blank
    /// segments such as a trailing comma are ignored.
    pub fn parse(list: &str, max_peers: usize) -> Result<Self, ConfigError> {
        let peers = list
            .split(',')
            .filter(|segment| !segment.trim().is_empty())
            .map(Peer::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        if peers.len() > max_peers {
            return Err(ConfigError::TooManyPeers {
                count: peers.len(),
                max: max_peers,
            });
        }

        Ok(Self::new(peers))
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }
}
