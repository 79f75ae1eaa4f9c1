use clap::{CommandFactory, Parser, ValueEnum};
use log::info;

use raftlet::config::{PeerRegistry, DEFAULT_MAX_PEERS};
use raftlet::raft::{Raft, RaftConfig, VotePolicy};

#[derive(Clone, Copy, ValueEnum)]
enum VotePolicyArg {
    /// Compare terms before granting votes or accepting heartbeats
    TermChecked,
    /// Grant every vote and accept every heartbeat
    Unconditional,
}

impl From<VotePolicyArg> for VotePolicy {
    fn from(arg: VotePolicyArg) -> Self {
        match arg {
            VotePolicyArg::TermChecked => VotePolicy::TermChecked,
            VotePolicyArg::Unconditional => VotePolicy::Unconditional,
        }
    }
}

#[derive(Parser)]
#[command(name = "raftlet")]
#[command(about = "Raft leader election and heartbeats over plain TCP")]
struct Cli {
    /// Unique ID for this node
    #[arg(long)]
    id: u64,

    /// Port to listen on for peer RPCs
    #[arg(long)]
    port: u16,

    /// Comma-separated list of peer addresses (host:port)
    #[arg(long)]
    peers: String,

    /// Maximum number of peers accepted in --peers
    #[arg(long, default_value_t = DEFAULT_MAX_PEERS)]
    max_peers: usize,

    /// Lower bound of the randomized election timeout in milliseconds
    #[arg(long, default_value_t = 150)]
    election_timeout_min: u64,

    /// Upper bound of the randomized election timeout in milliseconds
    #[arg(long, default_value_t = 300)]
    election_timeout_max: u64,

    /// Interval between leader heartbeats in milliseconds
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    heartbeat_interval: u64,

    /// Per-RPC timeout in milliseconds
    #[arg(long, default_value_t = 100)]
    rpc_timeout: u64,

    /// How RequestVote and AppendEntries are answered
    #[arg(long, value_enum, default_value_t = VotePolicyArg::TermChecked)]
    vote_policy: VotePolicyArg,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();

    let peers = match PeerRegistry::parse(&cli.peers, cli.max_peers) {
        Ok(peers) => peers,
        Err(e) => Cli::command()
            .error(clap::error::ErrorKind::ValueValidation, e)
            .exit(),
    };

    if cli.election_timeout_min > cli.election_timeout_max {
        Cli::command()
            .error(
                clap::error::ErrorKind::ArgumentConflict,
                "--election-timeout-min must not exceed --election-timeout-max",
            )
            .exit();
    }

    let mut config = RaftConfig::new(cli.id);
    config.election_timeout_min = cli.election_timeout_min;
    config.election_timeout_max = cli.election_timeout_max;
    config.heartbeat_interval = cli.heartbeat_interval;
    config.rpc_timeout = cli.rpc_timeout;
    config.vote_policy = cli.vote_policy.into();

    let raft = Raft::new(config, peers);

    info!("Node ID: {}", raft.config().node_id);
    info!("Listening on port: {}", cli.port);
    for peer in raft.peers().iter() {
        info!("Peer: {peer}");
    }
    let server = raft.bind(&format!("0.0.0.0:{}", cli.port)).await?;

    let _tasks = raft.start();
    server.run().await;

    Ok(())
}
