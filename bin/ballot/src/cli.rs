use std::path::PathBuf;

use alloy_core::primitives::Address;
use ballot_deploy::{BallotConfig, RecordSchema};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "ballot")]
#[command(
    author,
    version,
    about = "Deploy the election contracts and record their addresses"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "BALLOT_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a Ballot.toml configuration file (or a directory containing one).
    ///
    /// If not provided, ./Ballot.toml is used when it exists.
    #[arg(long, alias = "conf", env = "BALLOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// The URL of the JSON-RPC endpoint of the target network.
    #[arg(long, alias = "rpc", env = "BALLOT_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Index of the deploying account in the node's account list.
    #[arg(long, env = "BALLOT_ACCOUNT_INDEX")]
    pub account_index: Option<usize>,

    /// Root of the compiled Hardhat artifacts.
    #[arg(long, env = "BALLOT_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,

    /// Where to write the deployment record.
    #[arg(short, long, env = "BALLOT_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Fields of the deployment record: `frontend` or `extended`.
    #[arg(long, env = "BALLOT_SCHEMA")]
    pub schema: Option<RecordSchema>,

    /// Hand administration of the election over to this address.
    ///
    /// Contracts without the reassignment entry point keep the deployer as administrator.
    #[arg(long, env = "BALLOT_ELECTION_ADMIN")]
    pub election_admin: Option<Address>,

    /// Name of the demo party.
    #[arg(long, env = "BALLOT_PARTY_NAME")]
    pub party_name: Option<String>,

    /// Symbol of the demo party.
    #[arg(long, env = "BALLOT_PARTY_SYMBOL")]
    pub party_symbol: Option<String>,

    /// Save the effective configuration next to the deployment record.
    #[arg(long, env = "BALLOT_SAVE_CONFIG")]
    pub save_config: bool,
}

impl Cli {
    /// Apply command line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut BallotConfig) {
        if let Some(url) = &self.rpc_url {
            config.network.rpc_url = url.clone();
        }
        if let Some(index) = self.account_index {
            config.network.account_index = index;
        }
        if let Some(dir) = &self.artifacts {
            config.artifacts.dir = dir.clone();
        }
        if let Some(path) = &self.output {
            config.record.path = path.clone();
        }
        if let Some(schema) = self.schema {
            config.record.schema = schema;
        }
        if let Some(admin) = self.election_admin {
            config.post_config.new_admin = Some(admin);
        }
        if let Some(name) = &self.party_name {
            config.party.name = name.clone();
        }
        if let Some(symbol) = &self.party_symbol {
            config.party.symbol = symbol.clone();
        }
    }
}
