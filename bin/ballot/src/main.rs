//! ballot deploys the election contracts to one network and records their addresses.

mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use ballot_deploy::{BALLOT_CONFIG_FILENAME, BallotConfig};
use clap::{CommandFactory, Parser};
use figment::{
    Figment,
    providers::{Env, Serialized},
};

use cli::Cli;

/// Prefix shared by configuration and flag environment variables.
const ENV_PREFIX: &str = "BALLOT_";

/// Keys of the `BALLOT_*` variables that clap reads for its flags.
///
/// They are not configuration keys: `BALLOT_ARTIFACTS` would otherwise replace
/// the whole `[artifacts]` section with a string.
fn flag_env_keys() -> Vec<String> {
    Cli::command()
        .get_arguments()
        .filter_map(|arg| arg.get_env())
        .filter_map(|env| env.to_str()?.strip_prefix(ENV_PREFIX).map(str::to_string))
        .collect()
}

/// Layer defaults, the TOML file and `BALLOT_` environment variables.
fn load_config(path: Option<&Path>) -> Result<BallotConfig> {
    let base = match path {
        Some(path) => BallotConfig::load_from_file(path)?,
        None if Path::new(BALLOT_CONFIG_FILENAME).exists() => {
            BallotConfig::load_from_file(Path::new(BALLOT_CONFIG_FILENAME))?
        }
        None => BallotConfig::default(),
    };

    let ignored = flag_env_keys();
    let ignored: Vec<&str> = ignored.iter().map(String::as_str).collect();

    Figment::from(Serialized::defaults(base))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&ignored).split("__"))
        .extract()
        .context("Failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    cli.apply(&mut config);

    if cli.save_config {
        config.save_next_to_record()?;
    }

    config.deploy().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_flag_variables_do_not_reach_config() {
        Jail::expect_with(|jail| {
            jail.set_env("BALLOT_ARTIFACTS", "build/artifacts");
            jail.set_env("BALLOT_OUTPUT", "out/addresses.json");
            jail.set_env("BALLOT_RPC_URL", "http://localhost:9545");

            let config = load_config(None).map_err(|e| format!("{:#}", e))?;

            assert_eq!(config, BallotConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_layered_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                BALLOT_CONFIG_FILENAME,
                r#"
                [party]
                name = "Green Party"

                [record]
                schema = "extended"
                "#,
            )?;
            jail.set_env("BALLOT_PARTY__SYMBOL", "GP");
            jail.set_env("BALLOT_NETWORK__ACCOUNT_INDEX", "2");
            jail.set_env("BALLOT_ARTIFACTS", "build/artifacts");

            let config = load_config(None).map_err(|e| format!("{:#}", e))?;

            assert_eq!(config.party.name, "Green Party");
            assert_eq!(config.party.symbol, "GP");
            assert_eq!(config.network.account_index, 2);
            assert_eq!(config.record.schema, ballot_deploy::RecordSchema::Extended);
            assert_eq!(config.artifacts, BallotConfig::default().artifacts);
            Ok(())
        });
    }

    #[test]
    fn test_config_directory() {
        Jail::expect_with(|jail| {
            std::fs::create_dir("deployments").map_err(|e| e.to_string())?;
            jail.create_file(
                "deployments/Ballot.toml",
                "[network]\nrpc_url = \"http://localhost:9545\"\n",
            )?;

            let config =
                load_config(Some(Path::new("deployments"))).map_err(|e| format!("{:#}", e))?;
            assert_eq!(config.network.rpc_url.as_str(), "http://localhost:9545/");

            assert!(load_config(Some(Path::new("missing.toml"))).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_flag_env_keys() {
        let keys = flag_env_keys();

        assert!(keys.contains(&"ARTIFACTS".to_string()));
        assert!(keys.contains(&"VERBOSITY".to_string()));
        assert!(keys.iter().all(|k| !k.starts_with(ENV_PREFIX)));
    }
}
