//! Run configuration, loaded from and saved to `Ballot.toml`.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    ArtifactStore, ArtifactsConfig, DeploymentPlan, JsonRpcClient, NetworkConfig, PostConfigStep,
    RecordConfig, RunController, RunReport,
    plan::{DEFAULT_ADMIN_FUNCTION, DEFAULT_PARTY_NAME, DEFAULT_PARTY_SYMBOL},
};

/// The default name for the ballot configuration file.
pub const BALLOT_CONFIG_FILENAME: &str = "Ballot.toml";

/// Constructor parameters of the demo party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyConfig {
    pub name: String,
    pub symbol: String,
}

impl Default for PartyConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PARTY_NAME.to_string(),
            symbol: DEFAULT_PARTY_SYMBOL.to_string(),
        }
    }
}

/// Administrator reassignment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfigConfig {
    /// Target whose administrator is reassigned.
    pub target: String,
    /// Solidity signature of the reassignment entry point.
    pub function: String,
    /// New administrator. The step is skipped when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_admin: Option<Address>,
}

impl Default for PostConfigConfig {
    fn default() -> Self {
        Self {
            target: "Election".to_string(),
            function: DEFAULT_ADMIN_FUNCTION.to_string(),
            new_admin: None,
        }
    }
}

/// Complete configuration of a deployment run.
///
/// Can be serialized to/from TOML. Every section has defaults, so an empty file
/// deploys the election suite to a local node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallotConfig {
    /// Network connection.
    pub network: NetworkConfig,
    /// Compiled contract artifacts.
    pub artifacts: ArtifactsConfig,
    /// Output record location and schema.
    pub record: RecordConfig,
    /// Administrator reassignment.
    pub post_config: PostConfigConfig,
    /// Demo party constructor parameters.
    pub party: PartyConfig,
    /// Full plan override. When unset, the election suite is deployed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<DeploymentPlan>,
}

impl BallotConfig {
    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize ballot config to TOML")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Load the configuration from a TOML file, or from `Ballot.toml` inside a directory.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Configuration file or directory not found: {}",
                path.display()
            );
        }

        let config_path = if path.is_dir() {
            path.join(BALLOT_CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
        let config: Self =
            toml::from_str(&content).context("Failed to parse config file as TOML")?;
        tracing::info!(path = %config_path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Save the configuration next to the deployment record.
    pub fn save_next_to_record(&self) -> Result<PathBuf> {
        let dir = match self.record.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        let config_path = dir.join(BALLOT_CONFIG_FILENAME);
        self.save_to_file(&config_path)?;
        Ok(config_path)
    }

    /// The plan this configuration deploys.
    ///
    /// A custom plan keeps its own post-configuration target and function; the
    /// configured administrator still applies to it.
    pub fn plan(&self) -> DeploymentPlan {
        match &self.plan {
            Some(plan) => {
                let mut plan = plan.clone();
                if let (Some(step), Some(admin)) =
                    (plan.post_config.as_mut(), self.post_config.new_admin)
                {
                    step.new_admin = Some(admin);
                }
                plan
            }
            None => {
                let mut plan = DeploymentPlan::election(
                    self.party.name.clone(),
                    self.party.symbol.clone(),
                    self.post_config.new_admin,
                );
                plan.post_config = Some(PostConfigStep {
                    target: self.post_config.target.clone(),
                    function: self.post_config.function.clone(),
                    new_admin: self.post_config.new_admin,
                });
                plan
            }
        }
    }

    /// Run the deployment against the configured JSON-RPC endpoint.
    pub async fn deploy(&self) -> Result<RunReport> {
        tracing::info!(
            rpc_url = %self.network.rpc_url,
            account_index = self.network.account_index,
            record = %self.record.path.display(),
            schema = %self.record.schema,
            "Starting deployment process..."
        );

        let client = JsonRpcClient::new(
            &self.network,
            ArtifactStore::new(self.artifacts.clone()),
        )?;

        let report = RunController::new(&client, self.plan(), self.record.clone())
            .account_index(self.network.account_index)
            .run()
            .await?;

        report.log_summary(&self.record);

        Ok(report)
    }
}
