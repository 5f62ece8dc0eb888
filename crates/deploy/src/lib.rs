//! ballot-deploy - Deployment library for the election contract suite.
//!
//! This crate deploys the `Auth`, `Admin`, `Party` and `Election` contracts to a
//! single network, links the contracts that reference each other, optionally
//! hands administration over to another account, and records the resulting
//! addresses for the front-end.
//!
//! # Example
//!
//! ```no_run
//! use ballot_deploy::{ArtifactStore, ArtifactsConfig, DeploymentPlan, JsonRpcClient,
//!     NetworkConfig, RecordConfig, RunController};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = JsonRpcClient::new(
//!     &NetworkConfig::default(),
//!     ArtifactStore::new(ArtifactsConfig::default()),
//! )?;
//! let report = RunController::new(&client, DeploymentPlan::default(), RecordConfig::default())
//!     .run()
//!     .await?;
//! println!("Auth deployed at {:?}", report.record.get("Auth"));
//! # Ok(())
//! # }
//! ```

mod artifacts;
pub use artifacts::{ArtifactStore, ArtifactsConfig, DEFAULT_ARTIFACTS_DIR};

pub mod client;
pub use client::{JsonRpcClient, NetworkClient, NetworkConfig, Receipt, TxHash};

mod config;
pub use config::{BALLOT_CONFIG_FILENAME, BallotConfig, PartyConfig, PostConfigConfig};

mod context;
pub use context::RunContext;

mod deployer;
pub use deployer::{DeployedContract, DeployedContracts, deploy_target};

mod error;
pub use error::RunError;

mod fs;

pub mod link;

pub mod plan;
pub use plan::{
    ConstructorArg, DeploymentPlan, DeploymentTarget, LinkEdge, LinkGroup, PostConfigStep,
};

pub mod post_config;
pub use post_config::{PostConfigOutcome, UnsupportedReason};

mod record;
pub use record::{DEFAULT_RECORD_PATH, DeploymentRecord, RecordConfig, RecordSchema};

mod rpc;

mod runner;
pub use runner::{RunController, RunReport};

mod stages;
pub use stages::RunState;
