//! Failures that end a deployment run.

use std::path::PathBuf;

use thiserror::Error;

/// A fatal run failure.
///
/// An unsupported post-configuration capability is not listed here: it is a
/// [`PostConfigOutcome`](crate::PostConfigOutcome) and never stops a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid deployment plan: {0}")]
    InvalidPlan(String),

    #[error("Failed to resolve the deploying account")]
    AccountResolution(#[source] anyhow::Error),

    #[error("Failed to deploy {target}")]
    DeploymentFailure {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to link {contract}.{function} -> {linked}")]
    LinkFailure {
        contract: String,
        function: String,
        linked: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write deployment record to {}", path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl RunError {
    /// Short machine-friendly name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPlan(_) => "invalid_plan",
            Self::AccountResolution(_) => "account_resolution",
            Self::DeploymentFailure { .. } => "deployment_failure",
            Self::LinkFailure { .. } => "link_failure",
            Self::PersistenceFailure { .. } => "persistence_failure",
        }
    }
}
