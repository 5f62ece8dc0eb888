//! Compiled contract artifacts.
//!
//! Artifacts are produced by the contracts' own build (Hardhat). Only the creation
//! bytecode is needed here.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::primitives::Bytes;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default location of the Hardhat artifacts directory.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Where to find compiled artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Root of the Hardhat artifacts tree.
    pub dir: PathBuf,
    /// Explicit artifact files for specific contracts.
    pub overrides: BTreeMap<String, PathBuf>,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HardhatArtifact {
    #[serde(rename = "contractName")]
    contract_name: Option<String>,
    bytecode: Bytes,
}

/// Resolves contract names to creation bytecode.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    config: ArtifactsConfig,
}

impl ArtifactStore {
    pub fn new(config: ArtifactsConfig) -> Self {
        Self { config }
    }

    /// Path of the artifact file for `contract`.
    ///
    /// Hardhat lays artifacts out as `<dir>/contracts/<Name>.sol/<Name>.json`.
    pub fn artifact_path(&self, contract: &str) -> PathBuf {
        self.config.overrides.get(contract).cloned().unwrap_or_else(|| {
            self.config
                .dir
                .join("contracts")
                .join(format!("{}.sol", contract))
                .join(format!("{}.json", contract))
        })
    }

    /// Load the creation bytecode of `contract`.
    pub fn bytecode(&self, contract: &str) -> Result<Bytes> {
        let path = self.artifact_path(contract);
        let artifact = Self::load(&path)?;

        if let Some(name) = artifact.contract_name.as_ref().filter(|n| *n != contract) {
            tracing::warn!(
                contract = %contract,
                artifact_contract = %name,
                path = %path.display(),
                "Artifact contract name does not match"
            );
        }

        if artifact.bytecode.is_empty() {
            anyhow::bail!(
                "Artifact {} has no bytecode (abstract contract or interface?)",
                path.display()
            );
        }

        Ok(artifact.bytecode)
    }

    fn load(path: &Path) -> Result<HardhatArtifact> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn write_artifact(root: &Path, name: &str, bytecode: &str) {
        let dir = root.join("contracts").join(format!("{}.sol", name));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(format!("{}.json", name)),
            serde_json::json!({
                "_format": "hh-sol-artifact-1",
                "contractName": name,
                "abi": [],
                "bytecode": bytecode,
                "deployedBytecode": "0x",
            })
            .to_string(),
        )
        .unwrap();
    }

    #[test]
    fn test_hardhat_layout() {
        let dir = TempDir::new("ballot-artifacts").unwrap();
        write_artifact(dir.path(), "Auth", "0x6080604052");

        let store = ArtifactStore::new(ArtifactsConfig {
            dir: dir.path().to_path_buf(),
            overrides: BTreeMap::new(),
        });

        assert_eq!(
            store.bytecode("Auth").unwrap(),
            Bytes::from(vec![0x60, 0x80, 0x60, 0x40, 0x52])
        );
    }

    #[test]
    fn test_override_path() {
        let dir = TempDir::new("ballot-artifacts").unwrap();
        write_artifact(dir.path(), "ElectionV2", "0x6001");

        let mut overrides = BTreeMap::new();
        overrides.insert(
            "ElectionContract".to_string(),
            dir.path().join("contracts/ElectionV2.sol/ElectionV2.json"),
        );
        let store = ArtifactStore::new(ArtifactsConfig {
            dir: PathBuf::from("/nonexistent"),
            overrides,
        });

        assert_eq!(store.bytecode("ElectionContract").unwrap().len(), 2);
    }

    #[test]
    fn test_missing_and_empty_artifacts() {
        let dir = TempDir::new("ballot-artifacts").unwrap();
        write_artifact(dir.path(), "IVoting", "0x");

        let store = ArtifactStore::new(ArtifactsConfig {
            dir: dir.path().to_path_buf(),
            overrides: BTreeMap::new(),
        });

        assert!(store.bytecode("Party").is_err());
        assert!(store.bytecode("IVoting").is_err());
    }
}
