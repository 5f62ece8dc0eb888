//! Deployment record: the addresses a run leaves behind for its consumers.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::primitives::Address;
use anyhow::Context;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::{RunError, fs::FsHandler};

/// Default location of the record, next to the front-end sources.
pub const DEFAULT_RECORD_PATH: &str = "src/contracts/deployedAddresses.json";

/// Record field holding the deploying account in the extended schema.
pub const DEPLOYER_FIELD: &str = "Deployer";

/// Which fields the record carries.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RecordSchema {
    /// One entry per deployed contract.
    #[default]
    Frontend,
    /// Contracts plus the resolved administrator and the deployer.
    Extended,
}

/// Where and how the record is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    pub path: PathBuf,
    pub schema: RecordSchema,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_RECORD_PATH),
            schema: RecordSchema::default(),
        }
    }
}

/// Mapping of record field to address.
///
/// Addresses are serialized in their EIP-55 checksummed form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct DeploymentRecord {
    entries: BTreeMap<String, Address>,
}

impl Serialize for DeploymentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, address) in &self.entries {
            map.serialize_entry(field, &address.to_checksum(None))?;
        }
        map.end()
    }
}

impl DeploymentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, address: Address) {
        self.entries.insert(field.into(), address);
    }

    pub fn get(&self, field: &str) -> Option<Address> {
        self.entries.get(field).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the record as pretty JSON.
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize deployment record")
    }

    /// Write the record to `path`, replacing any previous content.
    pub fn write(&self, path: &Path) -> Result<(), RunError> {
        let failure = |source: anyhow::Error| RunError::PersistenceFailure {
            path: path.to_path_buf(),
            source,
        };

        let mut json = self.to_json().map_err(failure)?;
        json.push('\n');
        FsHandler::write_atomic(path, json.as_bytes()).map_err(failure)?;

        tracing::info!(path = %path.display(), fields = self.len(), "Deployment record written");
        Ok(())
    }

    /// Load a previously written record.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse deployment record {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn sample() -> DeploymentRecord {
        let mut record = DeploymentRecord::new();
        record.insert("Auth", Address::repeat_byte(0xaa));
        record.insert("Admin", Address::repeat_byte(0xbb));
        record
    }

    #[test]
    fn test_serialized_addresses_are_checksummed() {
        let addr: Address = "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap();
        let mut record = DeploymentRecord::new();
        record.insert("Auth", addr);

        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert_eq!(value["Auth"], "0x5FbDB2315678afecb367f032d93F642f64180aa3");
    }

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new("ballot-record").unwrap();
        let path = dir.path().join("deployments/localhost.json");

        sample().write(&path).unwrap();

        assert_eq!(DeploymentRecord::load(&path).unwrap(), sample());
    }

    #[test]
    fn test_write_replaces_previous_record() {
        let dir = TempDir::new("ballot-record").unwrap();
        let path = dir.path().join("deployedAddresses.json");

        let mut old = sample();
        old.insert("Legacy", Address::repeat_byte(0x01));
        old.write(&path).unwrap();
        sample().write(&path).unwrap();

        let loaded = DeploymentRecord::load(&path).unwrap();
        assert_eq!(loaded.fields().collect::<Vec<_>>(), vec!["Admin", "Auth"]);
    }

    #[test]
    fn test_write_failure_is_persistence_failure() {
        let dir = TempDir::new("ballot-record").unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let err = sample().write(&blocker.join("out.json")).unwrap_err();

        assert!(matches!(err, RunError::PersistenceFailure { .. }));
    }

    #[test]
    fn test_schema_parsing() {
        assert_eq!("extended".parse::<RecordSchema>().unwrap(), RecordSchema::Extended);
        assert_eq!(RecordSchema::Frontend.to_string(), "frontend");
    }
}
