//! Parameter artifacts — the contract between the optimizer and live trading.
//!
//! One JSON file holds the best parameter vector per instrument symbol,
//! together with the fitness diagnostics it earned and a fingerprint of the
//! run that produced it. Both the optimizer and the live collaborator read
//! the same schema; reloading a vector must reproduce identical simulator
//! fitness on the same data.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use siglab_core::config::SimConfig;
use siglab_core::params::{ParameterSpace, ParameterVector};

use crate::fitness::FitnessResult;
use crate::SCHEMA_VERSION;

/// Best-known parameters for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub params: ParameterVector,
    pub fitness: FitnessResult,
    /// Fingerprint of (parameter space, simulator config, seed) — ties the
    /// artifact to the run that produced it.
    pub fingerprint: String,
}

/// The persisted artifact: instrument symbol → record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamArtifact {
    #[serde(default)]
    pub schema_version: u32,
    pub instruments: BTreeMap<String, InstrumentRecord>,
}

impl ParamArtifact {
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            instruments: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, symbol: impl Into<String>, record: InstrumentRecord) {
        self.instruments.insert(symbol.into(), record);
    }

    pub fn get(&self, symbol: &str) -> Option<&InstrumentRecord> {
        self.instruments.get(symbol)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize parameter artifact")
    }

    /// Parse from JSON, rejecting unknown schema versions.
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: Self =
            serde_json::from_str(json).context("failed to parse parameter artifact")?;
        if artifact.schema_version > SCHEMA_VERSION {
            bail!(
                "unsupported artifact schema version {} (max supported: {})",
                artifact.schema_version,
                SCHEMA_VERSION
            );
        }
        Ok(artifact)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("failed to write {}", path.as_ref().display()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        Self::from_json(&json)
    }
}

/// Fingerprint of an optimization setup: blake3 over the canonical JSON of
/// (space, sim config, seed).
pub fn run_fingerprint(space: &ParameterSpace, config: &SimConfig, seed: u64) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&serde_json::to_vec(space).unwrap_or_default());
    hasher.update(&serde_json::to_vec(config).unwrap_or_default());
    hasher.update(&seed.to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> InstrumentRecord {
        let space = ParameterSpace::default();
        let params = space.decode(&vec![0.6; space.dim()]);
        InstrumentRecord {
            params,
            fitness: FitnessResult {
                objective: 0.42,
                win_rate: 0.55,
                sharpe: 1.1,
                max_drawdown: 0.08,
                total_return: 0.2,
                trade_count: 37,
            },
            fingerprint: run_fingerprint(&space, &SimConfig::default(), 42),
        }
    }

    #[test]
    fn json_roundtrip_is_lossless() {
        let mut artifact = ParamArtifact::new();
        artifact.insert("BTCUSDT", sample_record());
        artifact.insert("ETHUSDT", sample_record());
        let json = artifact.to_json().unwrap();
        let reloaded = ParamArtifact::from_json(&json).unwrap();
        assert_eq!(artifact, reloaded);
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let mut artifact = ParamArtifact::new();
        artifact.schema_version = SCHEMA_VERSION + 1;
        let json = artifact.to_json().unwrap();
        assert!(ParamArtifact::from_json(&json).is_err());
    }

    #[test]
    fn save_and_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let mut artifact = ParamArtifact::new();
        artifact.insert("SOLUSDT", sample_record());
        artifact.save(&path).unwrap();
        let reloaded = ParamArtifact::load(&path).unwrap();
        assert_eq!(artifact, reloaded);
        assert!(reloaded.get("SOLUSDT").is_some());
        assert!(reloaded.get("XRPUSDT").is_none());
    }

    #[test]
    fn fingerprint_is_stable_and_seed_sensitive() {
        let space = ParameterSpace::default();
        let config = SimConfig::default();
        assert_eq!(
            run_fingerprint(&space, &config, 42),
            run_fingerprint(&space, &config, 42)
        );
        assert_ne!(
            run_fingerprint(&space, &config, 42),
            run_fingerprint(&space, &config, 43)
        );
    }
}
