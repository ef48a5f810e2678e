//! Typed, TOML-serializable node configuration, mirroring the teacher's own
//! `NodeConfig::load`/`save` pair: one struct, one file, no environment
//! variable indirection beyond what `node-logger` already reads.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use txpool::config::PoolConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("./data") }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Height from which the state-commit engine starts recording a state
    /// root alongside each committed block; blocks below this height only
    /// grow the block-root accumulator.
    pub effective_state_hash_height: u64,
    pub storage: StorageConfig,
    pub pool: PoolConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            effective_state_hash_height: 0,
            storage: StorageConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read node config at {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse node config at {}", path.display()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let serialized = toml::to_string_pretty(self).context("failed to serialize node config")?;
        std::fs::write(path, serialized)
            .with_context(|| format!("failed to write node config to {}", path.display()))
    }

    /// A config pointed at a fresh temp directory, for tests and the CLI's
    /// demo mode.
    pub fn random_for_test(data_dir: PathBuf) -> Self {
        Self {
            effective_state_hash_height: 0,
            storage: StorageConfig { data_dir },
            pool: PoolConfig::default(),
        }
    }
}
