// crates/garnet-daemon/src/config.rs
//
// Runtime configuration for the Garnet daemon.
// Loaded from a TOML file or populated with sensible defaults.
//
// Sections:
//   [node]                 storage and logging
//   [chain]                block cadence and genesis time
//   [params.rewards]       monetary expansion
//   [params.slashing]      slash ratios and jail duration
//   [params.jailing]       liveness window and evidence age
//   [[genesis.validators]] initial validator set
//   [simulation]           scripted misbehavior for devnets

use std::fs;

use chrono::DateTime;
use serde::Deserialize;

use garnet_core::error::GarnetError;
use garnet_core::{BlockHeight, Timestamp, ValidatorPubKey};
use garnet_economics::NetworkParameters;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub params: NetworkParameters,
    #[serde(default)]
    pub genesis: GenesisConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Where snapshots are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    RocksDb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Directory for local data storage (RocksDB).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Snapshot storage backend: "memory" or "rocksdb".
    #[serde(default = "default_storage")]
    pub storage: StorageBackend,

    /// Number of most recent heights kept queryable. 0 keeps everything.
    #[serde(default = "default_snapshot_retention")]
    pub snapshot_retention: u64,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> String {
    "~/.garnet/data".to_string()
}

fn default_storage() -> StorageBackend {
    StorageBackend::Memory
}

fn default_snapshot_retention() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage: default_storage(),
            snapshot_retention: default_snapshot_retention(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Chain time advanced by each block, in seconds.
    #[serde(default = "default_block_time_secs")]
    pub block_time_secs: u64,

    /// Wall-clock delay between simulated blocks, in milliseconds.
    #[serde(default = "default_block_interval_ms")]
    pub block_interval_ms: u64,

    /// Genesis time, RFC 3339.
    #[serde(default = "default_genesis_time")]
    pub genesis_time: String,
}

fn default_block_time_secs() -> u64 {
    1
}

fn default_block_interval_ms() -> u64 {
    1_000
}

fn default_genesis_time() -> String {
    "2026-01-01T00:00:00Z".to_string()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            block_time_secs: default_block_time_secs(),
            block_interval_ms: default_block_interval_ms(),
            genesis_time: default_genesis_time(),
        }
    }
}

impl ChainConfig {
    /// Genesis time as unix seconds.
    pub fn genesis_timestamp(&self) -> Result<Timestamp, GarnetError> {
        let parsed = DateTime::parse_from_rfc3339(&self.genesis_time).map_err(|e| {
            GarnetError::InvalidConfig(format!("genesis_time {:?}: {}", self.genesis_time, e))
        })?;
        u64::try_from(parsed.timestamp()).map_err(|_| {
            GarnetError::InvalidConfig(format!("genesis_time {} is before 1970", self.genesis_time))
        })
    }

    /// Chain time of block `height`.
    pub fn block_timestamp(&self, genesis: Timestamp, height: BlockHeight) -> Timestamp {
        genesis.saturating_add(height.saturating_mul(self.block_time_secs))
    }
}

/// A validator in the genesis set.
#[derive(Debug, Clone, Deserialize)]
pub struct GenesisValidator {
    /// Hex-encoded ed25519 consensus key.
    pub pubkey: ValidatorPubKey,
    /// Initial bonded stake in carats.
    pub bonded: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenesisConfig {
    /// When empty, a two-validator dev set is used.
    #[serde(default)]
    pub validators: Vec<GenesisValidator>,
}

/// A validator that stops signing from a given height on.
#[derive(Debug, Clone, Deserialize)]
pub struct OfflineValidator {
    pub pubkey: ValidatorPubKey,
    pub from_height: BlockHeight,
}

/// A validator that double-signs at a given height.
#[derive(Debug, Clone, Deserialize)]
pub struct Equivocation {
    pub pubkey: ValidatorPubKey,
    pub height: BlockHeight,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub offline: Vec<OfflineValidator>,
    #[serde(default)]
    pub equivocations: Vec<Equivocation>,
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GarnetError> {
        self.params.validate()?;
        self.chain.genesis_timestamp()?;
        if self.chain.block_time_secs == 0 {
            return Err(GarnetError::InvalidConfig("block_time_secs must be > 0".into()));
        }
        Ok(())
    }
}
