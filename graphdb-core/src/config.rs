use crate::error::{GraphError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default capacity for the edge cache (C3) when `edge_cache_size` is `<= 0`.
pub const DEFAULT_EDGE_CACHE_SIZE: usize = 10_000;

/// Default number of WAL records buffered before a forced flush in batched mode.
pub const DEFAULT_WAL_BATCH_THRESHOLD: usize = 1_000;

/// Default wall-clock flush interval for batched WAL mode.
pub const DEFAULT_WAL_FLUSH_INTERVAL_MS: u64 = 5;

/// Options recognized when opening a [`crate::GraphError`]-returning store.
///
/// Mirrors the on-disk layout and the option table: every field has a sane
/// default except `data_dir`, which must be set explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub use_disk_backed_edges: bool,
    pub edge_cache_size: i64,
    pub enable_batching: bool,
    pub enable_compression: bool,
    pub bulk_import_mode: bool,
    pub wal_batch_threshold: usize,
    pub wal_flush_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            use_disk_backed_edges: true,
            edge_cache_size: DEFAULT_EDGE_CACHE_SIZE as i64,
            enable_batching: false,
            enable_compression: true,
            bulk_import_mode: false,
            wal_batch_threshold: DEFAULT_WAL_BATCH_THRESHOLD,
            wal_flush_interval_ms: DEFAULT_WAL_FLUSH_INTERVAL_MS,
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Validates the configuration, normalizing values the spec treats as
    /// "implementation default" rather than rejecting them.
    pub fn validate(&mut self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(GraphError::InvalidConfig("data_dir must not be empty".into()));
        }
        if self.edge_cache_size <= 0 {
            self.edge_cache_size = DEFAULT_EDGE_CACHE_SIZE as i64;
        }
        if self.wal_batch_threshold == 0 {
            self.wal_batch_threshold = DEFAULT_WAL_BATCH_THRESHOLD;
        }
        Ok(())
    }

    pub fn edge_cache_capacity(&self) -> usize {
        if self.edge_cache_size <= 0 {
            DEFAULT_EDGE_CACHE_SIZE
        } else {
            self.edge_cache_size as usize
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("snapshot.json")
    }

    pub fn snapshot_tmp_path(&self) -> PathBuf {
        self.data_dir.join("snapshot.json.tmp")
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("wal.log")
    }

    pub fn edgestore_dir(&self) -> PathBuf {
        self.data_dir.join("edgestore")
    }
}

/// Loads a [`StoreConfig`] layered from `default.toml`, an optional
/// environment-named override file, and `GRAPHDB__`-prefixed environment
/// variables, following the same `config` crate layering convention the
/// teacher codebase uses for its own `Settings` type.
pub fn load_layered(config_dir: &Path, env: &str) -> Result<StoreConfig> {
    let builder = config::Config::builder()
        .add_source(config::File::from(config_dir.join("default")).required(false))
        .add_source(config::File::from(config_dir.join(env)).required(false))
        .add_source(config::Environment::with_prefix("GRAPHDB").separator("__"));

    let built = builder
        .build()
        .map_err(|e| GraphError::InvalidConfig(e.to_string()))?;

    let mut cfg: StoreConfig = built
        .try_deserialize()
        .map_err(|e| GraphError::InvalidConfig(e.to_string()))?;
    cfg.validate()?;
    Ok(cfg)
}
