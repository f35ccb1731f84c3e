use casket_core::{BackendKind, DEFAULT_SEGMENTS, Result, StoreError, validate_segment_count};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5722";
pub const DEFAULT_DB_NAME: &str = "boris";
pub const DEFAULT_MAX_VALUE_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    /// Directory holding the database file; the system temp dir when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_db_name")]
    pub db_name: String,
    #[serde(default = "default_segments")]
    pub segments: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            db_name: default_db_name(),
            segments: default_segments(),
        }
    }
}

impl StorageConfig {
    pub fn db_file(&self) -> PathBuf {
        let dir = self.path.clone().unwrap_or_else(std::env::temp_dir);
        dir.join(format!("{}.db", self.db_name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Map engine errors to distinct status codes instead of a blanket 400.
    #[serde(default)]
    pub strict_status: bool,
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            strict_status: false,
            max_value_bytes: default_max_value_bytes(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            storage: StorageConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_backend() -> BackendKind {
    BackendKind::Sqlite
}

fn default_db_name() -> String {
    DEFAULT_DB_NAME.to_string()
}

fn default_segments() -> usize {
    DEFAULT_SEGMENTS
}

fn default_max_value_bytes() -> usize {
    DEFAULT_MAX_VALUE_BYTES
}

impl Config {
    /// Load defaults, then the optional file, then `CASKET_*` variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }

        let settings = builder
            .add_source(::config::Environment::with_prefix("CASKET").separator("__"))
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(StoreError::Config("bind_addr cannot be blank".to_string()));
        }
        if self.storage.db_name.trim().is_empty() {
            return Err(StoreError::Config("db_name cannot be blank".to_string()));
        }
        if let Some(path) = &self.storage.path {
            let meta = std::fs::metadata(path).map_err(|e| {
                StoreError::Config(format!("storage path {:?}: {}", path, e))
            })?;
            if !meta.is_dir() {
                return Err(StoreError::Config(format!(
                    "storage path is not a directory: {:?}",
                    path
                )));
            }
        }
        if self.gateway.max_value_bytes == 0 {
            return Err(StoreError::Config(
                "max_value_bytes must be positive".to_string(),
            ));
        }
        validate_segment_count(self.storage.segments)
    }
}
