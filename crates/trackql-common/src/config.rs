use serde::{Deserialize, Serialize};
use std::env;
use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};

// --- Constants for Default Configuration ---
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

pub const DEFAULT_STORAGE_ROOT_DIR: &str = "./data";

/// Upper bound on `list_all` results for capped kinds.
pub const DEFAULT_LIST_CAP: usize = 100;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    RocksDb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub http_addr: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub root_dir: String,
    /// JSON fixture loaded into the store at startup.
    #[serde(default)]
    pub seed_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub list_cap: usize,
    pub store_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub gateway: GatewayConfig,
    pub telemetry: TelemetryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.into(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            root_dir: DEFAULT_STORAGE_ROOT_DIR.into(),
            seed_file: None,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            list_cap: DEFAULT_LIST_CAP,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.into(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            gateway: GatewayConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.http_addr", DEFAULT_HTTP_ADDR)?
            .set_default("server.max_body_bytes", DEFAULT_MAX_BODY_BYTES as i64)?
            .set_default("storage.backend", "memory")?
            .set_default("storage.root_dir", DEFAULT_STORAGE_ROOT_DIR)?
            .set_default("gateway.list_cap", DEFAULT_LIST_CAP as i64)?
            .set_default("gateway.store_timeout_ms", DEFAULT_STORE_TIMEOUT_MS)?
            .set_default("telemetry.log_level", DEFAULT_LOG_LEVEL)
    }

    pub fn load() -> Result<Self, ConfigError> {
        let file_name = env::var("TRACKQL_CONFIG").unwrap_or_else(|_| "config".to_string());

        let s = Self::defaults()?
            // File: config.toml
            .add_source(File::with_name(&file_name).required(false))

            // Environment: TRACKQL__GATEWAY__LIST_CAP=50 -> gateway.list_cap=50
            .add_source(Environment::with_prefix("TRACKQL").separator("__"))

            // Short-hand overrides for container deployments
            .set_override_option("server.http_addr", env::var("HTTP_ADDR").ok())?
            .set_override_option("storage.seed_file", env::var("SEED_FILE").ok())?

            .build()?;

        s.try_deserialize()
    }

    /// Defaults overlaid with a TOML document; environment is not consulted.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(toml_str, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Renders the effective configuration, e.g. for a startup log line.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.gateway.store_timeout_ms)
    }
}
