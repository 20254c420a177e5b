//! Follower configuration file.
//!
//! ```toml
//! [client]
//! file_service_url = "http://file-service:8080"
//! secret = "..."            # or FSF_SECRET
//! timeout_secs = 30
//!
//! [file]
//! base = "/data/files"
//!
//! [ledger]
//! path = "/data/fsf/ledger.db"
//!
//! [sync]
//! mode = "standalone"       # or "cluster"
//! interval_secs = 5
//! page_size = 30
//! lock_dir = "/shared/locks"
//! lock_resource = "fsf:sync:file"
//! instance = "follower-1"
//! ```

use fsf_sync_engine::{
    ExclusionMode, GatewayConfig, SyncConfig, DEFAULT_LOCK_RESOURCE, DEFAULT_PAGE_SIZE,
};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `client.secret`.
pub const SECRET_ENV: &str = "FSF_SECRET";

const DEFAULT_LEDGER_PATH: &str = "fsf-ledger.db";
const DEFAULT_INSTANCE: &str = "fsf-follower";

/// Errors loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },

    /// A required setting is absent.
    #[error("missing {0}")]
    Missing(&'static str),

    /// A setting is present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Parsed configuration file.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// File-service connection.
    #[serde(default)]
    pub client: ClientSection,
    /// Local file store.
    #[serde(default)]
    pub file: FileSection,
    /// Ledger database.
    #[serde(default)]
    pub ledger: LedgerSection,
    /// Scheduling and exclusion.
    #[serde(default)]
    pub sync: SyncSection,
}

/// `[client]` section.
#[derive(Default, Deserialize)]
pub struct ClientSection {
    /// Base URL of the file-service.
    pub file_service_url: Option<String>,
    /// Shared secret.
    pub secret: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for ClientSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSection")
            .field("file_service_url", &self.file_service_url)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// `[file]` section.
#[derive(Debug, Default, Deserialize)]
pub struct FileSection {
    /// Directory holding the replicated files.
    pub base: Option<PathBuf>,
}

/// `[ledger]` section.
#[derive(Debug, Default, Deserialize)]
pub struct LedgerSection {
    /// SQLite database path.
    pub path: Option<PathBuf>,
}

/// `[sync]` section.
#[derive(Debug, Default, Deserialize)]
pub struct SyncSection {
    /// Exclusion mode.
    #[serde(default)]
    pub mode: ExclusionMode,
    /// Seconds between scheduled passes.
    pub interval_secs: Option<u64>,
    /// Events per poll.
    pub page_size: Option<u32>,
    /// Shared lock directory for cluster mode.
    pub lock_dir: Option<PathBuf>,
    /// Lock resource name.
    pub lock_resource: Option<String>,
    /// Name written to the ledger audit columns.
    pub instance: Option<String>,
}

impl AppConfig {
    /// Loads the file at `path` and applies the `FSF_SECRET` override.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.with_secret_override(std::env::var(SECRET_ENV).ok()))
    }

    /// Parses configuration text.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Replaces the secret when `secret` is set and not empty.
    pub fn with_secret_override(mut self, secret: Option<String>) -> Self {
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.client.secret = Some(secret);
        }
        self
    }

    /// Ledger database path.
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_PATH))
    }

    /// Instance name for the ledger audit columns.
    pub fn instance(&self) -> &str {
        self.sync.instance.as_deref().unwrap_or(DEFAULT_INSTANCE)
    }

    /// Builds the sync engine configuration.
    pub fn sync_config(&self) -> Result<SyncConfig, ConfigError> {
        let base = self
            .file
            .base
            .clone()
            .filter(|b| !b.as_os_str().is_empty())
            .ok_or(ConfigError::Missing("file.base"))?;

        let mut config = SyncConfig::new(base)
            .with_mode(self.sync.mode)
            .with_page_size(self.sync.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
            .with_lock_resource(
                self.sync
                    .lock_resource
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LOCK_RESOURCE.to_string()),
            );
        if let Some(secs) = self.sync.interval_secs {
            config = config.with_sync_interval(Duration::from_secs(secs));
        }
        if self.sync.mode == ExclusionMode::Cluster {
            let lock_dir = self
                .sync
                .lock_dir
                .clone()
                .ok_or(ConfigError::Missing("sync.lock_dir"))?;
            config = config.with_cluster_lock(lock_dir);
        }
        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }

    /// Builds the file-service connection settings.
    pub fn gateway_config(&self) -> Result<GatewayConfig, ConfigError> {
        let url = self
            .client
            .file_service_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::Missing("client.file_service_url"))?;
        let secret = self
            .client
            .secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("client.secret"))?;

        let mut config = GatewayConfig::new(url, secret);
        if let Some(secs) = self.client.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}
