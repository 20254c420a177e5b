//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

/// Number of events requested per poll.
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// Name of the lock serializing sync passes.
pub const DEFAULT_LOCK_RESOURCE: &str = "fsf:sync:file";

/// How sync passes are serialized.
///
/// Parsing ignores case, in configuration files as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ExclusionMode {
    /// One follower process; passes are serialized by an in-process mutex.
    #[default]
    Standalone,
    /// Several replicas; passes are serialized by a lock shared by all of them.
    Cluster,
}

impl FromStr for ExclusionMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standalone" => Ok(ExclusionMode::Standalone),
            "cluster" => Ok(ExclusionMode::Cluster),
            other => Err(SyncError::Config(format!("unknown exclusion mode '{other}'"))),
        }
    }
}

impl TryFrom<String> for ExclusionMode {
    type Error = SyncError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for ExclusionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionMode::Standalone => f.write_str("standalone"),
            ExclusionMode::Cluster => f.write_str("cluster"),
        }
    }
}

/// Configuration for sync passes.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory holding the replicated files.
    pub file_base: PathBuf,
    /// Maximum number of events per poll.
    pub page_size: u32,
    /// Exclusion mode.
    pub mode: ExclusionMode,
    /// Name of the exclusive lock.
    pub lock_resource: String,
    /// Shared directory for cluster lock files.
    pub lock_dir: Option<PathBuf>,
    /// Interval between scheduled passes.
    pub sync_interval: Duration,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    pub fn new(file_base: impl Into<PathBuf>) -> Self {
        Self {
            file_base: file_base.into(),
            page_size: DEFAULT_PAGE_SIZE,
            mode: ExclusionMode::Standalone,
            lock_resource: DEFAULT_LOCK_RESOURCE.to_string(),
            lock_dir: None,
            sync_interval: Duration::from_secs(5),
        }
    }

    /// Sets the poll page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Serializes passes across replicas with lock files in `lock_dir`.
    pub fn with_cluster_lock(mut self, lock_dir: impl Into<PathBuf>) -> Self {
        self.mode = ExclusionMode::Cluster;
        self.lock_dir = Some(lock_dir.into());
        self
    }

    /// Sets the exclusion mode.
    pub fn with_mode(mut self, mode: ExclusionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the lock resource name.
    pub fn with_lock_resource(mut self, resource: impl Into<String>) -> Self {
        self.lock_resource = resource.into();
        self
    }

    /// Sets the interval between scheduled passes.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Checks that the configuration can drive a pass.
    pub fn validate(&self) -> SyncResult<()> {
        if self.file_base.as_os_str().is_empty() {
            return Err(SyncError::Config(
                "missing file.base, unable to resolve base path".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(SyncError::Config("page size must be positive".into()));
        }
        if self.sync_interval.is_zero() {
            return Err(SyncError::Config("sync interval must be positive".into()));
        }
        if self.lock_resource.is_empty() {
            return Err(SyncError::Config("lock resource must not be empty".into()));
        }
        if self.mode == ExclusionMode::Cluster && self.lock_dir.is_none() {
            return Err(SyncError::Config(
                "cluster mode requires a shared lock directory".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Connection settings for the file-service.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Base URL of the file-service (e.g., "http://file-service:8080").
    pub base_url: String,
    /// Shared secret sent with every request.
    pub secret: Zeroizing<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Creates a new gateway configuration.
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            secret: Zeroizing::new(secret.into()),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks that both the base URL and the secret are present.
    pub fn validate(&self) -> SyncResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(SyncError::Config(
                "missing client.file_service_url, unable to resolve base url for file-service"
                    .into(),
            ));
        }
        if self.secret.is_empty() {
            return Err(SyncError::Config("missing secret for event sync".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("secret", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new("/data/files")
            .with_page_size(10)
            .with_cluster_lock("/shared/locks")
            .with_lock_resource("sync:test")
            .with_sync_interval(Duration::from_secs(3));

        assert_eq!(config.file_base, PathBuf::from("/data/files"));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.mode, ExclusionMode::Cluster);
        assert_eq!(config.lock_dir, Some(PathBuf::from("/shared/locks")));
        assert_eq!(config.lock_resource, "sync:test");
        assert_eq!(config.sync_interval, Duration::from_secs(3));
        config.validate().unwrap();
    }

    #[test]
    fn sync_config_defaults() {
        let config = SyncConfig::new("/data");
        assert_eq!(config.page_size, 30);
        assert_eq!(config.mode, ExclusionMode::Standalone);
        assert_eq!(config.lock_resource, "fsf:sync:file");
    }

    #[test]
    fn sync_config_rejects_missing_base() {
        assert!(matches!(
            SyncConfig::default().validate(),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn sync_config_rejects_zero_interval_and_page_size() {
        let config = SyncConfig::new("/data").with_sync_interval(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(SyncError::Config(ref m)) if m.contains("interval")
        ));

        let config = SyncConfig::new("/data").with_page_size(0);
        assert!(matches!(
            config.validate(),
            Err(SyncError::Config(ref m)) if m.contains("page size")
        ));
    }

    #[test]
    fn exclusion_mode_deserializes_any_case() {
        #[derive(Deserialize)]
        struct Section {
            mode: ExclusionMode,
        }

        for (raw, mode) in [
            ("cluster", ExclusionMode::Cluster),
            ("CLUSTER", ExclusionMode::Cluster),
            ("Standalone", ExclusionMode::Standalone),
            ("STANDALONE", ExclusionMode::Standalone),
        ] {
            let json = format!(r#"{{"mode": "{raw}"}}"#);
            let section: Section = serde_json::from_str(&json).unwrap();
            assert_eq!(section.mode, mode);
        }
        assert!(serde_json::from_str::<Section>(r#"{"mode": "server"}"#).is_err());
        assert_eq!(
            serde_json::to_string(&ExclusionMode::Cluster).unwrap(),
            r#""cluster""#
        );
    }

    #[test]
    fn cluster_mode_requires_lock_dir() {
        let config = SyncConfig::new("/data").with_mode(ExclusionMode::Cluster);
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }

    #[test]
    fn exclusion_mode_parsing() {
        assert_eq!(
            "CLUSTER".parse::<ExclusionMode>().unwrap(),
            ExclusionMode::Cluster
        );
        assert_eq!(
            "standalone".parse::<ExclusionMode>().unwrap(),
            ExclusionMode::Standalone
        );
        assert!("server".parse::<ExclusionMode>().is_err());
    }

    #[test]
    fn gateway_config_requires_secret_and_url() {
        assert!(GatewayConfig::new("http://fs:8080", "s").validate().is_ok());
        assert!(matches!(
            GatewayConfig::new("http://fs:8080", "").validate(),
            Err(SyncError::Config(ref m)) if m.contains("secret")
        ));
        assert!(matches!(
            GatewayConfig::new(" ", "s").validate(),
            Err(SyncError::Config(ref m)) if m.contains("url")
        ));
    }

    #[test]
    fn gateway_config_debug_hides_secret() {
        let config = GatewayConfig::new("http://fs:8080", "top-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("top-secret"));
    }
}
