//! Configuration types for media-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Main configuration for [`MediaScheduler`](crate::MediaScheduler)
///
/// Settings are grouped into sub-configs, each a TOML table:
/// - [`quota`](QuotaConfig): per-key request and memory ceilings
/// - [`retention`](RetentionConfig): dispatcher tick, retention and orphan sweeps
/// - [`workers`](WorkerConfig): pool size
/// - [`download`](DownloadConfig): artifact root and default route
/// - [`persistence`](PersistenceConfig): document store backend
/// - [`tools`](ToolsConfig): extraction engine binary
/// - [`api`](ApiConfig): REST binding
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Per-key quotas
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Dispatcher timing and retention
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Worker pool
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Artifact storage and routing
    #[serde(default)]
    pub download: DownloadConfig,

    /// Document store backend
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// REST API
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| Error::Config {
            message: e.to_string(),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workers.max_workers == 0 {
            return Err(Error::Config {
                message: "max_workers must be at least 1".into(),
                key: Some("workers.max_workers".into()),
            });
        }
        if self.retention.tick_interval.is_zero() {
            return Err(Error::Config {
                message: "tick_interval must be greater than zero".into(),
                key: Some("retention.tick_interval".into()),
            });
        }
        if self.retention.orphan_sweep_interval.is_zero() {
            return Err(Error::Config {
                message: "orphan_sweep_interval must be greater than zero".into(),
                key: Some("retention.orphan_sweep_interval".into()),
            });
        }
        if let Some(proxy) = &self.download.default_proxy {
            url::Url::parse(proxy).map_err(|e| Error::Config {
                message: format!("invalid default proxy '{proxy}': {e}"),
                key: Some("download.default_proxy".into()),
            })?;
        }
        Ok(())
    }

    /// Artifact root
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }
}

/// Per-key quota configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum live tasks a key may own (default: 60)
    #[serde(default = "default_request_limit")]
    pub request_limit: usize,

    /// Maximum bytes a key may reserve inside the memory window (default: 5 GiB)
    #[serde(default = "default_memory_limit")]
    pub memory_limit_bytes: u64,

    /// Trailing window for memory accounting (default: 10 minutes)
    #[serde(default = "default_memory_window", with = "duration_serde")]
    pub memory_window: Duration,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            request_limit: default_request_limit(),
            memory_limit_bytes: default_memory_limit(),
            memory_window: default_memory_window(),
        }
    }
}

/// Dispatcher timing and retention configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// How long terminal tasks and their artifacts are kept (default: 10 minutes)
    ///
    /// Every record counts toward the request limit until it is removed, so this
    /// is also the rate window.
    #[serde(default = "default_task_retention", with = "duration_serde")]
    pub task_retention: Duration,

    /// How often orphaned artifact directories are removed (default: 5 minutes)
    #[serde(default = "default_orphan_sweep_interval", with = "duration_serde")]
    pub orphan_sweep_interval: Duration,

    /// Dispatcher tick (default: 1 second)
    #[serde(default = "default_tick_interval", with = "duration_serde")]
    pub tick_interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            task_retention: default_task_retention(),
            orphan_sweep_interval: default_orphan_sweep_interval(),
            tick_interval: default_tick_interval(),
        }
    }
}

/// Worker pool configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum tasks executing at once (default: 4)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
        }
    }
}

/// Artifact storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Artifact root, one directory per task (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Proxy used when a task carries no route override
    #[serde(default)]
    pub default_proxy: Option<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            default_proxy: None,
        }
    }
}

/// Document store backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum PersistenceConfig {
    /// One JSON file per document inside `dir`
    Json {
        /// Directory holding `keys.json` and `tasks.json` (default: "./db")
        #[serde(default = "default_json_dir")]
        dir: PathBuf,
    },
    /// A single SQLite database
    Sqlite {
        /// Database path (default: "./media-dl.db")
        #[serde(default = "default_database_path")]
        path: PathBuf,
    },
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig::Json {
            dir: default_json_dir(),
        }
    }
}

/// External tool configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub yt_dlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: None,
            search_path: true,
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

// Default value functions
fn default_request_limit() -> usize {
    60
}

fn default_memory_limit() -> u64 {
    5 * 1024 * 1024 * 1024 // 5 GiB
}

fn default_memory_window() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_task_retention() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_orphan_sweep_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_workers() -> usize {
    4
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_json_dir() -> PathBuf {
    PathBuf::from("db")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("media-dl.db")
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
