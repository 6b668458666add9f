//! Configuration types for archive-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};
use utoipa::ToSchema;

/// Environment variable naming a JSON config file to load before other overrides
pub const CONFIG_FILE_ENV: &str = "ARCHIVE_DL_CONFIG";

/// Main configuration for [`ArchiveDownloader`](crate::ArchiveDownloader)
///
/// Every field has a default, so `Config::default()` is a working local setup
/// pointed at the public CNDA archive.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Remote archive connection settings
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Job execution and output layout
    #[serde(default)]
    pub download: DownloadConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

/// Remote archive connection settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ArchiveConfig {
    /// Base URL of the XNAT instance (default: "https://cnda.wustl.edu")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for connecting, logging in and listings; artifact transfers have
    /// no overall deadline (default: 300 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub request_timeout: Duration,

    /// Projects offered by the catalog endpoint
    #[serde(default = "default_projects")]
    pub projects: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            projects: default_projects(),
        }
    }
}

/// Job execution and output layout
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Root directory for artifacts; files land at `output_dir/project/subject.ext`
    /// (default: "downloads")
    #[serde(default = "default_output_dir")]
    #[schema(value_type = String)]
    pub output_dir: PathBuf,

    /// Maximum item tasks of one job running at the same time (default: 5)
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    /// Extension of the per-subject artifact (default: "zip")
    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,

    /// How long shutdown waits for running jobs to drain (default: 30 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub shutdown_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            artifact_extension: default_artifact_extension(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
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

    /// Rate limiting of job submissions
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Rate limiting configuration for `POST /api/download`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RateLimitConfig {
    /// Enable rate limiting (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Job submissions allowed per client IP per minute (default: 10)
    #[serde(default = "default_submissions_per_minute")]
    pub submissions_per_minute: u32,

    /// IPs exempt from rate limiting (default: localhost)
    #[serde(default = "default_exempt_ips")]
    #[schema(value_type = Vec<String>)]
    pub exempt_ips: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            submissions_per_minute: default_submissions_per_minute(),
            exempt_ips: default_exempt_ips(),
        }
    }
}

impl Config {
    /// Build configuration from the process environment
    ///
    /// Starts from defaults (or the JSON file named by `ARCHIVE_DL_CONFIG`) and
    /// applies `OUTPUT_DIR`, `ARCHIVE_URL`, `BIND_ADDRESS` and
    /// `MAX_CONCURRENT_TASKS` on top.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (see [`Config::from_env`])
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(dir) = lookup("OUTPUT_DIR") {
            config.download.output_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("ARCHIVE_URL") {
            config.archive.base_url = url;
        }
        if let Some(addr) = lookup("BIND_ADDRESS") {
            config.server.api.bind_address = addr.parse().map_err(|e| Error::Config {
                message: format!("invalid bind address {addr:?}: {e}"),
                key: Some("BIND_ADDRESS".to_string()),
            })?;
        }
        if let Some(limit) = lookup("MAX_CONCURRENT_TASKS") {
            config.download.max_concurrent_tasks = limit.parse().map_err(|e| Error::Config {
                message: format!("invalid task limit {limit:?}: {e}"),
                key: Some("MAX_CONCURRENT_TASKS".to_string()),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read config file {path}: {e}"),
            key: Some(CONFIG_FILE_ENV.to_string()),
        })?;
        serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("cannot parse config file {path}: {e}"),
            key: Some(CONFIG_FILE_ENV.to_string()),
        })
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.archive.base_url.trim().is_empty() {
            return Err(Error::Config {
                message: "archive base URL must not be empty".to_string(),
                key: Some("archive.base_url".to_string()),
            });
        }
        url::Url::parse(&self.archive.base_url).map_err(|e| Error::Config {
            message: format!("invalid archive base URL {:?}: {e}", self.archive.base_url),
            key: Some("archive.base_url".to_string()),
        })?;
        if self.download.max_concurrent_tasks == 0 {
            return Err(Error::Config {
                message: "max_concurrent_tasks must be at least 1".to_string(),
                key: Some("download.max_concurrent_tasks".to_string()),
            });
        }
        if self.download.artifact_extension.contains('/') {
            return Err(Error::Config {
                message: "artifact_extension must not contain a path separator".to_string(),
                key: Some("download.artifact_extension".to_string()),
            });
        }
        Ok(())
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://cnda.wustl.edu".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_projects() -> Vec<String> {
    ["NP1173", "MSC", "NP1091", "NP1054", "ABCD_pilot", "CIMT"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_concurrent_tasks() -> usize {
    5
}

fn default_artifact_extension() -> String {
    "zip".to_string()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
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

fn default_submissions_per_minute() -> u32 {
    10
}

fn default_exempt_ips() -> Vec<IpAddr> {
    use std::net::{Ipv4Addr, Ipv6Addr};
    vec![
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(Ipv6Addr::LOCALHOST),
    ]
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
