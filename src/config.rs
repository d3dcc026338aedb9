//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Storage locations for committed media and pipeline scratch space
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Permanent media directory (default: "./media")
    ///
    /// Committed artifacts land under this root; the success notification
    /// shows paths relative to it.
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,

    /// Scratch directory for per-run temp files (default: "./temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_dir: default_media_dir(),
            temp_dir: default_temp_dir(),
        }
    }
}

/// Remote fetching behavior
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header sent with every remote fetch
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// CDN prefix prepended to every `BaseURL` of a DASH manifest
    #[serde(default = "default_cdn_base_url")]
    pub cdn_base_url: String,

    /// Per-request timeout in seconds (default: 120)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            cdn_base_url: default_cdn_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// External tool paths (ffmpeg)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// Ledger persistence settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database path (default: "./media-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Rows returned per `query_tasks` page (default: 30)
    #[serde(default = "default_query_page_size")]
    pub query_page_size: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            query_page_size: default_query_page_size(),
        }
    }
}

/// Main configuration for [`DownloadController`](crate::DownloadController)
///
/// Fields are organized into logical sub-configs:
/// - [`storage`](StorageConfig) — media and scratch directories
/// - [`fetch`](FetchConfig) — User-Agent, CDN prefix, timeouts
/// - [`tools`](ToolsConfig) — external binary paths
/// - [`persistence`](PersistenceConfig) — ledger database
///
/// All sub-config fields are flattened so the JSON/TOML format stays flat.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage directories
    #[serde(flatten)]
    pub storage: StorageConfig,

    /// Remote fetching behavior
    #[serde(flatten)]
    pub fetch: FetchConfig,

    /// External tool paths
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Ledger persistence
    #[serde(flatten)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Validate configuration values that would otherwise fail deep inside
    /// the pipeline with a confusing error
    pub fn validate(&self) -> Result<()> {
        if self.fetch.user_agent.trim().is_empty() {
            return Err(Error::Config {
                message: "user_agent must not be empty".to_string(),
                key: Some("user_agent".to_string()),
            });
        }

        if url::Url::parse(&self.fetch.cdn_base_url).is_err() {
            return Err(Error::Config {
                message: format!("cdn_base_url is not a valid URL: {}", self.fetch.cdn_base_url),
                key: Some("cdn_base_url".to_string()),
            });
        }

        if self.persistence.query_page_size == 0 {
            return Err(Error::Config {
                message: "query_page_size must be at least 1".to_string(),
                key: Some("query_page_size".to_string()),
            });
        }

        Ok(())
    }
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("./media")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Linux; Android 13) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/117.0.0.0 Mobile Safari/537.36"
        .to_string()
}

fn default_cdn_base_url() -> String {
    "https://cf-st.sc-cdn.net/d/".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./media-dl.db")
}

fn default_query_page_size() -> usize {
    30
}

fn default_true() -> bool {
    true
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn empty_user_agent_is_rejected() {
        let mut config = Config::default();
        config.fetch.user_agent = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(k), .. } if k == "user_agent"));
    }

    #[test]
    fn invalid_cdn_base_url_is_rejected() {
        let mut config = Config::default();
        config.fetch.cdn_base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut config = Config::default();
        config.persistence.query_page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserializes_from_flat_json() {
        let json = r#"{
            "media_dir": "/data/media",
            "database_path": "/data/ledger.db",
            "ffmpeg_path": "/usr/bin/ffmpeg"
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.storage.media_dir, PathBuf::from("/data/media"));
        assert_eq!(
            config.persistence.database_path,
            PathBuf::from("/data/ledger.db")
        );
        assert_eq!(config.tools.ffmpeg_path, Some(PathBuf::from("/usr/bin/ffmpeg")));
        // Untouched fields fall back to defaults
        assert_eq!(config.persistence.query_page_size, 30);
        assert!(config.tools.search_path);
    }
}
