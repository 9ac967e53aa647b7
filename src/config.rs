use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::ConfigError;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

fn default_timeout_secs() -> u64 {
    300
}

fn default_records_dir() -> PathBuf {
    PathBuf::from("json")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root media directory used by "Browse" and "Edit MKV files"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_directory: Option<PathBuf>,
    /// List MKV files in nested directories too when browsing and editing
    #[serde(default)]
    pub include_subdirectories: bool,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path or name of the mkvpropedit binary
    pub mkvpropedit_path: String,
    /// Path or name of the mediainfo binary
    pub mediainfo_path: String,
    /// Upper bound for a single tool invocation, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the per-directory record files
    #[serde(default = "default_records_dir")]
    pub records_dir: PathBuf,
    /// Keep at most this many backups per directory; unset keeps all of them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backups: Option<usize>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            mkvpropedit_path: "mkvpropedit".to_string(),
            mediainfo_path: "mediainfo".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            records_dir: default_records_dir(),
            max_backups: None,
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            Self::from_file(path)
        } else {
            info!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;

        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.media_directory = Some(PathBuf::from("/srv/media/shows"));
        config.store.max_backups = Some(5);
        config.save_to_file(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.tools.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "media_directory = \"/data/tv\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.media_directory, Some(PathBuf::from("/data/tv")));
        assert_eq!(config.tools.mkvpropedit_path, "mkvpropedit");
        assert_eq!(config.store.records_dir, PathBuf::from("json"));
        assert!(!config.include_subdirectories);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "media_directory = [").unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
