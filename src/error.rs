use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MkvFlagsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("Inspection error: {0}")]
    Inspection(#[from] InspectionError),

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Restore error: {0}")]
    Restore(#[from] RestoreError),

    #[error("Navigation error: {0}")]
    Nav(#[from] NavError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

pub type Result<T> = std::result::Result<T, MkvFlagsError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures of the startup dependency check.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("{tool} is required but was not installed (declined by user)")]
    Declined { tool: String },

    #[error("{tool} could not be installed automatically; install it manually from {url}")]
    ManualInstallRequired { tool: String, url: String },

    #[error("Installing {tool} failed: {message}")]
    InstallFailed { tool: String, message: String },
}

/// Failures of the media-inspection call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InspectionError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not analyse {}: {message}", .path.display())]
    Unreadable { path: PathBuf, message: String },

    #[error("No audio or subtitle tracks in {}", .0.display())]
    NoTracks(PathBuf),
}

/// Failures of the metadata-editor call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Editor binary not available: {0}")]
    ToolMissing(String),

    #[error("Editor exited with code {code:?}: {stderr}")]
    InvocationFailed { code: Option<i32>, stderr: String },

    #[error("Editor timed out after {0:?}")]
    Timeout(Duration),

    #[error("Permission denied while writing {}", .0.display())]
    PermissionDenied(PathBuf),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read records {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt record file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("No backup found for {}", .0.display())]
    NoBackupFound(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug, PartialEq)]
pub enum NavError {
    #[error("No such directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Cannot read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Inspection(#[from] InspectionError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Restore(#[from] RestoreError),

    #[error("Track {track} not found in {}", .path.display())]
    TrackNotFound { path: PathBuf, track: u32 },

    #[error("Track {track} in {} is {actual}, expected {expected}", .path.display())]
    TrackKindMismatch {
        path: PathBuf,
        track: u32,
        expected: String,
        actual: String,
    },
}
