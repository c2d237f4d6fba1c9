//! Error types shared by every nodesync crate

use std::path::PathBuf;

use thiserror::Error;

/// nodesync error types
///
/// Each variant names the stage that failed so a tick's log line is enough
/// to tell a cluster outage from a broken helper.
#[derive(Debug, Error)]
pub enum Error {
    /// Snapshot acquisition from the cluster failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Template or document generation failed
    #[error("Render error: {0}")]
    Render(String),

    /// Local persistence of a rendered artifact failed
    #[error("Write error for {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// External reload command failed to launch or exited non-zero
    #[error("Reload error: {0}")]
    Reload(String),

    /// Remote service call was rejected or the service was unreachable
    #[error("Remote API error: {0}")]
    RemoteApi(String),

    /// Construction-time misconfiguration, fatal at startup
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short stage label used as a structured logging field
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Render(_) => "render",
            Self::Write { .. } => "write",
            Self::Reload(_) => "reload",
            Self::RemoteApi(_) => "remote_api",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for nodesync operations
pub type Result<T> = std::result::Result<T, Error>;
