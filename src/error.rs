//! Error types for rulemerge.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for rulemerge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or unreadable address list, bad config file, unusable output location
    #[error("configuration error: {0}")]
    Config(String),

    /// A single source could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// An artifact, the report or the metadata could not be persisted
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a write error for `path`.
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Write {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for rulemerge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure to retrieve one source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to fetch {address}: {cause}")]
pub struct FetchError {
    /// Address that was requested
    pub address: String,
    /// What went wrong
    pub cause: FetchCause,
}

impl FetchError {
    /// Create a new fetch error.
    pub fn new(address: impl Into<String>, cause: FetchCause) -> Self {
        Self {
            address: address.into(),
            cause,
        }
    }
}

/// Reason a fetch failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    /// Server answered with a non-2xx status
    #[error("HTTP status {0}")]
    Status(u16),

    /// DNS, TLS, connect or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body could not be read as text
    #[error("body error: {0}")]
    Body(String),
}
