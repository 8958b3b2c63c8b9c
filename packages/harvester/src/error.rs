//! Typed errors for the harvester library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! skippable per-item failure from a fatal input problem.

use std::path::PathBuf;

use thiserror::Error;

/// Run-level errors. Anything surfacing here terminates the stage.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The driving input table could not be read or is malformed
    #[error("input table {path}: {reason}")]
    InputTable { path: PathBuf, reason: String },

    /// A resume checkpoint does not describe a prefix of the input table
    #[error("checkpoint does not match input at row {row}: expected {expected}, found {found}")]
    CheckpointMismatch {
        row: usize,
        expected: String,
        found: String,
    },

    /// Checkpoint could not be persisted
    #[error("checkpoint write failed: {0}")]
    Checkpoint(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid configuration value
    #[error("config error: {0}")]
    Config(String),

    /// Filesystem error outside of the driving input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarvestError {
    pub fn input_table(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InputTable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors from a single browser-driven page load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Browser process could not be started
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// Navigation to the listing URL failed
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Script execution or content read failed mid-session
    #[error("browser session error: {0}")]
    Session(String),

    /// Listing URL could not be built
    #[error("invalid listing URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors from one metadata request attempt. All of them are transient.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Attempt exceeded its time budget
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Header value from configuration is not a valid header
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// Errors from one ranked listing query or kernel pull.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The external command could not be spawned
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external command exited unsuccessfully
    #[error("{program} exited with {code:?}: {stderr}")]
    Command {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Output could not be parsed
    #[error("unparseable listing output: {0}")]
    Parse(#[from] csv::Error),

    /// Pulled file was not where it was expected
    #[error("no pulled file for {0}")]
    MissingOutput(String),

    /// Filesystem error while moving pulled files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for run-level operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for page loads.
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Result type alias for metadata fetch attempts.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for listing queries.
pub type ListingResult<T> = std::result::Result<T, ListingError>;
