//! Error types for the DNS sync system
//!
//! Every collaborator maps its failures onto one of these kinds so the
//! binary can decide on an exit status without knowing which provider ran.

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DNS sync system
#[derive(Error, Debug)]
pub enum Error {
    /// A required metadata value or the public IP could not be read
    #[error("Configuration unavailable: {0}")]
    ConfigUnavailable(String),

    /// Listing the zone's records failed (an empty listing is not an error)
    #[error("Record query failed: {0}")]
    RecordQuery(String),

    /// The DNS provider rejected a change batch
    #[error("Change submission rejected: {0}")]
    Submission(String),

    /// Fetching the status of a submitted change failed
    #[error("Change status poll failed: {0}")]
    TransientPoll(String),

    /// A change was still pending after the configured number of polls
    #[error("Change {change_id} still pending after {polls} poll(s)")]
    ConvergenceTimeout {
        /// Provider-assigned change id
        change_id: String,
        /// Number of status polls performed
        polls: u32,
    },

    /// The zone holds a record shape this tool refuses to reconcile
    #[error("Unsupported record state: {0}")]
    UnsupportedRecordState(String),

    /// No usable credentials for the DNS API
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration-unavailable error
    pub fn config_unavailable(msg: impl Into<String>) -> Self {
        Self::ConfigUnavailable(msg.into())
    }

    /// Create a record query error
    pub fn record_query(msg: impl Into<String>) -> Self {
        Self::RecordQuery(msg.into())
    }

    /// Create a change submission error
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    /// Create a transient poll error
    pub fn transient_poll(msg: impl Into<String>) -> Self {
        Self::TransientPoll(msg.into())
    }

    /// Create a convergence timeout error
    pub fn convergence_timeout(change_id: impl Into<String>, polls: u32) -> Self {
        Self::ConvergenceTimeout {
            change_id: change_id.into(),
            polls,
        }
    }

    /// Create an unsupported record state error
    pub fn unsupported_record_state(msg: impl Into<String>) -> Self {
        Self::UnsupportedRecordState(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// True for failures that happened before any DNS call was made
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigUnavailable(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
