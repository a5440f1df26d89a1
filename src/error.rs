//! Error types for the relay.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while turning message text into a dispatch unit.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Unrecognized message text: {0}")]
    UnrecognizedText(String),

    #[error("Could not determine media kind for {url}: {reason}")]
    MediaUndetermined { url: String, reason: String },
}

/// Recipient directory errors.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("No recipients subscribed to category {category}")]
    NotFound { category: String },

    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Per-recipient delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery to {chat_id} failed: {reason}")]
    Request { chat_id: i64, reason: String },

    #[error("Delivery to {chat_id} rejected with status {status}: {body}")]
    Status {
        chat_id: i64,
        status: u16,
        body: String,
    },
}

/// Why a single poll cycle produced nothing usable.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// Request never produced a response, even after the retry.
    #[error("Server unresponsive: {0}")]
    Transport(String),

    #[error("Unexpected response status {0}")]
    Status(u16),

    #[error("Failed to read response body: {0}")]
    Read(String),

    #[error("Malformed update envelope: {0}")]
    Envelope(String),
}

impl PollError {
    /// Whether this failure counts against the watcher's error budget.
    ///
    /// Transport failures are retried and then skipped without a charge.
    pub fn charges_budget(&self) -> bool {
        !matches!(self, PollError::Transport(_))
    }
}
