use thiserror::Error;

/// Top-level error type for Scribe.
#[derive(Debug, Error)]
pub enum ScribeError {
    /// Error from an external text backend (completion, moderation, grammar).
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from the chat platform (fetch, send, moderation action).
    #[error("platform error: {0}")]
    Platform(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// History/audit storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
