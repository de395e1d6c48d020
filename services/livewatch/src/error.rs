//! Error types for the livewatch service

/// Errors that can occur in the livewatch service
#[derive(Debug, thiserror::Error)]
pub enum LivewatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Notification delivery failed: {0}")]
    Notify(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Startup failed: {0}")]
    Startup(String),
}

/// Result type alias for livewatch operations
pub type Result<T> = std::result::Result<T, LivewatchError>;
