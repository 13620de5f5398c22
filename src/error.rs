use thiserror::Error;

/// Main error type for the claim bot
#[derive(Error, Debug)]
pub enum TrawlError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Game / chain data errors
    #[error("Invalid game data: {0}")]
    GameData(String),

    #[error("Invalid object content: {0}")]
    InvalidObject(String),

    // Signing errors
    #[error("Signer error: {0}")]
    Signer(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TrawlError {
    /// Network hiccups that are expected to clear up by the next poll tick
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TrawlError::Http(_) | TrawlError::RateLimited(_) | TrawlError::Rpc { .. }
        )
    }
}

/// Result type alias for TrawlError
pub type Result<T> = std::result::Result<T, TrawlError>;
