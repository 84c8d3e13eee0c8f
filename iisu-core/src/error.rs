use thiserror::Error;

/// Errors raised by scraping, caching and compositing.
#[derive(Error, Debug)]
pub enum ArtError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON from a provider or dataset.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Status returned by the server.
        status: reqwest::StatusCode,
        /// Requested URL.
        url: String,
    },

    /// Undecodable or unwritable image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Failure inside the download cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Corrupt dataset archive.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A required file, binary or record is missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad argument or configuration value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A provider is enabled without its API key.
    #[error("Missing {provider} credentials: set {env_var}")]
    MissingCredentials {
        /// Provider display name.
        provider: &'static str,
        /// Environment variable that should hold the key.
        env_var: String,
    },

    /// The run was cancelled.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Unexpected failure, such as a panicked blocking task.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArtError {
    /// Transient failures worth another attempt: 429, 5xx, timeouts and
    /// refused connections.
    pub fn is_retryable(&self) -> bool {
        match self {
            ArtError::Http(e) => e.is_timeout() || e.is_connect(),
            ArtError::HttpStatus { status, .. } => {
                status.as_u16() == 429 || status.is_server_error()
            }
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for ArtError {
    fn from(err: tokio::task::JoinError) -> Self {
        ArtError::Internal(format!("blocking task failed: {err}"))
    }
}

/// Result alias over [`ArtError`].
pub type Result<T> = std::result::Result<T, ArtError>;
