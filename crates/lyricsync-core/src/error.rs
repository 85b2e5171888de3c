//! Error types for lyricsync.

use thiserror::Error;

/// Result type alias using lyricsync's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lyricsync.
#[derive(Error, Debug)]
pub enum Error {
    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] HttpError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    // Storage errors
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Dataset index error: {0}")]
    Dataset(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// HTTP-specific errors.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed with status {status}: {message}")]
    StatusError { status: u16, message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,
}

impl Error {
    /// Returns true if this error came from the network layer.
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Http(_))
    }

    /// Returns true if the remote answered with a 404.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Http(HttpError::StatusError { status: 404, .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::Network("test".into()).is_network());
        assert!(Error::Http(HttpError::Timeout).is_network());
        assert!(!Error::Cache("test".into()).is_network());

        let not_found = Error::Http(HttpError::StatusError {
            status: 404,
            message: String::new(),
        });
        assert!(not_found.is_not_found());
        assert!(!Error::Http(HttpError::Timeout).is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = Error::Dataset("index missing".into());
        assert_eq!(err.to_string(), "Dataset index error: index missing");
    }
}
