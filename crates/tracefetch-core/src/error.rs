//! Error types for TraceFetch

use thiserror::Error;

/// Result type alias using TraceFetch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for TraceFetch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure (connect, timeout, decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response that has no dedicated variant
    #[error("API returned {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found error
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up
        entity: String,
        /// Identifier that was looked up
        id: String,
    },

    /// The trace exists but has not been shared publicly
    #[error("Trace is not publicly shared: {0}. Set LANGSMITH_API_KEY and use `tracefetch tree` for authenticated access")]
    NotPublic(String),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_conversion() {
        let err: Error = config::ConfigError::Message("bad key".to_string()).into();
        assert!(matches!(err, Error::Config(ref msg) if msg == "bad key"));
    }

    #[test]
    fn test_not_public_points_at_authenticated_access() {
        let msg = Error::NotPublic("tok".to_string()).to_string();
        assert!(msg.contains("tok"));
        assert!(msg.contains("tracefetch tree"));
    }
}
