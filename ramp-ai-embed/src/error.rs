//! Error types for the embedding system

/// Result type for embedding operations.
///
/// Convenience alias using [`EmbedError`] as the error type; used throughout
/// the crate for operations that can fail.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// Every call to a hosted embedding service is fallible: the network can
/// drop, the service can rate-limit or reject the input, and the response
/// body can be malformed. Each variant carries enough context for a caller
/// to log the failure against the unit that triggered it.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when the provider configuration is invalid
    #[error("invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// Transport-level failures: connection errors, timeouts, TLS problems
    #[error("embedding request failed: {source}")]
    Request {
        #[from]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status
    #[error("embedding service returned HTTP {status}: {message}")]
    Service { status: u16, message: String },

    /// The service answered 2xx but the body did not match the contract
    #[error("malformed embedding response: {message}")]
    MalformedResponse { message: String },
}

impl EmbedError {
    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a malformed response error with a custom message.
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }
}
