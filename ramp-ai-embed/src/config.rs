//! Configuration for hosted embedding services

use crate::error::{EmbedError, Result};
use std::time::Duration;

/// Default API base for OpenAI-compatible embedding endpoints.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of embedding requests allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;

/// Configuration for a remote embedding provider.
///
/// This is the explicit context object handed to the provider: model name,
/// endpoint, credentials, per-request timeout, and the concurrency limit the
/// caller's worker pool should respect. There is no process-wide state; two
/// providers with different configs coexist without interfering.
#[derive(Debug, Clone)]
pub struct EmbedConfig {
    /// Name of the embedding model to request
    pub model_name: String,
    /// Base URL of the API, e.g. `https://api.openai.com/v1`
    pub api_base: String,
    /// Bearer token sent with each request, if the service requires one
    pub api_key: Option<String>,
    /// Timeout applied to every individual embedding request
    pub request_timeout: Duration,
    /// Upper bound on concurrent in-flight embedding requests
    pub max_concurrent_requests: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl EmbedConfig {
    /// Create a configuration for the given model with default endpoint,
    /// timeout, and concurrency.
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            request_timeout: DEFAULT_TIMEOUT,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    /// Set the API base URL (builder style)
    pub fn with_api_base<S: Into<String>>(self, api_base: S) -> Self {
        Self {
            api_base: api_base.into(),
            ..self
        }
    }

    /// Set the API key (builder style)
    pub fn with_api_key<S: Into<String>>(self, api_key: S) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..self
        }
    }

    /// Set the per-request timeout (builder style)
    pub fn with_request_timeout(self, request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            ..self
        }
    }

    /// Set the concurrency limit (builder style)
    pub fn with_max_concurrent_requests(self, max_concurrent_requests: usize) -> Self {
        Self {
            max_concurrent_requests,
            ..self
        }
    }

    /// The full URL of the embeddings endpoint.
    pub fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.api_base.trim_end_matches('/'))
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(EmbedError::invalid_config("model name must not be empty"));
        }
        if self.api_base.trim().is_empty() {
            return Err(EmbedError::invalid_config("api base must not be empty"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(EmbedError::invalid_config(
                "max_concurrent_requests must be at least 1",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(EmbedError::invalid_config(
                "request timeout must be non-zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EmbedConfig::default();
        assert_eq!(config.model_name, DEFAULT_MODEL);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.max_concurrent_requests, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn embeddings_url_handles_trailing_slash() {
        let config = EmbedConfig::new("m").with_api_base("http://localhost:9999/v1/");
        assert_eq!(config.embeddings_url(), "http://localhost:9999/v1/embeddings");
    }

    #[test]
    fn validate_rejects_bad_configs() {
        assert!(EmbedConfig::new("").validate().is_err());
        assert!(
            EmbedConfig::new("m")
                .with_max_concurrent_requests(0)
                .validate()
                .is_err()
        );
        assert!(
            EmbedConfig::new("m")
                .with_request_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn builder_methods_chain() {
        let config = EmbedConfig::new("text-embedding-3-large")
            .with_api_key("sk-test")
            .with_request_timeout(Duration::from_secs(5))
            .with_max_concurrent_requests(8);

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_concurrent_requests, 8);
    }
}
