//! Embedding provider implementations

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fnv::FnvHasher;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;

/// Trait for embedding providers that can generate embeddings from text.
///
/// Every implementation must treat each call as fallible: network errors,
/// rate limits, and malformed input all surface as [`EmbedError`] rather
/// than panics, so callers can degrade a single unit to a failure record
/// without affecting its siblings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts in one request
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    error: ServiceErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorDetail {
    message: String,
}

/// Embedding provider backed by a hosted OpenAI-compatible HTTP service.
///
/// Each request posts `{model, input}` to the configured `/embeddings`
/// endpoint with bearer authentication and the per-request timeout from
/// [`EmbedConfig`]. The provider holds no mutable state and is cheap to
/// clone; concurrency limiting is the caller's responsibility (the config
/// carries the intended limit).
#[derive(Debug, Clone)]
pub struct RemoteEmbeddingProvider {
    config: EmbedConfig,
    client: reqwest::Client,
}

impl RemoteEmbeddingProvider {
    /// Create a provider from the given configuration.
    pub fn new(config: EmbedConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { config, client })
    }

    /// The configuration this provider was built from.
    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    async fn request_embeddings(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        tracing::debug!(
            "Requesting {} embeddings from model {}",
            inputs.len(),
            self.config.model_name
        );

        let body = EmbeddingRequest {
            model: &self.config.model_name,
            input: inputs,
        };

        let mut request = self.client.post(self.config.embeddings_url()).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ServiceErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(EmbedError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::malformed(e.to_string()))?;

        if parsed.data.len() != inputs.len() {
            return Err(EmbedError::malformed(format!(
                "requested {} embeddings but received {}",
                inputs.len(),
                parsed.data.len()
            )));
        }

        // The service reports an index per embedding; restore request order
        // rather than trusting response order.
        let mut ordered: Vec<Option<Vec<f32>>> = vec![None; inputs.len()];
        for item in parsed.data {
            let slot = ordered
                .get_mut(item.index)
                .ok_or_else(|| EmbedError::malformed(format!("index {} out of range", item.index)))?;
            *slot = Some(item.embedding);
        }

        let embeddings: Vec<Vec<f32>> = ordered
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.ok_or_else(|| EmbedError::malformed(format!("missing index {i}"))))
            .collect::<Result<_>>()?;

        tracing::debug!(
            "Received {} embeddings of dimension {}",
            embeddings.len(),
            embeddings.first().map(|e| e.len()).unwrap_or(0)
        );
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let inputs = [text.to_string()];
        let mut embeddings = self.request_embeddings(&inputs).await?;
        embeddings
            .pop()
            .ok_or_else(|| EmbedError::malformed("no embedding generated for text"))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request_embeddings(texts).await
    }

    fn provider_name(&self) -> &str {
        "remote"
    }
}

/// A deterministic in-process provider for tests and offline runs.
///
/// Vectors are derived from an FNV hash of the input text, so the same text
/// always embeds to the same vector and different texts almost never
/// collide. An optional trigger substring makes specific inputs fail, which
/// lets tests exercise per-unit failure isolation.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimension: usize,
    fail_on: Option<String>,
}

impl MockEmbeddingProvider {
    /// Create a mock producing vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail_on: None,
        }
    }

    /// Make any text containing `trigger` fail to embed (builder style)
    pub fn with_failure_on<S: Into<String>>(self, trigger: S) -> Self {
        Self {
            fail_on: Some(trigger.into()),
            ..self
        }
    }

    fn hash_component(text: &str, component: usize) -> f32 {
        let mut hasher = FnvHasher::default();
        hasher.write(text.as_bytes());
        hasher.write(&component.to_le_bytes());
        let bits = hasher.finish();
        // Map the hash onto [-1.0, 1.0]
        (bits as f64 / u64::MAX as f64) as f32 * 2.0 - 1.0
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(trigger) = &self.fail_on {
            if text.contains(trigger.as_str()) {
                return Err(EmbedError::Service {
                    status: 429,
                    message: format!("mock failure triggered by {trigger:?}"),
                });
            }
        }
        Ok((0..self.dimension)
            .map(|i| Self::hash_component(text, i))
            .collect())
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text)
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server_uri: &str) -> EmbedConfig {
        EmbedConfig::new("test-model")
            .with_api_base(format!("{server_uri}/v1"))
            .with_api_key("sk-test")
    }

    #[test]
    fn mock_provider_is_deterministic() {
        let provider = MockEmbeddingProvider::new(8);
        let a = provider.embed("def foo(): return 1").unwrap();
        let b = provider.embed("def foo(): return 1").unwrap();
        let c = provider.embed("def bar(): return 2").unwrap();

        assert_eq!(a.len(), 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|x| (-1.0..=1.0).contains(x)));
    }

    #[tokio::test]
    async fn mock_provider_failure_trigger() {
        let provider = MockEmbeddingProvider::new(4).with_failure_on("poison");

        assert!(provider.embed_text("clean text").await.is_ok());
        let err = provider.embed_text("poison pill").await.unwrap_err();
        assert!(matches!(err, EmbedError::Service { status: 429, .. }));
    }

    #[tokio::test]
    async fn remote_provider_embeds_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "input": ["hello world"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [0.25, -0.5, 1.0]}],
            })))
            .mount(&server)
            .await;

        let provider = RemoteEmbeddingProvider::new(test_config(&server.uri())).unwrap();
        let vector = provider.embed_text("hello world").await.unwrap();
        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn remote_provider_restores_response_order() {
        let server = MockServer::start().await;

        // Out-of-order response data must be realigned by index.
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"index": 1, "embedding": [2.0]},
                    {"index": 0, "embedding": [1.0]},
                ],
            })))
            .mount(&server)
            .await;

        let provider = RemoteEmbeddingProvider::new(test_config(&server.uri())).unwrap();
        let texts = vec!["first".to_string(), "second".to_string()];
        let embeddings = provider.embed_texts(&texts).await.unwrap();
        assert_eq!(embeddings, vec![vec![1.0], vec![2.0]]);
    }

    #[tokio::test]
    async fn remote_provider_surfaces_service_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "rate limit exceeded"},
            })))
            .mount(&server)
            .await;

        let provider = RemoteEmbeddingProvider::new(test_config(&server.uri())).unwrap();
        let err = provider.embed_text("anything").await.unwrap_err();
        match err {
            EmbedError::Service { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "rate limit exceeded");
            }
            other => panic!("expected Service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn remote_provider_rejects_count_mismatch() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [],
            })))
            .mount(&server)
            .await;

        let provider = RemoteEmbeddingProvider::new(test_config(&server.uri())).unwrap();
        let err = provider.embed_text("anything").await.unwrap_err();
        assert!(matches!(err, EmbedError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn embed_texts_empty_input_short_circuits() {
        let provider =
            RemoteEmbeddingProvider::new(test_config("http://localhost:1")).unwrap();
        let embeddings = provider.embed_texts(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }
}
