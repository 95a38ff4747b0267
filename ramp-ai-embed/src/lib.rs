//! # ramp-ai-embed
//!
//! Client library for hosted text-embedding services, designed for async
//! operation with a clean provider abstraction so callers never depend on a
//! specific vendor.
//!
//! ## Features
//!
//! - **Hosted Models**: Calls an OpenAI-compatible `/embeddings` endpoint
//!   over HTTP; no local model files to manage
//! - **Async-First Design**: Full async/await support, one fallible request
//!   per call with a configurable timeout
//! - **Deterministic Mock**: An in-process provider for tests and offline
//!   runs that derives stable vectors from the input text
//! - **Configurable**: Explicit configuration objects with sensible defaults
//!
//! ## Quick Start
//!
//! ```no_run
//! use ramp_ai_embed::{EmbedConfig, EmbeddingProvider, RemoteEmbeddingProvider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = EmbedConfig::new("text-embedding-3-small").with_api_key("sk-...");
//! let provider = RemoteEmbeddingProvider::new(config)?;
//!
//! let vector = provider.embed_text("fn main() {}").await?;
//! println!("embedded into {} dimensions", vector.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] using the crate's [`EmbedError`]
//! type. Every request is fallible by contract — rate limits, network
//! failures, and malformed responses are ordinary outcomes a caller must
//! handle, typically by degrading the affected item to a failure record.

pub mod config;
pub mod error;
pub mod provider;

// Re-export main types for easy access
pub use config::{DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_MODEL, EmbedConfig};
pub use error::{EmbedError, Result};
pub use provider::{EmbeddingProvider, MockEmbeddingProvider, RemoteEmbeddingProvider};
