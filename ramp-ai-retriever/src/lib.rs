//! ramp-ai-retriever: semantic code retrieval for codebase onboarding
//!
//! This crate ingests a source repository, splits it into code units,
//! embeds each unit through a hosted embedding service, and answers
//! free-text questions by nearest-neighbor search over the resulting
//! vector index.
//!
//! ## Key Modules
//!
//! - **[`retrieval`]**: repository walking, bounded-concurrency embedding,
//!   the ingest pipeline, and the query-time searcher
//! - **[`storage`]**: the flat L2 index and the two-file artifact store
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ramp_ai_retriever::retrieval::ingest_engine::{IngestConfig, IngestEngine};
//! use ramp_ai_embed::{EmbedConfig, RemoteEmbeddingProvider};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = Arc::new(RemoteEmbeddingProvider::new(
//!     EmbedConfig::new("text-embedding-3-small").with_api_key("sk-..."),
//! )?);
//! let config = IngestConfig::new("path/to/repo", ".ramp-index");
//! let report = IngestEngine::new(config, provider).run().await?;
//! println!("embedded {} units", report.units_embedded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Repository → Walker → Unit Extractor → Embedder (bounded pool)
//!                                             ↓
//!            Searcher ← ArtifactStore ← FlatIndex + metadata
//! ```

pub mod retrieval;
pub mod storage;
