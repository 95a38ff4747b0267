//! Bounded-concurrency embedding of code units.
//!
//! The embedding phase is the only concurrent stage of the pipeline. A
//! fixed-size pool of in-flight requests keeps the hosted service within
//! its rate limits while hiding network latency; each unit's result is a
//! tagged success/failure variant, and no failure ever escapes the pool.

use futures::stream::{self, StreamExt};
use ramp_ai_chunk::CodeUnit;
use ramp_ai_embed::EmbeddingProvider;
use std::sync::Arc;
use tracing::{debug, warn};

/// A code unit paired with its embedding vector.
#[derive(Debug, Clone)]
pub struct EmbeddedUnit {
    pub unit: CodeUnit,
    pub vector: Vec<f32>,
}

/// Per-unit embedding result. Failures carry the unit and an error
/// description so callers can log and drop them without losing provenance.
#[derive(Debug, Clone)]
pub enum EmbedOutcome {
    Success(EmbeddedUnit),
    Failure { unit: CodeUnit, error: String },
}

impl EmbedOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EmbedOutcome::Success(_))
    }

    /// The unit this outcome belongs to, success or failure.
    pub fn unit(&self) -> &CodeUnit {
        match self {
            EmbedOutcome::Success(embedded) => &embedded.unit,
            EmbedOutcome::Failure { unit, .. } => unit,
        }
    }
}

/// Embeds code units through an [`EmbeddingProvider`] with a bounded number
/// of requests in flight.
pub struct UnitEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    concurrency: usize,
}

impl UnitEmbedder {
    /// Create an embedder with the given in-flight request limit (clamped
    /// to at least 1).
    pub fn new(provider: Arc<dyn EmbeddingProvider>, concurrency: usize) -> Self {
        Self {
            provider,
            concurrency: concurrency.max(1),
        }
    }

    /// Embed one unit. Never returns an error: any provider failure
    /// degrades to [`EmbedOutcome::Failure`] for this unit alone.
    pub async fn embed_unit(&self, unit: CodeUnit) -> EmbedOutcome {
        let label = unit.name.as_deref().unwrap_or("<anonymous>");
        match self.provider.embed_text(&unit.code).await {
            Ok(vector) => {
                debug!("Embedded {} > {}", unit.filename, label);
                EmbedOutcome::Success(EmbeddedUnit { unit, vector })
            }
            Err(e) => {
                warn!("Failed to embed {} > {}: {}", unit.filename, label, e);
                EmbedOutcome::Failure {
                    unit,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Embed a batch of units with bounded fan-out.
    ///
    /// Requests complete in arbitrary order; each result is tagged with its
    /// submission index and the batch is restored to submission order before
    /// returning, so downstream index insertion stays deterministic.
    pub async fn embed_units(&self, units: Vec<CodeUnit>) -> Vec<EmbedOutcome> {
        let total = units.len();
        debug!(
            "Embedding {} units with up to {} concurrent requests",
            total, self.concurrency
        );

        let mut tagged: Vec<(usize, EmbedOutcome)> = stream::iter(units.into_iter().enumerate())
            .map(|(idx, unit)| async move { (idx, self.embed_unit(unit).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        tagged.sort_by_key(|(idx, _)| *idx);

        let failures = tagged.iter().filter(|(_, o)| !o.is_success()).count();
        debug!("Embedded {}/{} units ({} failed)", total - failures, total, failures);

        tagged.into_iter().map(|(_, outcome)| outcome).collect()
    }
}
