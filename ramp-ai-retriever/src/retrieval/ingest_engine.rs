//! High-level ingestion pipeline: walk a repository, extract code units,
//! embed them, and persist a searchable index.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Repository → RepositoryWalker → UnitEmbedder → FlatIndex + metadata
//!                   ↑                  ↑                ↑
//!              ramp-ai-chunk     EmbeddingProvider  ArtifactStore
//! ```
//!
//! Extraction and index construction are synchronous, single-threaded
//! stages; only the embedding phase fans out, with a bounded number of
//! requests in flight. A partially failed run still produces a usable index
//! over whatever subset embedded successfully; only a run with zero
//! successes fails. Every run is a full rebuild that atomically replaces the
//! prior artifacts.

use anyhow::{Context, Result};
use ramp_ai_embed::{DEFAULT_MAX_CONCURRENT_REQUESTS, EmbeddingProvider};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use super::embedder::{EmbedOutcome, EmbeddedUnit, UnitEmbedder};
use super::walker::{RepositoryWalker, WalkerConfig};
use crate::storage::{ArtifactError, ArtifactStore, FlatIndex};

/// Configuration for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Root directory of the repository to ingest
    pub repo_root: PathBuf,
    /// Directory the index artifacts are written to
    pub index_dir: PathBuf,
    /// File extensions eligible for extraction
    pub extensions: Vec<String>,
    /// Maximum concurrent embedding requests
    pub concurrency: usize,
}

impl IngestConfig {
    pub fn new(repo_root: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            index_dir: index_dir.into(),
            extensions: vec!["py".to_string()],
            concurrency: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    /// Set the eligible file extensions (builder style)
    pub fn with_extensions(self, extensions: Vec<String>) -> Self {
        Self { extensions, ..self }
    }

    /// Set the embedding concurrency limit (builder style)
    pub fn with_concurrency(self, concurrency: usize) -> Self {
        Self {
            concurrency,
            ..self
        }
    }
}

/// What one ingestion run did, for reporting to the user.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub files_scanned: usize,
    pub files_failed: usize,
    pub units_extracted: usize,
    pub units_embedded: usize,
    pub units_failed: usize,
    /// Dimension inferred from the first successfully embedded vector.
    pub dimension: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Orchestrates a full ingestion of one repository snapshot.
pub struct IngestEngine {
    config: IngestConfig,
    provider: Arc<dyn EmbeddingProvider>,
}

impl IngestEngine {
    pub fn new(config: IngestConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run the full pipeline and persist the resulting index.
    ///
    /// Fails if the repository yields zero successfully embedded units
    /// ([`ArtifactError::EmptyBuild`]); any smaller degree of failure is
    /// reported in the [`IngestReport`] instead.
    pub async fn run(&self) -> Result<IngestReport> {
        let started = Instant::now();
        info!(
            "Ingesting {} into {}",
            self.config.repo_root.display(),
            self.config.index_dir.display()
        );

        // The walk is synchronous file I/O; keep it off the async executor.
        let walker = RepositoryWalker::new(WalkerConfig::new(self.config.extensions.clone()));
        let root = self.config.repo_root.clone();
        let walk = tokio::task::spawn_blocking(move || walker.collect_units(&root))
            .await
            .context("walk task panicked")??;

        let units_extracted = walk.units.len();
        info!(
            "Scanned {} files ({} failed), extracted {} units",
            walk.files_scanned, walk.files_failed, units_extracted
        );

        let embedder = UnitEmbedder::new(Arc::clone(&self.provider), self.config.concurrency);
        let outcomes = embedder.embed_units(walk.units).await;

        let mut embedded: Vec<EmbeddedUnit> = Vec::with_capacity(outcomes.len());
        let mut units_failed = 0usize;
        for outcome in outcomes {
            match outcome {
                EmbedOutcome::Success(item) => embedded.push(item),
                EmbedOutcome::Failure { .. } => units_failed += 1,
            }
        }

        let Some(first) = embedded.first() else {
            return Err(ArtifactError::EmptyBuild).with_context(|| {
                format!(
                    "ingestion of {} produced no embedded units",
                    self.config.repo_root.display()
                )
            });
        };
        let dimension = first.vector.len();

        let mut index = FlatIndex::new(dimension);
        let mut metadata = Vec::with_capacity(embedded.len());
        for EmbeddedUnit { unit, vector } in embedded {
            // A vector of the wrong width would break positional alignment;
            // drop the unit and count it as a failure instead.
            if vector.len() != dimension {
                tracing::warn!(
                    "Dropping {} > {}: vector dimension {} != {}",
                    unit.filename,
                    unit.name.as_deref().unwrap_or("<anonymous>"),
                    vector.len(),
                    dimension
                );
                units_failed += 1;
                continue;
            }
            index.push(&vector)?;
            metadata.push(unit);
        }

        let units_embedded = metadata.len();
        let store = ArtifactStore::new(&self.config.index_dir);
        store
            .write(&index, &metadata)
            .context("failed to persist index artifacts")?;

        let report = IngestReport {
            files_scanned: walk.files_scanned,
            files_failed: walk.files_failed,
            units_extracted,
            units_embedded,
            units_failed,
            dimension,
            elapsed: started.elapsed(),
        };
        info!(
            "Ingestion complete: {}/{} units embedded into a dimension-{} index in {:.2}s",
            report.units_embedded,
            report.units_extracted,
            report.dimension,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }
}
