//! Query-time loading and searching of a persisted index.
//!
//! A [`Searcher`] reopens the artifact pair written at ingest time, embeds
//! each query with the same provider family used for the corpus, and maps
//! nearest-neighbor positions back to code units. Error conditions are
//! deliberately loud: a missing or corrupt index is
//! [`SearchError::IndexUnavailable`], never an empty result list.

use ramp_ai_chunk::CodeUnit;
use ramp_ai_embed::{EmbedError, EmbeddingProvider};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::storage::{ArtifactStore, FlatIndex};

/// Default number of results returned when the caller does not specify k.
pub const DEFAULT_TOP_K: usize = 5;

/// Errors raised by one search request. None of them affect the persisted
/// index.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The artifact pair is absent or corrupt at the given location.
    #[error("index unavailable at {path}: {reason}")]
    IndexUnavailable { path: PathBuf, reason: String },

    /// The query text could not be embedded; fatal to this request only.
    #[error("failed to embed query: {source}")]
    QueryEmbedding {
        #[source]
        source: EmbedError,
    },

    /// The query embedding does not match the index dimension, which means
    /// the provider and the index were built with different models.
    #[error("query embedding has dimension {query} but the index expects {index}")]
    DimensionMismatch { index: usize, query: usize },

    /// No search position resolved to a metadata record. Distinct from an
    /// error and from an empty repository, which cannot produce an index.
    #[error("no indexed units matched the query")]
    NoMatches,
}

/// One ranked search result: a code unit and its squared L2 distance from
/// the query embedding (smaller is closer).
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub unit: CodeUnit,
    pub distance: f32,
}

/// An opened index ready to answer queries.
pub struct Searcher {
    index: FlatIndex,
    units: Vec<CodeUnit>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl Searcher {
    /// Load the index and metadata store from `index_dir`.
    pub fn open(
        index_dir: &Path,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, SearchError> {
        let store = ArtifactStore::new(index_dir);
        let (index, units) = store.load().map_err(|e| SearchError::IndexUnavailable {
            path: index_dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!(
            "Opened index at {}: {} vectors of dimension {}",
            index_dir.display(),
            index.len(),
            index.dimension()
        );
        Ok(Self {
            index,
            units,
            provider,
        })
    }

    /// Number of indexed units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Embed `query` and return up to `k` units, nearest first.
    ///
    /// Asking for more results than the index holds returns everything,
    /// ranked. Vector search has no similarity cutoff: an unrelated query
    /// still returns the k nearest units by distance.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchMatch>, SearchError> {
        let query_vector = self
            .provider
            .embed_text(query)
            .await
            .map_err(|source| SearchError::QueryEmbedding { source })?;

        let hits = self
            .index
            .search(&query_vector, k)
            .map_err(|_| SearchError::DimensionMismatch {
                index: self.index.dimension(),
                query: query_vector.len(),
            })?;

        let mut matches = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.units.get(hit.position) {
                Some(unit) => matches.push(SearchMatch {
                    unit: unit.clone(),
                    distance: hit.distance,
                }),
                // Should not happen under the alignment invariant, but an
                // out-of-range position must not crash a search.
                None => warn!(
                    "Search position {} is beyond the metadata store ({} units); skipping",
                    hit.position,
                    self.units.len()
                ),
            }
        }

        if matches.is_empty() {
            return Err(SearchError::NoMatches);
        }
        Ok(matches)
    }
}
