//! Integration tests covering the full ingest-then-search path.
//!
//! These tests verify that the pipeline works end to end:
//! - Walking a repository and extracting units from Python files
//! - Embedding with bounded concurrency and per-unit failure isolation
//! - Building and atomically persisting the index + metadata pair
//! - Reopening the artifacts and answering queries
//!
//! All embedding goes through the deterministic mock provider, so results
//! are stable across runs without a hosted service.

use anyhow::Result;
use ramp_ai_chunk::UnitKind;
use ramp_ai_embed::MockEmbeddingProvider;
use ramp_ai_retriever::retrieval::ingest_engine::{IngestConfig, IngestEngine};
use ramp_ai_retriever::retrieval::searcher::Searcher;
use ramp_ai_retriever::storage::ArtifactStore;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const DIMENSION: usize = 16;

/// Create a small fixture repository with a mix of files.
fn create_fixture_repo(repo: &Path) -> Result<()> {
    std::fs::create_dir_all(repo.join("pkg"))?;

    std::fs::write(
        repo.join("math_utils.py"),
        concat!(
            "def add(a, b):\n",
            "    \"\"\"Add two numbers.\"\"\"\n",
            "    return a + b\n",
            "\n",
            "def multiply(a, b):\n",
            "    \"\"\"Multiply two numbers.\"\"\"\n",
            "    return a * b\n",
        ),
    )?;

    std::fs::write(
        repo.join("pkg").join("models.py"),
        concat!(
            "class User:\n",
            "    \"\"\"A registered user.\"\"\"\n",
            "\n",
            "    def __init__(self, name):\n",
            "        self.name = name\n",
            "\n",
            "    async def save(self):\n",
            "        await database.store(self)\n",
        ),
    )?;

    // Not Python; must be ignored by the walker.
    std::fs::write(repo.join("README.md"), "# Fixture\n")?;

    // Invalid Python; must be reported and skipped, never fatal.
    std::fs::write(repo.join("broken.py"), "def broken(:\n    pass\n")?;

    Ok(())
}

async fn ingest_fixture(
    repo: &Path,
    index_dir: &Path,
    provider: MockEmbeddingProvider,
) -> Result<ramp_ai_retriever::retrieval::ingest_engine::IngestReport> {
    let config = IngestConfig::new(repo, index_dir).with_concurrency(3);
    IngestEngine::new(config, Arc::new(provider)).run().await
}

#[tokio::test]
async fn ingest_then_search_happy_path() -> Result<()> {
    let temp = tempdir()?;
    let repo = temp.path().join("repo");
    create_fixture_repo(&repo)?;
    let index_dir = temp.path().join("index");

    let report = ingest_fixture(&repo, &index_dir, MockEmbeddingProvider::new(DIMENSION)).await?;

    // math_utils.py: add + multiply; models.py: User + __init__ + save.
    assert_eq!(report.files_scanned, 3);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.units_extracted, 5);
    assert_eq!(report.units_embedded, 5);
    assert_eq!(report.units_failed, 0);
    assert_eq!(report.dimension, DIMENSION);

    // Round-trip: the metadata store aligns with the index positionally.
    let (index, units) = ArtifactStore::new(&index_dir).load()?;
    assert_eq!(index.len(), 5);
    assert_eq!(units.len(), 5);
    assert_eq!(index.dimension(), DIMENSION);

    let kinds: Vec<UnitKind> = units.iter().map(|u| u.kind).collect();
    assert!(kinds.contains(&UnitKind::Function));
    assert!(kinds.contains(&UnitKind::Class));
    assert!(kinds.contains(&UnitKind::AsyncFunction));

    // Exact-text search lands on its own unit at distance zero.
    let searcher = Searcher::open(&index_dir, Arc::new(MockEmbeddingProvider::new(DIMENSION)))?;
    assert_eq!(searcher.len(), 5);

    let add_code = "def add(a, b):\n    \"\"\"Add two numbers.\"\"\"\n    return a + b";
    let matches = searcher.search(add_code, 3).await?;
    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].unit.name.as_deref(), Some("add"));
    assert!(matches[0].distance.abs() < 1e-6);
    assert!(matches[0].distance <= matches[1].distance);
    assert!(matches[1].distance <= matches[2].distance);

    // Requesting more than the corpus holds returns everything, ranked.
    let all = searcher.search("anything", 100).await?;
    assert_eq!(all.len(), 5);

    Ok(())
}

#[tokio::test]
async fn reingesting_the_same_snapshot_is_idempotent() -> Result<()> {
    let temp = tempdir()?;
    let repo = temp.path().join("repo");
    create_fixture_repo(&repo)?;
    let index_dir = temp.path().join("index");

    ingest_fixture(&repo, &index_dir, MockEmbeddingProvider::new(DIMENSION)).await?;
    let searcher = Searcher::open(&index_dir, Arc::new(MockEmbeddingProvider::new(DIMENSION)))?;
    let first: Vec<(String, String)> = searcher
        .search("how do I create a user?", 5)
        .await?
        .into_iter()
        .map(|m| (m.unit.filename, m.unit.name.unwrap_or_default()))
        .collect();

    ingest_fixture(&repo, &index_dir, MockEmbeddingProvider::new(DIMENSION)).await?;
    let searcher = Searcher::open(&index_dir, Arc::new(MockEmbeddingProvider::new(DIMENSION)))?;
    let second: Vec<(String, String)> = searcher
        .search("how do I create a user?", 5)
        .await?
        .into_iter()
        .map(|m| (m.unit.filename, m.unit.name.unwrap_or_default()))
        .collect();

    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn duplicate_code_in_two_files_stays_distinct() -> Result<()> {
    let temp = tempdir()?;
    let repo = temp.path().join("repo");
    std::fs::create_dir_all(&repo)?;
    let code = "def ping():\n    return \"pong\"\n";
    std::fs::write(repo.join("first.py"), code)?;
    std::fs::write(repo.join("second.py"), code)?;
    let index_dir = temp.path().join("index");

    ingest_fixture(&repo, &index_dir, MockEmbeddingProvider::new(DIMENSION)).await?;

    let (index, units) = ArtifactStore::new(&index_dir).load()?;
    assert_eq!(units.len(), 2);
    assert_ne!(units[0].id, units[1].id);
    assert_ne!(units[0].filename, units[1].filename);
    assert_eq!(units[0].code, units[1].code);
    // Identical text embeds identically under a deterministic provider.
    assert_eq!(index.vector(0), index.vector(1));

    let searcher = Searcher::open(&index_dir, Arc::new(MockEmbeddingProvider::new(DIMENSION)))?;
    let matches = searcher.search("def ping(): return pong", 2).await?;
    assert_eq!(matches.len(), 2);
    assert!((matches[0].distance - matches[1].distance).abs() < 1e-6);

    Ok(())
}

#[tokio::test]
async fn embedding_failures_shrink_but_do_not_break_the_index() -> Result<()> {
    let temp = tempdir()?;
    let repo = temp.path().join("repo");
    std::fs::create_dir_all(&repo)?;
    std::fs::write(repo.join("good.py"), "def good():\n    return 1\n")?;
    std::fs::write(repo.join("flaky.py"), "def flaky():\n    rate_limited()\n")?;
    let index_dir = temp.path().join("index");

    let provider = MockEmbeddingProvider::new(DIMENSION).with_failure_on("rate_limited");
    let report = ingest_fixture(&repo, &index_dir, provider).await?;

    assert_eq!(report.units_extracted, 2);
    assert_eq!(report.units_embedded, 1);
    assert_eq!(report.units_failed, 1);

    let (_, units) = ArtifactStore::new(&index_dir).load()?;
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].name.as_deref(), Some("good"));
    Ok(())
}

#[tokio::test]
async fn search_before_ingest_reports_index_unavailable() {
    let temp = tempdir().unwrap();
    let provider = Arc::new(MockEmbeddingProvider::new(DIMENSION));

    let result = Searcher::open(&temp.path().join("never-built"), provider);
    assert!(result.is_err());
    let message = result.err().unwrap().to_string();
    assert!(message.contains("index unavailable"));
}
