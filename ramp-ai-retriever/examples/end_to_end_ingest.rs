//! End-to-end demo: ingest a small fixture repository with the mock
//! embedding provider, then answer a query against the resulting index.
//!
//! Run with: cargo run --example end_to_end_ingest

use ramp_ai_embed::MockEmbeddingProvider;
use ramp_ai_retriever::retrieval::ingest_engine::{IngestConfig, IngestEngine};
use ramp_ai_retriever::retrieval::searcher::Searcher;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let temp = tempfile::tempdir()?;
    let repo = temp.path().join("repo");
    std::fs::create_dir_all(&repo)?;
    std::fs::write(
        repo.join("accounts.py"),
        concat!(
            "def create_account(name):\n",
            "    \"\"\"Register a new account.\"\"\"\n",
            "    return Account(name)\n",
            "\n",
            "class Account:\n",
            "    def __init__(self, name):\n",
            "        self.name = name\n",
        ),
    )?;
    std::fs::write(
        repo.join("billing.py"),
        "def charge(account, amount):\n    return gateway.charge(account, amount)\n",
    )?;

    let index_dir = temp.path().join("index");
    let provider = Arc::new(MockEmbeddingProvider::new(32));

    let config = IngestConfig::new(&repo, &index_dir);
    let report = IngestEngine::new(config, provider.clone()).run().await?;
    println!(
        "Ingested {} units from {} files (dimension {})",
        report.units_embedded, report.files_scanned, report.dimension
    );

    let searcher = Searcher::open(&index_dir, provider)?;
    let matches = searcher.search("how do I create a new account?", 2).await?;
    for m in &matches {
        println!(
            "{:.4}  {}:{}-{}  {} {}",
            m.distance,
            m.unit.filename,
            m.unit.start_line,
            m.unit.end_line,
            m.unit.kind,
            m.unit.name.as_deref().unwrap_or("<anonymous>")
        );
    }

    Ok(())
}
