use clap::{Parser, Subcommand};
use itertools::Itertools;
use ramp_ai_embed::{EmbedConfig, RemoteEmbeddingProvider};
use ramp_ai_retriever::retrieval::ingest_engine::{IngestConfig, IngestEngine};
use ramp_ai_retriever::retrieval::searcher::{DEFAULT_TOP_K, SearchError, SearchMatch, Searcher};
use ramp_ai_retriever::storage::ArtifactStore;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

/// A CLI tool to index a source repository and retrieve the code most
/// relevant to a developer question.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the persisted index artifacts
    #[arg(short, long, default_value = ".ramp-index")]
    index_dir: PathBuf,

    /// Embedding model name
    #[arg(long, default_value = ramp_ai_embed::DEFAULT_MODEL)]
    model: String,

    /// Base URL of the embedding API (defaults to the OpenAI endpoint)
    #[arg(long)]
    api_base: Option<String>,

    /// Per-request timeout for embedding calls, in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a repository: extract, embed, and index its code units
    Ingest {
        /// Root directory of the repository to ingest
        repo: PathBuf,
        /// File extensions to extract units from
        #[arg(long, value_delimiter = ',', default_value = "py")]
        extensions: Vec<String>,
        /// Maximum concurrent embedding requests
        #[arg(short, long, default_value_t = 5)]
        concurrency: usize,
    },
    /// Search the index for code relevant to a question
    Search {
        /// Free-text question about the codebase
        query: String,
        /// Number of results to return
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show statistics about the persisted index
    Stats,
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Full,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "full" => Ok(OutputFormat::Full),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn build_provider(args: &Args) -> anyhow::Result<Arc<RemoteEmbeddingProvider>> {
    let mut config = EmbedConfig::new(&args.model)
        .with_request_timeout(Duration::from_secs(args.timeout_secs));
    if let Some(base) = &args.api_base {
        config = config.with_api_base(base);
    }
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) => config = config.with_api_key(key),
        Err(_) => tracing::warn!("OPENAI_API_KEY is not set; requests may be rejected"),
    }
    Ok(Arc::new(RemoteEmbeddingProvider::new(config)?))
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    match &args.command {
        Commands::Ingest {
            repo,
            extensions,
            concurrency,
        } => {
            let provider = build_provider(&args)?;
            let config = IngestConfig::new(repo, &args.index_dir)
                .with_extensions(extensions.clone())
                .with_concurrency(*concurrency);
            let report = IngestEngine::new(config, provider).run().await?;

            println!("Ingestion complete:");
            println!("  Files scanned: {}", report.files_scanned);
            println!("  Files failed: {}", report.files_failed);
            println!("  Units extracted: {}", report.units_extracted);
            println!("  Units embedded: {}", report.units_embedded);
            println!("  Units failed: {}", report.units_failed);
            println!("  Vector dimension: {}", report.dimension);
            println!("  Elapsed: {:.2}s", report.elapsed.as_secs_f64());
            Ok(())
        }
        Commands::Search {
            query,
            top_k,
            format,
        } => {
            let provider = build_provider(&args)?;
            let searcher = Searcher::open(&args.index_dir, provider)?;

            match searcher.search(query, *top_k).await {
                Ok(matches) => {
                    print_matches(&matches, format)?;
                    Ok(())
                }
                Err(SearchError::NoMatches) => {
                    println!("No relevant results found.");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Stats => {
            let (index, units) = ArtifactStore::new(&args.index_dir).load()?;

            println!("Index statistics:");
            println!("  Indexed units: {}", index.len());
            println!("  Vector dimension: {}", index.dimension());

            let by_kind = units.iter().counts_by(|u| u.kind);
            for (kind, count) in by_kind.iter().sorted_by_key(|(kind, _)| kind.as_str()) {
                println!("  {kind}: {count}");
            }

            let files: Vec<&str> = units
                .iter()
                .map(|u| u.filename.as_str())
                .unique()
                .collect();
            println!("  Unique files: {}", files.len());
            for file in files.iter().take(10) {
                println!("    {file}");
            }
            if files.len() > 10 {
                println!("    ... and {} more", files.len() - 10);
            }
            Ok(())
        }
    }
}

fn print_matches(matches: &[SearchMatch], format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(matches)?);
        }
        OutputFormat::Summary => {
            println!("Found {} relevant units:", matches.len());
            for m in matches {
                println!(
                    "  {:.4} | {}:{}-{} | {} {}",
                    m.distance,
                    m.unit.filename,
                    m.unit.start_line,
                    m.unit.end_line,
                    m.unit.kind,
                    m.unit.name.as_deref().unwrap_or("<anonymous>")
                );
            }
        }
        OutputFormat::Full => {
            for m in matches {
                println!(
                    "{} {} ({}:{}-{}, distance {:.4})",
                    m.unit.kind,
                    m.unit.name.as_deref().unwrap_or("<anonymous>"),
                    m.unit.filename,
                    m.unit.start_line,
                    m.unit.end_line,
                    m.distance
                );
                if let Some(doc) = &m.unit.docstring {
                    println!("  {}", doc.lines().join("\n  "));
                }
                println!("{}", m.unit.code);
                println!("---");
            }
        }
    }
    Ok(())
}
