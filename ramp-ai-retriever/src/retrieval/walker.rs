//! Repository traversal: walks a directory tree and extracts code units
//! from every eligible source file.

use anyhow::{Result, bail};
use ignore::WalkBuilder;
use ramp_ai_chunk::{CodeUnit, extract_units};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Configuration for walking a repository
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// File extensions eligible for extraction
    pub extensions: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["py".to_string()],
        }
    }
}

impl WalkerConfig {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }
}

/// Aggregate result of one walk over a repository.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// All extracted units, in walk order; within a file the extractor's
    /// discovery order is preserved.
    pub units: Vec<CodeUnit>,
    /// Number of eligible files visited.
    pub files_scanned: usize,
    /// Files skipped because they could not be read or parsed.
    pub files_failed: usize,
}

/// Walks a directory tree and runs unit extraction on every eligible file.
///
/// The walk is gitignore-aware and sorted by file name, so two walks over
/// the same snapshot yield the same unit order. Unreadable or unparsable
/// files are reported and skipped; they never abort the walk.
#[derive(Debug, Clone)]
pub struct RepositoryWalker {
    config: WalkerConfig,
}

impl RepositoryWalker {
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    /// Check if a file should be indexed based on its extension.
    pub fn should_index_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.config.extensions.iter().any(|allowed| allowed == ext))
    }

    /// Walk `root` and collect every unit from every eligible file.
    pub fn collect_units(&self, root: &Path) -> Result<WalkOutcome> {
        if !root.is_dir() {
            bail!("repository root {} is not a directory", root.display());
        }

        let mut outcome = WalkOutcome::default();
        let walker = WalkBuilder::new(root)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walk error under {}: {}", root.display(), e);
                    outcome.files_failed += 1;
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if !self.should_index_file(path) {
                continue;
            }
            outcome.files_scanned += 1;

            let display_path = path.strip_prefix(root).unwrap_or(path);
            let source = match fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", display_path.display(), e);
                    outcome.files_failed += 1;
                    continue;
                }
            };

            match extract_units(&source, &display_path.to_string_lossy()) {
                Ok(units) => {
                    debug!(
                        "Extracted {} units from {}",
                        units.len(),
                        display_path.display()
                    );
                    outcome.units.extend(units);
                }
                Err(e) => {
                    warn!("{e}");
                    outcome.files_failed += 1;
                }
            }
        }

        debug!(
            "Walk of {} finished: {} files scanned, {} failed, {} units",
            root.display(),
            outcome.files_scanned,
            outcome.files_failed,
            outcome.units.len()
        );
        Ok(outcome)
    }
}
