//! Persistence layer for the vector index and its metadata store.
//!
//! A built index is a directory holding exactly two files:
//!
//! - **`index.bin`** — the [`FlatIndex`] in its binary layout
//! - **`metadata.json`** — an ordered JSON array of [`CodeUnit`]s
//!
//! The two are positionally aligned: `metadata[i]` is the provenance of the
//! index's vector `i`. That correspondence is load-bearing, so the pair is
//! written and replaced only as a whole. A rebuild writes both files into a
//! temporary directory beside the destination and renames it into place, so
//! a reader never observes a half-written index.
//!
//! There is no incremental merge: re-ingesting a repository replaces the
//! artifact pair entirely.

pub mod flat_index;

pub use flat_index::{FlatIndex, SearchHit};

use ramp_ai_chunk::CodeUnit;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the binary vector index inside an index directory.
pub const INDEX_FILE: &str = "index.bin";

/// File name of the serialized metadata store inside an index directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Errors raised while building, writing, or loading index artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// A build produced zero successfully embedded units. An index over zero
    /// vectors is invalid because no dimensionality can be inferred.
    #[error("no units were successfully embedded; refusing to build an empty index")]
    EmptyBuild,

    /// The vector count and metadata count disagree.
    #[error("index and metadata are misaligned: {vectors} vectors vs {units} units")]
    Misaligned { vectors: usize, units: usize },

    /// One or both artifact files are absent.
    #[error("index artifacts not found at {path}")]
    NotFound { path: PathBuf },

    /// The artifacts exist but could not be decoded.
    #[error("index artifacts at {path} are corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads and writes the two-file artifact pair for one index directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether both artifact files are present.
    pub fn exists(&self) -> bool {
        self.dir.join(INDEX_FILE).is_file() && self.dir.join(METADATA_FILE).is_file()
    }

    /// Persist an index and its metadata store, atomically replacing any
    /// prior artifacts at this location.
    ///
    /// Refuses empty indexes ([`ArtifactError::EmptyBuild`]) and misaligned
    /// input ([`ArtifactError::Misaligned`]).
    pub fn write(&self, index: &FlatIndex, units: &[CodeUnit]) -> Result<(), ArtifactError> {
        if index.is_empty() {
            return Err(ArtifactError::EmptyBuild);
        }
        if index.len() != units.len() {
            return Err(ArtifactError::Misaligned {
                vectors: index.len(),
                units: units.len(),
            });
        }

        let parent = match self.dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|source| ArtifactError::Io {
            path: parent.clone(),
            source,
        })?;

        // Stage both files in a temp directory next to the destination so
        // the final rename stays on one filesystem.
        let staging = tempfile::Builder::new()
            .prefix(".ramp-index-")
            .tempdir_in(&parent)
            .map_err(|source| ArtifactError::Io {
                path: parent.clone(),
                source,
            })?;

        let index_path = staging.path().join(INDEX_FILE);
        fs::write(&index_path, index.to_bytes()).map_err(|source| ArtifactError::Io {
            path: index_path,
            source,
        })?;

        let metadata = serde_json::to_vec_pretty(units).map_err(|e| ArtifactError::Corrupt {
            path: self.dir.clone(),
            reason: format!("metadata serialization failed: {e}"),
        })?;
        let metadata_path = staging.path().join(METADATA_FILE);
        fs::write(&metadata_path, metadata).map_err(|source| ArtifactError::Io {
            path: metadata_path,
            source,
        })?;

        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(|source| ArtifactError::Io {
                path: self.dir.clone(),
                source,
            })?;
        }
        let staged = staging.into_path();
        fs::rename(&staged, &self.dir).map_err(|source| ArtifactError::Io {
            path: staged,
            source,
        })?;

        info!(
            "Wrote index of {} vectors (dimension {}) to {}",
            index.len(),
            index.dimension(),
            self.dir.display()
        );
        Ok(())
    }

    /// Load the artifact pair back from disk.
    ///
    /// Absence of either file is [`ArtifactError::NotFound`]; artifacts that
    /// fail to decode, or whose lengths disagree, are
    /// [`ArtifactError::Corrupt`]. Neither condition is ever reported as an
    /// empty result set.
    pub fn load(&self) -> Result<(FlatIndex, Vec<CodeUnit>), ArtifactError> {
        if !self.exists() {
            return Err(ArtifactError::NotFound {
                path: self.dir.clone(),
            });
        }

        let index_path = self.dir.join(INDEX_FILE);
        let index_bytes = fs::read(&index_path).map_err(|source| ArtifactError::Io {
            path: index_path,
            source,
        })?;
        let index = FlatIndex::from_bytes(&index_bytes).map_err(|e| ArtifactError::Corrupt {
            path: self.dir.clone(),
            reason: e.to_string(),
        })?;

        let metadata_path = self.dir.join(METADATA_FILE);
        let metadata_bytes = fs::read(&metadata_path).map_err(|source| ArtifactError::Io {
            path: metadata_path,
            source,
        })?;
        let units: Vec<CodeUnit> =
            serde_json::from_slice(&metadata_bytes).map_err(|e| ArtifactError::Corrupt {
                path: self.dir.clone(),
                reason: e.to_string(),
            })?;

        if index.len() != units.len() {
            return Err(ArtifactError::Corrupt {
                path: self.dir.clone(),
                reason: format!(
                    "index holds {} vectors but metadata holds {} units",
                    index.len(),
                    units.len()
                ),
            });
        }

        Ok((index, units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramp_ai_chunk::UnitKind;
    use tempfile::tempdir;

    fn unit(filename: &str, name: &str) -> CodeUnit {
        CodeUnit {
            id: format!("{filename}:{name}"),
            filename: filename.to_string(),
            name: Some(name.to_string()),
            kind: UnitKind::Function,
            docstring: None,
            code: format!("def {name}():\n    pass"),
            start_line: 1,
            end_line: 2,
        }
    }

    fn sample_artifacts() -> (FlatIndex, Vec<CodeUnit>) {
        let mut index = FlatIndex::new(3);
        index.push(&[1.0, 0.0, 0.0]).unwrap();
        index.push(&[0.0, 1.0, 0.0]).unwrap();
        let units = vec![unit("a.py", "first"), unit("b.py", "second")];
        (index, units)
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempdir().unwrap();
        let store = ArtifactStore::new(temp.path().join("index"));
        let (index, units) = sample_artifacts();

        store.write(&index, &units).unwrap();
        assert!(store.exists());

        let (loaded_index, loaded_units) = store.load().unwrap();
        assert_eq!(loaded_index, index);
        assert_eq!(loaded_units, units);
        // Positional correspondence survives persistence.
        assert_eq!(loaded_units[0].name.as_deref(), Some("first"));
        assert_eq!(loaded_units[1].name.as_deref(), Some("second"));
    }

    #[test]
    fn write_refuses_empty_index() {
        let temp = tempdir().unwrap();
        let store = ArtifactStore::new(temp.path().join("index"));

        let result = store.write(&FlatIndex::new(3), &[]);
        assert!(matches!(result, Err(ArtifactError::EmptyBuild)));
        assert!(!store.exists());
    }

    #[test]
    fn write_refuses_misaligned_input() {
        let temp = tempdir().unwrap();
        let store = ArtifactStore::new(temp.path().join("index"));
        let (index, _) = sample_artifacts();

        let result = store.write(&index, &[unit("a.py", "only")]);
        assert!(matches!(
            result,
            Err(ArtifactError::Misaligned { vectors: 2, units: 1 })
        ));
    }

    #[test]
    fn rebuild_replaces_prior_artifacts() {
        let temp = tempdir().unwrap();
        let store = ArtifactStore::new(temp.path().join("index"));
        let (index, units) = sample_artifacts();
        store.write(&index, &units).unwrap();

        let mut replacement = FlatIndex::new(2);
        replacement.push(&[9.0, 9.0]).unwrap();
        store
            .write(&replacement, &[unit("c.py", "third")])
            .unwrap();

        let (loaded_index, loaded_units) = store.load().unwrap();
        assert_eq!(loaded_index.len(), 1);
        assert_eq!(loaded_index.dimension(), 2);
        assert_eq!(loaded_units[0].filename, "c.py");
    }

    #[test]
    fn load_missing_directory_is_not_found() {
        let temp = tempdir().unwrap();
        let store = ArtifactStore::new(temp.path().join("nope"));
        assert!(matches!(store.load(), Err(ArtifactError::NotFound { .. })));
    }

    #[test]
    fn load_with_missing_metadata_is_not_found() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("index");
        let store = ArtifactStore::new(&dir);
        let (index, units) = sample_artifacts();
        store.write(&index, &units).unwrap();

        fs::remove_file(dir.join(METADATA_FILE)).unwrap();
        assert!(matches!(store.load(), Err(ArtifactError::NotFound { .. })));
    }

    #[test]
    fn load_with_corrupt_index_is_corrupt() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("index");
        let store = ArtifactStore::new(&dir);
        let (index, units) = sample_artifacts();
        store.write(&index, &units).unwrap();

        fs::write(dir.join(INDEX_FILE), b"not an index").unwrap();
        assert!(matches!(store.load(), Err(ArtifactError::Corrupt { .. })));
    }

    #[test]
    fn load_detects_misaligned_artifacts() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("index");
        let store = ArtifactStore::new(&dir);
        let (index, units) = sample_artifacts();
        store.write(&index, &units).unwrap();

        // Drop one unit from the metadata file behind the store's back.
        fs::write(
            dir.join(METADATA_FILE),
            serde_json::to_vec(&units[..1]).unwrap(),
        )
        .unwrap();
        assert!(matches!(store.load(), Err(ArtifactError::Corrupt { .. })));
    }
}
