//! Exact nearest-neighbor index over a flat collection of f32 vectors.
//!
//! The index is deliberately simple: all vectors share one dimension, live
//! contiguously in memory in insertion order, and every search is an exact
//! scan ranked by squared L2 distance. Positions returned by
//! [`FlatIndex::search`] are insertion positions, which the metadata store
//! relies on for provenance lookup.
//!
//! ## Binary layout
//!
//! ```text
//! magic      8 bytes   "RAMPIDX\0"
//! version    u32 LE    format version (currently 1)
//! dimension  u32 LE    vector dimension, > 0
//! count      u64 LE    number of vectors
//! payload    count * dimension * 4 bytes of little-endian f32
//! ```

use anyhow::{Result, bail};
use itertools::Itertools;
use std::cmp::Ordering;

const MAGIC: &[u8; 8] = b"RAMPIDX\0";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 24;

/// One search result: the vector's insertion position and its squared L2
/// distance from the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub position: usize,
    pub distance: f32,
}

/// A flat, exact L2 vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vectors stored in the index.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.vectors.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append a vector. Vectors must all match the index dimension.
    pub fn push(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            bail!(
                "vector dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            );
        }
        self.vectors.extend_from_slice(vector);
        Ok(())
    }

    /// The vector stored at `position`, if any.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.vectors.get(start..start + self.dimension)
    }

    /// Exact top-k search by squared L2 distance, nearest first.
    ///
    /// Asking for more results than the index holds returns everything,
    /// ranked. Ties break by ascending position so repeated searches over
    /// the same index are stable.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            bail!(
                "query dimension mismatch: expected {}, got {}",
                self.dimension,
                query.len()
            );
        }

        let hits = (0..self.len())
            .map(|position| SearchHit {
                position,
                distance: self.squared_l2(position, query),
            })
            .k_smallest_by(k, |a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(Ordering::Equal)
                    .then(a.position.cmp(&b.position))
            })
            .collect();
        Ok(hits)
    }

    fn squared_l2(&self, position: usize, query: &[f32]) -> f32 {
        let start = position * self.dimension;
        let row = &self.vectors[start..start + self.dimension];
        row.iter()
            .zip(query)
            .map(|(a, b)| {
                let d = a - b;
                d * d
            })
            .sum()
    }

    /// Serialize the index into the on-disk binary layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.vectors.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        bytes.extend_from_slice(bytemuck::cast_slice(&self.vectors));
        bytes
    }

    /// Deserialize an index from the on-disk binary layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            bail!("index file too short: {} bytes", bytes.len());
        }
        if &bytes[..8] != MAGIC {
            bail!("bad index file magic");
        }

        let version = u32::from_le_bytes(bytes[8..12].try_into()?);
        if version != FORMAT_VERSION {
            bail!("unsupported index format version {version}");
        }

        let dimension = u32::from_le_bytes(bytes[12..16].try_into()?) as usize;
        if dimension == 0 {
            bail!("index dimension must be non-zero");
        }
        let count = u64::from_le_bytes(bytes[16..24].try_into()?) as usize;

        let payload = &bytes[HEADER_LEN..];
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| anyhow::anyhow!("index header overflows"))?;
        if payload.len() != expected {
            bail!(
                "index payload length {} does not match header ({count} x {dimension} vectors)",
                payload.len()
            );
        }

        // The byte buffer carries no alignment guarantee, so copy instead of
        // casting in place.
        let vectors = bytemuck::pod_collect_to_vec::<u8, f32>(payload);
        Ok(Self { dimension, vectors })
    }
}
