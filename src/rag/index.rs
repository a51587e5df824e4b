//! Persisted section index: a flat inner-product vector index plus the
//! position-aligned metadata store.
//!
//! Index file layout (little-endian):
//! `b"SVIX"` | `u32` dimension | `u64` count | `count * dimension` `f32`.
//!
//! Metadata file: JSON array; element `i` is the text of row `i`, either a
//! bare string or an object with a `"text"` field.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::error::RagError;
use super::types::Section;
use crate::vector_math::l2_normalize_rows;

const INDEX_MAGIC: &[u8; 4] = b"SVIX";
const INDEX_HEADER_LEN: u64 = 16;

/// A scored hit from a nearest-neighbor search.
///
/// `position` is signed because ANN backends pad short result lists with -1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: i64,
    pub score: f32,
}

/// Nearest-neighbor lookup over section embeddings.
///
/// Implementations return at most `k` neighbors ordered by descending score,
/// where score is cosine similarity (higher = closer).
pub trait VectorIndex: Send + Sync {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, RagError>;
}

/// Exhaustive inner-product index over unit-length rows.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    vectors: Array2<f32>,
}

impl FlatIndex {
    /// Builds an index from row vectors. Rows are normalized to unit length.
    pub fn from_vectors(rows: &[Vec<f32>]) -> Result<Self, RagError> {
        let dimension = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != dimension) {
            return Err(RagError::MalformedIndex(
                "rows have differing dimensions".to_string(),
            ));
        }

        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Self::from_flat(dimension, rows.len(), flat)
    }

    fn from_flat(dimension: usize, count: usize, flat: Vec<f32>) -> Result<Self, RagError> {
        if let Some(position) = flat.iter().position(|value| !value.is_finite()) {
            return Err(RagError::MalformedIndex(format!(
                "non-finite value in row {}",
                position / dimension.max(1)
            )));
        }
        let mut vectors = Array2::from_shape_vec((count, dimension), flat)
            .map_err(|err| RagError::MalformedIndex(err.to_string()))?;
        l2_normalize_rows(&mut vectors);
        Ok(Self { vectors })
    }

    pub fn load(path: &Path) -> Result<Self, RagError> {
        let io_err = |source| RagError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        let file_len = file.metadata().map_err(io_err)?.len();
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(io_err)?;
        if &magic != INDEX_MAGIC {
            return Err(RagError::MalformedIndex(format!(
                "{} is not a section index (bad magic)",
                path.display()
            )));
        }

        let mut dim_bytes = [0u8; 4];
        reader.read_exact(&mut dim_bytes).map_err(io_err)?;
        let dimension = u32::from_le_bytes(dim_bytes) as usize;

        let mut count_bytes = [0u8; 8];
        reader.read_exact(&mut count_bytes).map_err(io_err)?;
        let count = u64::from_le_bytes(count_bytes) as usize;

        let expected_bytes = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| RagError::MalformedIndex("index header overflows".to_string()))?;

        let available = file_len.saturating_sub(INDEX_HEADER_LEN);
        if expected_bytes as u64 != available {
            return Err(RagError::MalformedIndex(format!(
                "expected {} bytes of vectors for {} x {}, file has {}",
                expected_bytes, count, dimension, available
            )));
        }

        let mut payload = Vec::with_capacity(expected_bytes);
        reader.read_to_end(&mut payload).map_err(io_err)?;
        if payload.len() != expected_bytes {
            return Err(RagError::MalformedIndex(format!(
                "expected {} bytes of vectors for {} x {}, found {}",
                expected_bytes,
                count,
                dimension,
                payload.len()
            )));
        }

        let flat = payload
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Self::from_flat(dimension, count, flat)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), RagError> {
        let io_err = |source| RagError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
        writer.write_all(INDEX_MAGIC).map_err(io_err)?;
        writer
            .write_all(&(self.dimension() as u32).to_le_bytes())
            .map_err(io_err)?;
        writer
            .write_all(&(self.len() as u64).to_le_bytes())
            .map_err(io_err)?;
        for value in self.vectors.iter() {
            writer.write_all(&value.to_le_bytes()).map_err(io_err)?;
        }
        writer.flush().map_err(io_err)
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    fn len(&self) -> usize {
        self.vectors.nrows()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, RagError> {
        if query.len() != self.dimension() {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let scores = self.vectors.dot(&ArrayView1::from(query));
        let mut ranked: Vec<(usize, f32)> = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, score)| !score.is_nan())
            .collect();
        // Stable, so ties keep row order.
        ranked.sort_by(|left, right| right.1.total_cmp(&left.1));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .map(|(position, score)| Neighbor {
                position: position as i64,
                score,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
enum MetaEntry {
    Text(String),
    Record { text: String },
}

/// Section texts, addressed by index row.
#[derive(Debug, Clone, Default)]
pub struct SectionStore {
    sections: Vec<Section>,
}

impl SectionStore {
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sections = texts
            .into_iter()
            .enumerate()
            .map(|(id, text)| Section {
                id,
                text: text.into(),
            })
            .collect();
        Self { sections }
    }

    pub fn load(path: &Path) -> Result<Self, RagError> {
        let contents = fs::read_to_string(path).map_err(|source| RagError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<MetaEntry> = serde_json::from_str(&contents).map_err(|err| {
            RagError::MalformedMetadata(format!("{}: {}", path.display(), err))
        })?;

        Ok(Self::from_texts(entries.into_iter().map(|entry| match entry {
            MetaEntry::Text(text) | MetaEntry::Record { text } => text,
        })))
    }

    pub fn write_to(&self, path: &Path) -> Result<(), RagError> {
        let io_err = |source| RagError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let texts: Vec<&str> = self.sections.iter().map(|s| s.text.as_str()).collect();
        let json = serde_json::to_string_pretty(&texts)
            .map_err(|err| RagError::MalformedMetadata(err.to_string()))?;
        fs::write(path, json).map_err(io_err)
    }

    /// Looks up a raw index position; negative or out-of-range yields `None`.
    pub fn get(&self, position: i64) -> Option<&Section> {
        usize::try_from(position)
            .ok()
            .and_then(|idx| self.sections.get(idx))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Loads the index/metadata pair written by the offline indexer.
///
/// A row-count mismatch is logged but tolerated; retrieval skips positions
/// that have no metadata row.
pub fn load_section_index(
    index_path: &Path,
    meta_path: &Path,
) -> Result<(FlatIndex, SectionStore), RagError> {
    for path in [index_path, meta_path] {
        if !path.exists() {
            return Err(RagError::MissingFile(path.to_path_buf()));
        }
    }

    tracing::info!("Loading vector index from {}", index_path.display());
    let index = FlatIndex::load(index_path)?;
    tracing::info!("Loading section metadata from {}", meta_path.display());
    let sections = SectionStore::load(meta_path)?;

    if index.len() != sections.len() {
        tracing::warn!(
            "Index has {} vectors but metadata has {} sections; unmatched rows will be skipped",
            index.len(),
            sections.len()
        );
    }
    tracing::info!(
        "Loaded {} sections ({}-dimensional vectors)",
        sections.len(),
        index.dimension()
    );

    Ok((index, sections))
}
