//! In-process flat vector index with a two-file JSON snapshot: `index.json`
//! (the vectors) and `metadata.json` (string-encoded id -> document). A
//! snapshot only counts as present when both files exist.

use std::{
	collections::BTreeMap,
	fs,
	path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use krishi_domain::Document;

pub const INDEX_FILE: &str = "index.json";
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Serialize, Deserialize)]
struct IndexFile {
	dimensions: usize,
	vectors: Vec<Vec<f32>>,
}

pub struct LocalIndex {
	dir: PathBuf,
	dimensions: usize,
	vectors: Vec<Vec<f32>>,
}

impl LocalIndex {
	pub fn create(dir: &Path, dimensions: usize) -> Self {
		Self { dir: dir.to_path_buf(), dimensions, vectors: Vec::new() }
	}

	/// Load a snapshot. Returns `Ok(None)` when either file is missing (the
	/// caller rebuilds from scratch); corrupt or mismatched files are errors
	/// so the ladder can fall through.
	pub fn load(
		dir: &Path,
		dimensions: usize,
	) -> Result<Option<(Self, BTreeMap<String, Document>)>> {
		let index_path = dir.join(INDEX_FILE);
		let metadata_path = dir.join(METADATA_FILE);

		if !index_path.exists() || !metadata_path.exists() {
			return Ok(None);
		}

		let raw = fs::read_to_string(&index_path)?;
		let file: IndexFile = serde_json::from_str(&raw).map_err(|err| Error::CorruptSnapshot {
			path: index_path.clone(),
			message: err.to_string(),
		})?;

		if file.dimensions != dimensions {
			return Err(Error::CorruptSnapshot {
				path: index_path,
				message: format!(
					"snapshot dimension {} does not match configured dimension {dimensions}",
					file.dimensions
				),
			});
		}
		if let Some(vec) = file.vectors.iter().find(|vec| vec.len() != file.dimensions) {
			return Err(Error::CorruptSnapshot {
				path: index_path,
				message: format!("vector of length {} in {}-dim index", vec.len(), dimensions),
			});
		}

		let raw = fs::read_to_string(&metadata_path)?;
		let snapshot: BTreeMap<String, Document> =
			serde_json::from_str(&raw).map_err(|err| Error::CorruptSnapshot {
				path: metadata_path,
				message: err.to_string(),
			})?;
		let index = Self { dir: dir.to_path_buf(), dimensions, vectors: file.vectors };

		Ok(Some((index, snapshot)))
	}

	pub fn len(&self) -> usize {
		self.vectors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.vectors.is_empty()
	}

	pub fn dimensions(&self) -> usize {
		self.dimensions
	}

	/// Append vectors; positions align with knowledge-store ids as long as
	/// inserts happen in id order, which the service guarantees.
	pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()> {
		for vec in &vectors {
			if vec.len() != self.dimensions {
				return Err(Error::DimensionMismatch {
					expected: self.dimensions,
					got: vec.len(),
				});
			}
		}

		self.vectors.extend(vectors);

		Ok(())
	}

	/// Exact inner-product scan, descending, truncated to `top_k`.
	pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(f32, u64)>> {
		if query.len() != self.dimensions {
			return Err(Error::DimensionMismatch {
				expected: self.dimensions,
				got: query.len(),
			});
		}

		let mut scored: Vec<(f32, u64)> = self
			.vectors
			.iter()
			.enumerate()
			.map(|(id, vec)| {
				let score = vec.iter().zip(query).map(|(a, b)| a * b).sum::<f32>();

				(score, id as u64)
			})
			.collect();

		scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
		scored.truncate(top_k);

		Ok(scored)
	}

	/// Write both snapshot files. Best-effort callers log and swallow the
	/// error; shutdown never depends on this succeeding.
	pub fn save(&self, snapshot: &BTreeMap<String, Document>) -> Result<()> {
		fs::create_dir_all(&self.dir)?;

		let file =
			IndexFile { dimensions: self.dimensions, vectors: self.vectors.clone() };

		fs::write(self.dir.join(INDEX_FILE), serde_json::to_string(&file)?)?;
		fs::write(self.dir.join(METADATA_FILE), serde_json::to_string_pretty(snapshot)?)?;

		Ok(())
	}
}
