#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	Qdrant(#[from] qdrant_client::QdrantError),
	#[error("Qdrant URL is not configured.")]
	QdrantUnconfigured,
	#[error("Vector dimension {got} does not match index dimension {expected}.")]
	DimensionMismatch { expected: usize, got: usize },
	#[error("Local index snapshot at {path:?} is corrupt: {message}")]
	CorruptSnapshot { path: std::path::PathBuf, message: String },
}
