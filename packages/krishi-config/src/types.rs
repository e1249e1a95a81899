use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub knowledge: Knowledge,
	pub search: Search,
	pub storage: Storage,
	pub providers: Providers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Knowledge {
	/// Directory of `*.json` fragment files merged into the store at startup.
	pub fragments_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	#[serde(default = "default_top_k")]
	pub top_k: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub index: Index,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Index {
	/// Preferred backend tier: "qdrant", "local", or "text". Failures degrade
	/// down the ladder regardless of preference.
	pub backend: String,
	pub qdrant: Qdrant,
	pub local: LocalIndexConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalIndexConfig {
	/// Snapshot directory holding `index.json` and `metadata.json`.
	pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

fn default_top_k() -> u32 {
	5
}
