mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Index, Knowledge, LocalIndexConfig, Providers, Qdrant, Search,
	Service, Storage,
};

use std::{fs, path::Path};

pub const BACKEND_QDRANT: &str = "qdrant";
pub const BACKEND_LOCAL: &str = "local";
pub const BACKEND_TEXT: &str = "text";

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if !matches!(cfg.storage.index.backend.as_str(), BACKEND_QDRANT | BACKEND_LOCAL | BACKEND_TEXT)
	{
		return Err(Error::Validation {
			message: "storage.index.backend must be one of qdrant, local, or text.".to_string(),
		});
	}
	if cfg.search.top_k == 0 {
		return Err(Error::Validation {
			message: "search.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.index.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.index.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.storage.index.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.index.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.storage.index.local.dir.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.index.local.dir must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	// An all-whitespace key reads as unconfigured, which skips the remote
	// embedding provider and the managed index tier.
	if cfg.providers.embedding.api_key.trim().is_empty() {
		cfg.providers.embedding.api_key = String::new();
	}
	if cfg.storage.index.qdrant.url.trim().is_empty() {
		cfg.storage.index.qdrant.url = String::new();
	}
}
