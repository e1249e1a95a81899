pub mod add_document;
pub mod cleanup;
pub mod init;
pub mod knowledge;
pub mod search;

use std::{future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use krishi_config::{Config, EmbeddingProviderConfig};
use krishi_domain::{AdvisoryKind, Document, KnowledgeStore};
use krishi_providers::{embedding, stub::StubEmbedder};
use krishi_storage::{local::LocalIndex, qdrant::QdrantStore};

pub use search::SearchHit;

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// External text-to-vector capability. A trait object so tests can substitute
/// doubles for the HTTP provider.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}

impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

/// Errors internal to tier attempts. The four public operations never surface
/// these; the ladder and per-call fallbacks consume them.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error(transparent)]
	Index(#[from] krishi_storage::Error),
	#[error("Knowledge error: {message}")]
	Knowledge { message: String },
}

impl From<color_eyre::Report> for ServiceError {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

/// Active backend tier. One tag per tier so dispatch is a match, never a
/// capability probe.
pub enum IndexBackend {
	Remote(QdrantStore),
	Local(LocalIndex),
	TextOnly,
	KeywordOnly,
}

impl IndexBackend {
	pub fn tier_name(&self) -> &'static str {
		match self {
			Self::Remote(_) => "qdrant",
			Self::Local(_) => "local",
			Self::TextOnly => "text",
			Self::KeywordOnly => "keyword",
		}
	}
}

#[derive(Clone)]
pub(crate) enum Embedder {
	Provider,
	Stub(StubEmbedder),
}

pub(crate) struct ServiceState {
	pub(crate) embedder: Embedder,
	pub(crate) backend: IndexBackend,
	pub(crate) store: KnowledgeStore,
	pub(crate) ready: bool,
}

impl ServiceState {
	fn unready() -> Self {
		Self {
			embedder: Embedder::Stub(StubEmbedder::new(1)),
			backend: IndexBackend::KeywordOnly,
			store: KnowledgeStore::new(),
			ready: false,
		}
	}
}

/// The retrieval core. One instance per process, shared by reference across
/// request handlers; `search` takes the state read lock, `add_document` and
/// the initialize swap take the write lock.
pub struct RetrievalService {
	pub cfg: Config,
	pub(crate) providers: Providers,
	pub(crate) state: RwLock<ServiceState>,
	pub(crate) init_gate: Mutex<()>,
}

impl RetrievalService {
	pub fn new(cfg: Config) -> Self {
		Self::with_providers(cfg, Providers::default())
	}

	pub fn with_providers(cfg: Config, providers: Providers) -> Self {
		Self { cfg, providers, state: RwLock::new(ServiceState::unready()), init_gate: Mutex::new(()) }
	}

	pub async fn is_ready(&self) -> bool {
		self.state.read().await.ready
	}

	pub async fn active_tier(&self) -> &'static str {
		self.state.read().await.backend.tier_name()
	}

	pub async fn document_count(&self) -> usize {
		self.state.read().await.store.len()
	}

	pub(crate) async fn ensure_initialized(&self) {
		if !self.is_ready().await {
			self.initialize().await;
		}
	}

	pub(crate) async fn embed_batch(
		&self,
		embedder: &Embedder,
		texts: &[String],
	) -> ServiceResult<Vec<Vec<f32>>> {
		let dim = self.cfg.providers.embedding.dimensions as usize;

		match embedder {
			Embedder::Provider => {
				let vecs =
					self.providers.embedding.embed(&self.cfg.providers.embedding, texts).await?;

				if vecs.len() != texts.len() {
					return Err(ServiceError::Provider {
						message: "Embedding provider returned mismatched vector count.".to_string(),
					});
				}
				if vecs.iter().any(|vec| vec.len() != dim) {
					return Err(ServiceError::Provider {
						message: "Embedding vector dimension mismatch.".to_string(),
					});
				}

				Ok(vecs)
			},
			Embedder::Stub(stub) => Ok(stub.embed(texts)),
		}
	}

	pub(crate) async fn embed_one(
		&self,
		embedder: &Embedder,
		text: &str,
	) -> ServiceResult<Vec<f32>> {
		let vecs = self.embed_batch(embedder, std::slice::from_ref(&text.to_string())).await?;

		vecs.into_iter().next().ok_or_else(|| ServiceError::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})
	}
}

/// Payload of a scored result: a resolved document for the real tiers, a
/// fixed advisory string for the keyword tier.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HitContent {
	Document(Document),
	Advisory(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitSource {
	VectorSearch,
	TextSearch,
	CropInfo,
	DiseaseInfo,
	FertilizerInfo,
}

impl From<AdvisoryKind> for HitSource {
	fn from(kind: AdvisoryKind) -> Self {
		match kind {
			AdvisoryKind::CropInfo => Self::CropInfo,
			AdvisoryKind::DiseaseInfo => Self::DiseaseInfo,
			AdvisoryKind::FertilizerInfo => Self::FertilizerInfo,
		}
	}
}
