//! Startup ladder: probe the embedder, then stand up the best available
//! backend tier, then load the knowledge store. Initialization always ends in
//! a usable state; the worst outcome is the keyword-advisory tier.

use tracing::{error, info, warn};

use crate::{
	Embedder, IndexBackend, RetrievalService, ServiceError, ServiceResult, ServiceState,
	knowledge::load_knowledge,
};
use krishi_config::{BACKEND_LOCAL, BACKEND_QDRANT};
use krishi_domain::{KnowledgeStore, baseline};
use krishi_providers::stub::StubEmbedder;
use krishi_storage::{local::LocalIndex, qdrant::QdrantStore};

const PROBE_TEXT: &str = "wheat planting season";

impl RetrievalService {
	/// Bring the service to a ready state. Never raises; a second call redoes
	/// the work, and a concurrent call blocks on the gate until the first one
	/// finishes rather than racing the rebuild.
	pub async fn initialize(&self) {
		let _gate = self.init_gate.lock().await;

		info!("Initializing retrieval service.");

		let state = match self.try_build_state().await {
			Ok(state) => state,
			Err(err) => {
				error!(error = %err, "Initialization failed; entering keyword-advisory tier.");

				last_resort_state(self.cfg.providers.embedding.dimensions as usize)
			},
		};

		info!(tier = state.backend.tier_name(), documents = state.store.len(), "Retrieval service ready.");

		*self.state.write().await = state;
	}

	async fn try_build_state(&self) -> ServiceResult<ServiceState> {
		let embedder = self.probe_embedder().await;
		let (backend, adopted) = self.build_backend(&embedder).await?;
		let store = match adopted {
			Some(store) => store,
			None => load_knowledge(&self.cfg.knowledge)?,
		};

		Ok(ServiceState { embedder, backend, store, ready: true })
	}

	/// Probe the configured embedding provider with a one-string batch; on any
	/// failure substitute the deterministic stub so downstream code keeps a
	/// uniform interface.
	async fn probe_embedder(&self) -> Embedder {
		let probe = [PROBE_TEXT.to_string()];

		match self.embed_batch(&Embedder::Provider, &probe).await {
			Ok(_) => Embedder::Provider,
			Err(err) => {
				error!(error = %err, "Embedding provider unavailable; using stub embedder.");

				Embedder::Stub(StubEmbedder::new(
					self.cfg.providers.embedding.dimensions as usize,
				))
			},
		}
	}

	/// Try backend strategies in preference order and take the first success.
	/// The text tier terminates every ladder and cannot fail.
	async fn build_backend(
		&self,
		embedder: &Embedder,
	) -> ServiceResult<(IndexBackend, Option<KnowledgeStore>)> {
		let ladder: &[&str] = match self.cfg.storage.index.backend.as_str() {
			BACKEND_QDRANT => &[BACKEND_QDRANT, BACKEND_LOCAL],
			BACKEND_LOCAL => &[BACKEND_LOCAL],
			_ => &[],
		};

		for &tier in ladder {
			let attempt = match tier {
				BACKEND_QDRANT => self.try_remote().await,
				_ => self.try_local(embedder).await,
			};

			match attempt {
				Ok(built) => return Ok(built),
				Err(err) => {
					warn!(tier, error = %err, "Backend tier failed; falling through.");
				},
			}
		}

		Ok((IndexBackend::TextOnly, None))
	}

	async fn try_remote(&self) -> ServiceResult<(IndexBackend, Option<KnowledgeStore>)> {
		let store = QdrantStore::connect(&self.cfg.storage.index.qdrant).await?;

		info!(collection = %store.collection, "Connected to managed vector index.");

		Ok((IndexBackend::Remote(store), None))
	}

	/// Load the on-disk snapshot when both files are present, adopting its
	/// metadata as the knowledge store; otherwise rebuild the index from the
	/// knowledge set in full.
	async fn try_local(
		&self,
		embedder: &Embedder,
	) -> ServiceResult<(IndexBackend, Option<KnowledgeStore>)> {
		let dir = std::path::Path::new(&self.cfg.storage.index.local.dir);
		let dimensions = self.cfg.providers.embedding.dimensions as usize;

		if let Some((index, snapshot)) = LocalIndex::load(dir, dimensions)? {
			let store = KnowledgeStore::from_snapshot(snapshot);

			info!(vectors = index.len(), documents = store.len(), "Loaded local index snapshot.");

			return Ok((IndexBackend::Local(index), Some(store)));
		}

		let store = load_knowledge(&self.cfg.knowledge)?;
		let mut index = LocalIndex::create(dir, dimensions);
		let texts: Vec<String> = store.iter().map(|(_, doc)| doc.index_text()).collect();

		if !texts.is_empty() {
			index.add(self.embed_batch(embedder, &texts).await?)?;
		}

		if let Err(err) = index.save(&store.to_snapshot()) {
			warn!(error = %err, "Failed to write local index snapshot; continuing in memory.");
		}

		info!(vectors = index.len(), "Built local index from knowledge set.");

		Ok((IndexBackend::Local(index), Some(store)))
	}
}

fn last_resort_state(dimensions: usize) -> ServiceState {
	let mut store = KnowledgeStore::new();

	for doc in baseline() {
		store.insert(doc);
	}

	ServiceState {
		embedder: Embedder::Stub(StubEmbedder::new(dimensions)),
		backend: IndexBackend::KeywordOnly,
		store,
		ready: true,
	}
}

impl ServiceError {
	pub(crate) fn knowledge(message: impl Into<String>) -> Self {
		Self::Knowledge { message: message.into() }
	}
}
