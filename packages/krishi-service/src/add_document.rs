use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{error, info};

use crate::{IndexBackend, RetrievalService};
use krishi_domain::Document;

impl RetrievalService {
	/// Append a document to the knowledge store, indexing its vector when a
	/// real index is active. Returns the new id, or `None` when embedding or
	/// index insertion fails; never raises. On the text and keyword tiers the
	/// document is stored but not vector-searchable until a future rebuild.
	pub async fn add_document(
		&self,
		content: &str,
		metadata: Map<String, Value>,
	) -> Option<u64> {
		self.ensure_initialized().await;

		// Embed before taking the write lock; provider latency must not stall
		// in-flight searches, which only need the read lock.
		let embedder = self.state.read().await.embedder.clone();
		let vector = match self.embed_one(&embedder, content).await {
			Ok(vector) => vector,
			Err(err) => {
				error!(error = %err, "Failed to embed document; not stored.");

				return None;
			},
		};

		let mut state = self.state.write().await;
		let id = state.store.len() as u64;
		let inserted = match &mut state.backend {
			IndexBackend::Remote(store) => store.upsert(vec![(id, vector)]).await.err(),
			IndexBackend::Local(index) => index.add(vec![vector]).err(),
			IndexBackend::TextOnly | IndexBackend::KeywordOnly => None,
		};

		if let Some(err) = inserted {
			error!(error = %err, "Failed to index document; not stored.");

			return None;
		}

		let assigned =
			state.store.insert(Document::added(content.to_string(), metadata, OffsetDateTime::now_utc()));

		debug_assert_eq!(assigned, id);
		info!(id, "Added document to knowledge store.");

		Some(id)
	}
}
