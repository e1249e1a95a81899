use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{HitContent, HitSource, IndexBackend, RetrievalService, ServiceResult};
use krishi_domain::{KnowledgeStore, keyword_advisories, match_score};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchHit {
	pub score: f32,
	pub content: HitContent,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub index: Option<u64>,
	pub source: HitSource,
}

impl RetrievalService {
	/// Rank knowledge against a query. Never raises: a vector-tier failure
	/// degrades this one call to the keyword advisories, and an empty list is
	/// a valid answer.
	pub async fn search(&self, query: &str, top_k: Option<u32>) -> Vec<SearchHit> {
		self.ensure_initialized().await;

		let top_k = top_k.unwrap_or(self.cfg.search.top_k).max(1) as usize;
		let state = self.state.read().await;

		match &state.backend {
			IndexBackend::Remote(_) | IndexBackend::Local(_) => {
				match self.vector_search(&state, query, top_k).await {
					Ok(hits) => hits,
					Err(err) => {
						error!(error = %err, "Vector search failed; answering from keyword advisories.");

						keyword_search(query, top_k)
					},
				}
			},
			IndexBackend::TextOnly => text_search(&state.store, query, top_k),
			IndexBackend::KeywordOnly => keyword_search(query, top_k),
		}
	}

	async fn vector_search(
		&self,
		state: &crate::ServiceState,
		query: &str,
		top_k: usize,
	) -> ServiceResult<Vec<SearchHit>> {
		let vector = self.embed_one(&state.embedder, query).await?;
		let candidates = match &state.backend {
			IndexBackend::Remote(store) => store.query(vector, top_k as u64).await?,
			IndexBackend::Local(index) => index.search(&vector, top_k)?,
			_ => Vec::new(),
		};

		// A candidate id with no store entry is a filtered candidate, not an
		// error; the result list is not padded back up to top_k.
		let hits = candidates
			.into_iter()
			.filter_map(|(score, id)| {
				let doc = state.store.get(id)?;

				Some(SearchHit {
					score,
					content: HitContent::Document(doc.clone()),
					index: Some(id),
					source: HitSource::VectorSearch,
				})
			})
			.collect();

		Ok(hits)
	}
}

/// Simple text tier: fraction of query tokens found in each document's
/// lower-cased text, keeping positive scores only.
fn text_search(store: &KnowledgeStore, query: &str, top_k: usize) -> Vec<SearchHit> {
	let mut hits: Vec<SearchHit> = store
		.iter()
		.filter_map(|(id, doc)| {
			let score = match_score(query, &doc.match_text());

			(score > 0.0).then(|| SearchHit {
				score,
				content: HitContent::Document(doc.clone()),
				index: Some(id),
				source: HitSource::TextSearch,
			})
		})
		.collect();

	// Stable sort keeps ties in id order.
	hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
	hits.truncate(top_k);

	hits
}

/// Last-resort tier: fixed advisories for the matched keyword categories, in
/// crop, disease, fertilizer order.
fn keyword_search(query: &str, top_k: usize) -> Vec<SearchHit> {
	let mut hits: Vec<SearchHit> = keyword_advisories(query)
		.into_iter()
		.map(|advisory| SearchHit {
			score: advisory.score,
			content: HitContent::Advisory(advisory.text.to_string()),
			index: None,
			source: advisory.kind.into(),
		})
		.collect();

	hits.truncate(top_k);

	hits
}
