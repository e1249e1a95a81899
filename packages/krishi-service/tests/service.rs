use std::{
	env, fs,
	path::PathBuf,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use serde_json::Map;

use krishi_config::{
	Config, EmbeddingProviderConfig, Index, Knowledge, LocalIndexConfig, Qdrant, Search, Service,
	Storage,
};
use krishi_providers::stub::StubEmbedder;
use krishi_service::{
	BoxFuture, EmbeddingProvider, HitContent, HitSource, Providers, RetrievalService,
};

const DIM: u32 = 8;

struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Err(color_eyre::eyre::eyre!("embedding provider is down")) })
	}
}

/// Succeeds (via the stub generator) for the first `healthy_calls` batches,
/// then fails every call, so tests can reach the query-time degrade path.
struct FlakyEmbedding {
	healthy_calls: usize,
	calls: AtomicUsize,
}
impl FlakyEmbedding {
	fn new(healthy_calls: usize) -> Self {
		Self { healthy_calls, calls: AtomicUsize::new(0) }
	}
}
impl EmbeddingProvider for FlakyEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);
		let healthy = call < self.healthy_calls;
		let vecs = StubEmbedder::new(cfg.dimensions as usize).embed(texts);

		Box::pin(async move {
			if healthy {
				Ok(vecs)
			} else {
				Err(color_eyre::eyre::eyre!("embedding provider went away"))
			}
		})
	}
}

/// Answers the first call (the startup probe) immediately, then sleeps for
/// `delay` before every later batch.
struct SlowEmbedding {
	delay: Duration,
	calls: AtomicUsize,
}
impl SlowEmbedding {
	fn new(delay: Duration) -> Self {
		Self { delay, calls: AtomicUsize::new(0) }
	}
}
impl EmbeddingProvider for SlowEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);
		let delay = self.delay;
		let vecs = StubEmbedder::new(cfg.dimensions as usize).embed(texts);

		Box::pin(async move {
			if call > 0 {
				tokio::time::sleep(delay).await;
			}

			Ok(vecs)
		})
	}
}

fn temp_dir(label: &str) -> PathBuf {
	static COUNTER: AtomicUsize = AtomicUsize::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("krishi_service_test_{label}_{nanos}_{pid}_{ordinal}"));

	path
}

fn test_config(backend: &str, local_dir: &PathBuf) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		knowledge: Knowledge {
			fragments_dir: local_dir.join("no_fragments").display().to_string(),
		},
		search: Search { top_k: 5 },
		storage: Storage {
			index: Index {
				backend: backend.to_string(),
				qdrant: Qdrant {
					url: String::new(),
					collection: "krishi-test".to_string(),
					vector_dim: DIM,
				},
				local: LocalIndexConfig { dir: local_dir.display().to_string() },
			},
		},
		providers: krishi_config::Providers {
			embedding: EmbeddingProviderConfig {
				api_base: String::new(),
				api_key: String::new(),
				path: "/v1/embeddings".to_string(),
				model: "test".to_string(),
				dimensions: DIM,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
	}
}

fn text_service(label: &str) -> RetrievalService {
	let cfg = test_config("text", &temp_dir(label));

	RetrievalService::with_providers(cfg, Providers::new(Arc::new(FailingEmbedding)))
}

fn assert_sorted(hits: &[krishi_service::SearchHit]) {
	assert!(
		hits.windows(2).all(|pair| pair[0].score >= pair[1].score),
		"Scores must be non-increasing."
	);
}

#[tokio::test]
async fn text_tier_surfaces_bacterial_blight_for_blight_query() {
	let service = text_service("blight");

	service.initialize().await;

	assert_eq!(service.active_tier().await, "text");

	let hits = service.search("bacterial blight rice", Some(3)).await;

	assert!(!hits.is_empty());
	assert!(hits.len() <= 3);
	assert_sorted(&hits);

	let top_score = hits[0].score;
	let tied_top_has_blight = hits
		.iter()
		.take_while(|hit| hit.score == top_score)
		.any(|hit| match &hit.content {
			HitContent::Document(doc) => doc.item.as_deref() == Some("bacterial_blight"),
			HitContent::Advisory(_) => false,
		});

	assert!(tied_top_has_blight, "bacterial_blight must be (tied-)top for a blight query.");
}

#[tokio::test]
async fn search_respects_top_k_and_ordering() {
	let service = text_service("topk");

	service.initialize().await;

	let hits = service.search("wheat rice rust urea", Some(2)).await;

	assert!(hits.len() <= 2);
	assert_sorted(&hits);

	for hit in &hits {
		assert_eq!(hit.source, HitSource::TextSearch);
	}
}

#[tokio::test]
async fn initialize_twice_does_not_duplicate_baseline() {
	let service = text_service("idempotent");

	service.initialize().await;

	let first = service.document_count().await;

	service.initialize().await;

	assert!(service.is_ready().await);
	assert_eq!(service.document_count().await, first);
	assert_eq!(first, 6);
}

#[tokio::test]
async fn added_document_is_text_searchable() {
	let service = text_service("roundtrip");

	service.initialize().await;

	let mut metadata = Map::new();

	metadata.insert("source".to_string(), serde_json::json!("test"));

	let id = service
		.add_document("Neem oil controls aphids", metadata)
		.await
		.expect("Expected add_document to return an id.");

	assert_eq!(id, 6);

	let hits = service.search("aphids", None).await;
	let found = hits.iter().any(|hit| match &hit.content {
		HitContent::Document(doc) => doc.content.as_deref() == Some("Neem oil controls aphids"),
		HitContent::Advisory(_) => false,
	});

	assert!(found, "The added document must be text-searchable.");
}

#[tokio::test]
async fn local_tier_rebuilds_and_serves_vector_hits() {
	let dir = temp_dir("local_rebuild");
	let cfg = test_config("local", &dir);
	let service =
		RetrievalService::with_providers(cfg, Providers::new(Arc::new(FailingEmbedding)));

	service.initialize().await;

	assert_eq!(service.active_tier().await, "local");
	assert_eq!(service.document_count().await, 6);

	let hits = service.search("wheat planting season", None).await;

	assert!(!hits.is_empty());
	assert!(hits.len() <= 5);
	assert_sorted(&hits);

	for hit in &hits {
		assert_eq!(hit.source, HitSource::VectorSearch);
		assert!(hit.index.is_some());
	}

	let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn query_time_embedding_failure_degrades_to_keyword_advisories() {
	let dir = temp_dir("flaky");
	let cfg = test_config("local", &dir);
	// Healthy for the probe and the rebuild batch, then down.
	let service =
		RetrievalService::with_providers(cfg, Providers::new(Arc::new(FlakyEmbedding::new(2))));

	service.initialize().await;

	assert_eq!(service.active_tier().await, "local");

	let hits = service.search("I have wheat rust disease", None).await;

	assert_eq!(hits.len(), 2);
	assert_eq!(hits[0].source, HitSource::CropInfo);
	assert_eq!(hits[0].score, 0.9);
	assert_eq!(hits[1].source, HitSource::DiseaseInfo);
	assert_eq!(hits[1].score, 0.8);

	for hit in &hits {
		assert!(matches!(hit.content, HitContent::Advisory(_)));
	}

	let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn vector_tier_with_empty_store_returns_no_hits() {
	let dir = temp_dir("empty_store");

	fs::create_dir_all(&dir).expect("Failed to create snapshot dir.");
	fs::write(
		dir.join("index.json"),
		serde_json::json!({ "dimensions": DIM, "vectors": [] }).to_string(),
	)
	.expect("Failed to write index file.");
	fs::write(dir.join("metadata.json"), "{}").expect("Failed to write metadata file.");

	let cfg = test_config("local", &dir);
	let service =
		RetrievalService::with_providers(cfg, Providers::new(Arc::new(FailingEmbedding)));

	service.initialize().await;

	assert_eq!(service.active_tier().await, "local");
	assert_eq!(service.document_count().await, 0);

	let hits = service.search("wheat", None).await;

	assert!(hits.is_empty());

	let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn added_document_is_vector_searchable_on_local_tier() {
	let dir = temp_dir("local_add");
	let cfg = test_config("local", &dir);
	let service =
		RetrievalService::with_providers(cfg, Providers::new(Arc::new(FailingEmbedding)));

	service.initialize().await;

	let id = service
		.add_document("Neem oil controls aphids on vegetable crops", Map::new())
		.await
		.expect("Expected add_document to return an id.");

	// The stub embedder is deterministic, so querying with the exact content
	// must rank the new document first.
	let hits = service.search("Neem oil controls aphids on vegetable crops", Some(1)).await;

	assert_eq!(hits.len(), 1);
	assert_eq!(hits[0].index, Some(id));

	let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn cleanup_persists_snapshot_for_next_startup() {
	let dir = temp_dir("persist");

	{
		let cfg = test_config("local", &dir);
		let service =
			RetrievalService::with_providers(cfg, Providers::new(Arc::new(FailingEmbedding)));

		service.initialize().await;
		service.add_document("Drip irrigation saves water", Map::new()).await;
		service.cleanup().await;
	}

	let cfg = test_config("local", &dir);
	let service =
		RetrievalService::with_providers(cfg, Providers::new(Arc::new(FailingEmbedding)));

	service.initialize().await;

	assert_eq!(service.active_tier().await, "local");
	assert_eq!(service.document_count().await, 7);

	let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn slow_embedding_does_not_block_concurrent_search() {
	let cfg = test_config("text", &temp_dir("slow_add"));
	let service = Arc::new(RetrievalService::with_providers(
		cfg,
		Providers::new(Arc::new(SlowEmbedding::new(Duration::from_secs(1)))),
	));

	service.initialize().await;

	let adder = {
		let service = service.clone();

		tokio::spawn(
			async move { service.add_document("Drip irrigation saves water", Map::new()).await },
		)
	};

	// Let add_document reach its embedding call before timing the search.
	tokio::time::sleep(Duration::from_millis(100)).await;

	let start = Instant::now();
	let hits = service.search("wheat", None).await;
	let waited = start.elapsed();

	assert!(!hits.is_empty());
	assert!(waited < Duration::from_millis(500), "search stalled for {waited:?} behind add_document");
	assert_eq!(adder.await.expect("add_document task panicked."), Some(6));
}

#[tokio::test]
async fn fragments_replace_baseline_in_sorted_file_order() {
	let dir = temp_dir("fragments");
	let frag_dir = dir.join("knowledge");

	fs::create_dir_all(&frag_dir).expect("Failed to create fragments dir.");
	fs::write(
		frag_dir.join("01_crops.json"),
		serde_json::json!({
			"crops": {
				"maize": { "planting_season": "June-July" },
				"millet": { "planting_season": "June-July" },
			},
		})
		.to_string(),
	)
	.expect("Failed to write crops fragment.");
	fs::write(
		frag_dir.join("02_fertilizers.json"),
		serde_json::json!({ "fertilizers": { "npk": { "composition": "balanced" } } }).to_string(),
	)
	.expect("Failed to write fertilizers fragment.");
	fs::write(frag_dir.join("zz_broken.json"), "not json").expect("Failed to write broken fragment.");
	fs::write(frag_dir.join("notes.txt"), "ignore me").expect("Failed to write stray file.");

	let mut cfg = test_config("text", &dir);

	cfg.knowledge.fragments_dir = frag_dir.display().to_string();

	let service =
		RetrievalService::with_providers(cfg, Providers::new(Arc::new(FailingEmbedding)));

	service.initialize().await;

	// Three entries from the two readable fragments; the baseline is not
	// installed, the broken fragment is skipped, the stray file is ignored.
	assert_eq!(service.document_count().await, 3);

	let hits = service.search("maize", Some(1)).await;

	assert_eq!(hits[0].index, Some(0), "First fragment file must be merged first.");

	let hits = service.search("npk", Some(1)).await;

	assert_eq!(hits[0].index, Some(2), "Second fragment file must be merged after the first.");

	let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn search_initializes_lazily() {
	let service = text_service("lazy");
	let hits = service.search("wheat", None).await;

	assert!(service.is_ready().await);
	assert!(!hits.is_empty());
}
