use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use krishi_api::routes;
use krishi_api::state::AppState;
use krishi_config::{
	Config, EmbeddingProviderConfig, Index, Knowledge, LocalIndexConfig, Providers, Qdrant,
	Search, Service, Storage,
};

fn test_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		knowledge: Knowledge { fragments_dir: "does-not-exist".to_string() },
		search: Search { top_k: 5 },
		storage: Storage {
			index: Index {
				backend: "text".to_string(),
				qdrant: Qdrant {
					url: String::new(),
					collection: "krishi-test".to_string(),
					vector_dim: 8,
				},
				local: LocalIndexConfig { dir: "unused".to_string() },
			},
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				api_base: String::new(),
				api_key: String::new(),
				path: "/v1/embeddings".to_string(),
				model: "test".to_string(),
				dimensions: 8,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
		},
	}
}

async fn test_router() -> axum::Router {
	routes::router(AppState::new(test_config()).await)
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from(body.to_string()))
		.expect("Failed to build request.")
}

async fn json_body(response: axum::response::Response) -> Value {
	let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");

	serde_json::from_slice(&bytes).expect("Body must be JSON.")
}

#[tokio::test]
async fn health_reports_tier_and_document_count() {
	let app = test_router().await;
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
		.await
		.expect("Router must answer.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;

	assert_eq!(body["status"], "ok");
	assert_eq!(body["tier"], "text");
	assert_eq!(body["documents"], 6);
}

#[tokio::test]
async fn search_returns_scored_hits() {
	let app = test_router().await;
	let response = app
		.oneshot(json_request("/v1/knowledge/search", json!({ "query": "wheat", "top_k": 3 })))
		.await
		.expect("Router must answer.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;
	let hits = body["hits"].as_array().expect("hits must be an array.");

	assert!(!hits.is_empty());
	assert!(hits.len() <= 3);
	assert_eq!(hits[0]["source"], "text_search");
}

#[tokio::test]
async fn blank_query_is_rejected() {
	let app = test_router().await;
	let response = app
		.oneshot(json_request("/v1/knowledge/search", json!({ "query": "   " })))
		.await
		.expect("Router must answer.");

	assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

	let body = json_body(response).await;

	assert_eq!(body["error_code"], "invalid_request");
}

#[tokio::test]
async fn add_document_returns_assigned_index() {
	let app = test_router().await;
	let response = app
		.oneshot(json_request(
			"/v1/knowledge/documents",
			json!({ "content": "Neem oil controls aphids", "metadata": { "source": "test" } }),
		))
		.await
		.expect("Router must answer.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;

	assert_eq!(body["stored"], true);
	assert_eq!(body["index"], 6);
}
