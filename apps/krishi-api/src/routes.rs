use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::AppState;
use krishi_service::SearchHit;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/knowledge/search", post(search))
		.route("/v1/knowledge/documents", post(add_document))
		.with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	pub tier: &'static str,
	pub documents: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	pub top_k: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
	pub hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct AddDocumentRequest {
	pub content: String,
	#[serde(default)]
	pub metadata: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct AddDocumentResponse {
	pub stored: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub index: Option<u64>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok",
		tier: state.service.active_tier().await,
		documents: state.service.document_count().await,
	})
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	if payload.query.trim().is_empty() {
		return Err(json_error(
			StatusCode::UNPROCESSABLE_ENTITY,
			"invalid_request",
			"query must not be empty.",
			Some(vec!["query".to_string()]),
		));
	}

	let hits = state.service.search(&payload.query, payload.top_k).await;

	Ok(Json(SearchResponse { hits }))
}

async fn add_document(
	State(state): State<AppState>,
	Json(payload): Json<AddDocumentRequest>,
) -> Result<Json<AddDocumentResponse>, ApiError> {
	if payload.content.trim().is_empty() {
		return Err(json_error(
			StatusCode::UNPROCESSABLE_ENTITY,
			"invalid_request",
			"content must not be empty.",
			Some(vec!["content".to_string()]),
		));
	}

	let index = state.service.add_document(&payload.content, payload.metadata).await;

	Ok(Json(AddDocumentResponse { stored: index.is_some(), index }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into(), fields }
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			fields: self.fields,
		};

		(self.status, Json(body)).into_response()
	}
}
