use std::sync::Arc;

use krishi_service::RetrievalService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<RetrievalService>,
}
impl AppState {
	/// Initialization never fails; the service degrades to the lowest tier it
	/// can stand up rather than refusing to start.
	pub async fn new(config: krishi_config::Config) -> Self {
		let service = RetrievalService::new(config);

		service.initialize().await;

		Self { service: Arc::new(service) }
	}
}
