use tracing::{error, info};

use crate::{IndexBackend, RetrievalService};

impl RetrievalService {
	/// Best-effort persistence at shutdown. Never raises and never blocks the
	/// shutdown sequence on a failure; errors are logged and swallowed.
	pub async fn cleanup(&self) {
		let state = self.state.read().await;

		if let IndexBackend::Local(index) = &state.backend {
			match index.save(&state.store.to_snapshot()) {
				Ok(()) => info!(vectors = index.len(), "Persisted local index snapshot."),
				Err(err) => error!(error = %err, "Failed to persist local index snapshot."),
			}
		}

		info!("Retrieval service cleanup completed.");
	}
}
