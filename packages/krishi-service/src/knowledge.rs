//! Knowledge store population: merge persisted JSON fragments when present,
//! fall back to the hardcoded baseline set otherwise.

use std::{fs, io, path::Path};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{ServiceError, ServiceResult};
use krishi_domain::{KnowledgeStore, baseline};

/// Read every `*.json` fragment under the configured directory and merge it
/// into a fresh store. A missing directory or an empty merge installs the
/// baseline set; a directory that exists but cannot be listed is an error so
/// initialization can take the last-resort path. Individual unreadable
/// fragments are logged and skipped.
pub(crate) fn load_knowledge(cfg: &krishi_config::Knowledge) -> ServiceResult<KnowledgeStore> {
	let mut store = KnowledgeStore::new();
	let dir = Path::new(&cfg.fragments_dir);

	match fs::read_dir(dir) {
		Ok(entries) => {
			let mut paths: Vec<_> = entries
				.filter_map(|entry| entry.ok().map(|entry| entry.path()))
				.filter(|path| path.extension().is_some_and(|ext| ext == "json"))
				.collect();

			// Deterministic merge order regardless of directory listing order.
			paths.sort();

			for path in paths {
				match read_fragment(&path) {
					Ok(fragment) => store.merge_fragment(&fragment),
					Err(err) => {
						warn!(path = %path.display(), error = %err, "Skipping unreadable knowledge fragment.");
					},
				}
			}
		},
		Err(err) if err.kind() == io::ErrorKind::NotFound => {},
		Err(err) => {
			return Err(ServiceError::knowledge(format!(
				"Failed to list knowledge fragments at {}: {err}",
				dir.display()
			)));
		},
	}

	if store.is_empty() {
		for doc in baseline() {
			store.insert(doc);
		}

		info!("Installed baseline knowledge set.");
	} else {
		info!(documents = store.len(), "Loaded knowledge fragments.");
	}

	Ok(store)
}

fn read_fragment(path: &Path) -> ServiceResult<Map<String, Value>> {
	let raw = fs::read_to_string(path)
		.map_err(|err| ServiceError::knowledge(err.to_string()))?;
	let value: Value = serde_json::from_str(&raw)
		.map_err(|err| ServiceError::knowledge(err.to_string()))?;

	match value {
		Value::Object(map) => Ok(map),
		_ => Err(ServiceError::knowledge("Fragment root must be an object.")),
	}
}
