use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use time::OffsetDateTime;

/// The atomic retrievable unit. Structured entries carry `category`, `item`,
/// and `data`; directly added entries carry `content` and `metadata` instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub item: Option<String>,
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub data: Map<String, Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub metadata: Map<String, Value>,
	#[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
	pub added_at: Option<OffsetDateTime>,
}

impl Document {
	pub fn structured(category: &str, item: &str, data: Map<String, Value>) -> Self {
		Self {
			category: Some(category.to_string()),
			item: Some(item.to_string()),
			data,
			content: None,
			metadata: Map::new(),
			added_at: None,
		}
	}

	pub fn added(content: String, metadata: Map<String, Value>, added_at: OffsetDateTime) -> Self {
		Self {
			category: None,
			item: None,
			data: Map::new(),
			content: Some(content),
			metadata,
			added_at: Some(added_at),
		}
	}

	/// Text fed to the embedder: "{category}: {item}. key: value ..." over the
	/// string-valued attributes, or the raw content for directly added entries.
	pub fn index_text(&self) -> String {
		if let Some(content) = &self.content {
			return content.clone();
		}

		let category = self.category.as_deref().unwrap_or_default();
		let item = self.item.as_deref().unwrap_or_default();
		let attrs = self
			.data
			.iter()
			.filter_map(|(key, value)| value.as_str().map(|text| format!("{key}: {text}")))
			.collect::<Vec<_>>()
			.join(" ");

		format!("{category}: {item}. {attrs}")
	}

	/// Lower-cased text scanned by the simple text tier. Unlike `index_text`
	/// this includes every attribute, the metadata, and the content.
	pub fn match_text(&self) -> String {
		let mut parts = Vec::new();

		if let Some(category) = &self.category {
			parts.push(category.clone());
		}
		if let Some(item) = &self.item {
			parts.push(item.clone());
		}
		if !self.data.is_empty() {
			parts.push(Value::Object(self.data.clone()).to_string());
		}
		if let Some(content) = &self.content {
			parts.push(content.clone());
		}
		if !self.metadata.is_empty() {
			parts.push(Value::Object(self.metadata.clone()).to_string());
		}

		parts.join(" ").to_lowercase()
	}
}

/// Append-only table of documents keyed by integer id. The id assigned to a
/// new document is the current size; ids are never reused and there is no
/// deletion API.
#[derive(Clone, Debug, Default)]
pub struct KnowledgeStore {
	docs: BTreeMap<u64, Document>,
}

impl KnowledgeStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.docs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.docs.is_empty()
	}

	pub fn get(&self, id: u64) -> Option<&Document> {
		self.docs.get(&id)
	}

	pub fn insert(&mut self, doc: Document) -> u64 {
		let id = self.docs.len() as u64;

		self.docs.insert(id, doc);

		id
	}

	pub fn iter(&self) -> impl Iterator<Item = (u64, &Document)> {
		self.docs.iter().map(|(id, doc)| (*id, doc))
	}

	/// Merge a structured fragment record, keyed category -> item -> attrs.
	/// Non-object values are skipped.
	pub fn merge_fragment(&mut self, fragment: &Map<String, Value>) {
		for (category, items) in fragment {
			let Some(items) = items.as_object() else {
				continue;
			};

			for (item, data) in items {
				let Some(data) = data.as_object() else {
					continue;
				};

				self.insert(Document::structured(category, item, data.clone()));
			}
		}
	}

	/// Adopt a persisted metadata snapshot, keyed by string-encoded ids.
	/// Entries with non-numeric keys are skipped.
	pub fn from_snapshot(snapshot: BTreeMap<String, Document>) -> Self {
		let mut docs = BTreeMap::new();

		for (key, doc) in snapshot {
			let Ok(id) = key.parse::<u64>() else {
				continue;
			};

			docs.insert(id, doc);
		}

		Self { docs }
	}

	pub fn to_snapshot(&self) -> BTreeMap<String, Document> {
		self.docs.iter().map(|(id, doc)| (id.to_string(), doc.clone())).collect()
	}
}

/// The hardcoded baseline knowledge set, installed whenever no persisted
/// knowledge source is found. Order is fixed so the baseline always lands at
/// ids 0-5.
pub fn baseline() -> Vec<Document> {
	let entries: [(&str, &str, Value); 6] = [
		("crops", "wheat", json!({
			"planting_season": "October-December",
			"harvesting_season": "March-May",
			"water_requirement": "450-650mm",
			"common_diseases": ["rust", "smut", "blight"],
			"fertilizer": "NPK 120:60:40 kg/ha",
		})),
		("crops", "rice", json!({
			"planting_season": "June-July",
			"harvesting_season": "October-November",
			"water_requirement": "1200-1500mm",
			"common_diseases": ["blast", "bacterial_blight", "brown_spot"],
			"fertilizer": "NPK 100:50:50 kg/ha",
		})),
		("diseases", "bacterial_blight", json!({
			"crops_affected": ["rice"],
			"symptoms": "Water-soaked lesions on leaves",
			"treatment": "Copper-based fungicides",
			"prevention": "Use resistant varieties, proper field sanitation",
		})),
		("diseases", "rust", json!({
			"crops_affected": ["wheat"],
			"symptoms": "Orange-red pustules on leaves",
			"treatment": "Propiconazole spray",
			"prevention": "Early sowing, resistant varieties",
		})),
		("fertilizers", "urea", json!({
			"composition": "46% N",
			"application": "Split doses during crop growth",
			"crops": ["wheat", "rice", "corn"],
		})),
		("fertilizers", "dap", json!({
			"composition": "18:46:0 NPK",
			"application": "Basal application before sowing",
			"crops": ["wheat", "rice", "pulses"],
		})),
	];

	entries
		.into_iter()
		.filter_map(|(category, item, data)| match data {
			Value::Object(data) => Some(Document::structured(category, item, data)),
			_ => None,
		})
		.collect()
}
