use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, Distance, PointStruct, Query, QueryPointsBuilder,
		UpsertPointsBuilder, VectorParamsBuilder, point_id::PointIdOptions,
	},
};

use crate::{Error, Result};

/// Handle to the managed vector index. Connecting creates the named
/// collection when absent, with the embedder's dimensionality and cosine
/// similarity so scores read higher-is-closer.
pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}

impl QdrantStore {
	pub async fn connect(cfg: &krishi_config::Qdrant) -> Result<Self> {
		if cfg.url.is_empty() {
			return Err(Error::QdrantUnconfigured);
		}

		let client = Qdrant::from_url(&cfg.url).build()?;
		let store =
			Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim };

		store.ensure_collection().await?;

		Ok(store)
	}

	async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(&self.collection).await? {
			return Ok(());
		}

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(
					VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
				),
			)
			.await?;

		Ok(())
	}

	pub async fn upsert(&self, points: Vec<(u64, Vec<f32>)>) -> Result<()> {
		let mut structs = Vec::with_capacity(points.len());

		for (id, vec) in points {
			if vec.len() != self.vector_dim as usize {
				return Err(Error::DimensionMismatch {
					expected: self.vector_dim as usize,
					got: vec.len(),
				});
			}

			structs.push(PointStruct::new(id, vec, Payload::new()));
		}

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), structs).wait(true))
			.await?;

		Ok(())
	}

	/// Nearest-neighbor query; returns (similarity, point id) pairs in the
	/// index's native descending order. Points without numeric ids are
	/// dropped.
	pub async fn query(&self, vector: Vec<f32>, top_k: u64) -> Result<Vec<(f32, u64)>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::DimensionMismatch {
				expected: self.vector_dim as usize,
				got: vector.len(),
			});
		}

		let response = self
			.client
			.query(
				QueryPointsBuilder::new(self.collection.clone())
					.query(Query::new_nearest(vector))
					.limit(top_k),
			)
			.await?;
		let hits = response
			.result
			.into_iter()
			.filter_map(|point| {
				let id = match point.id.as_ref()?.point_id_options.as_ref()? {
					PointIdOptions::Num(id) => *id,
					PointIdOptions::Uuid(_) => return None,
				};

				Some((point.score, id))
			})
			.collect();

		Ok(hits)
	}
}
