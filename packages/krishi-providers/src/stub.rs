//! Deterministic stand-in for the HTTP embedding provider, used when the real
//! model is unreachable so the rest of the service keeps a uniform interface.

/// Generates fixed-dimension pseudo-random unit vectors seeded from the text,
/// so the same input always embeds to the same vector. Infallible.
#[derive(Clone, Copy, Debug)]
pub struct StubEmbedder {
	dimensions: usize,
}

impl StubEmbedder {
	pub fn new(dimensions: usize) -> Self {
		Self { dimensions: dimensions.max(1) }
	}

	pub fn dimensions(&self) -> usize {
		self.dimensions
	}

	pub fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
		texts.iter().map(|text| self.embed_one(text)).collect()
	}

	fn embed_one(&self, text: &str) -> Vec<f32> {
		let mut bytes = vec![0_u8; self.dimensions * 4];
		let mut reader = blake3::Hasher::new().update(text.as_bytes()).finalize_xof();

		reader.fill(&mut bytes);

		let mut vec = Vec::with_capacity(self.dimensions);

		for chunk in bytes.chunks_exact(4) {
			let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);

			// Map to [-1, 1) so the vector is not biased to one orthant.
			vec.push(word as f32 / (u32::MAX as f32 / 2.0) - 1.0);
		}

		let norm = vec.iter().map(|value| value * value).sum::<f32>().sqrt();

		if norm > 0.0 {
			for value in &mut vec {
				*value /= norm;
			}
		}

		vec
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn embeddings_are_deterministic() {
		let embedder = StubEmbedder::new(384);
		let a = embedder.embed(&["wheat rust".to_string()]);
		let b = embedder.embed(&["wheat rust".to_string()]);

		assert_eq!(a, b);
	}

	#[test]
	fn embeddings_have_requested_dimension() {
		let embedder = StubEmbedder::new(384);
		let vecs = embedder.embed(&["a".to_string(), "b".to_string()]);

		assert_eq!(vecs.len(), 2);
		assert!(vecs.iter().all(|vec| vec.len() == 384));
	}

	#[test]
	fn distinct_texts_embed_differently() {
		let embedder = StubEmbedder::new(64);
		let vecs = embedder.embed(&["wheat".to_string(), "rice".to_string()]);

		assert_ne!(vecs[0], vecs[1]);
	}

	#[test]
	fn embeddings_are_unit_length() {
		let embedder = StubEmbedder::new(384);
		let vec = &embedder.embed(&["bacterial blight".to_string()])[0];
		let norm = vec.iter().map(|value| value * value).sum::<f32>().sqrt();

		assert!((norm - 1.0).abs() < 1e-4, "norm was {norm}");
	}
}
