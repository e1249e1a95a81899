//! Degraded-tier scoring: substring hit counting for the simple text tier and
//! fixed keyword sets for the last-resort advisory tier.

use serde::{Deserialize, Serialize};

const CROP_KEYWORDS: &[&str] = &["wheat", "rice", "corn", "tomato", "potato"];
const DISEASE_KEYWORDS: &[&str] = &["disease", "infection", "blight", "rust", "spot"];
const FERTILIZER_KEYWORDS: &[&str] = &["fertilizer", "urea", "dap", "nutrient"];

const CROP_ADVISORY: &str = "For crop-specific information, please specify the crop name. Common \
                             crops include wheat, rice, corn, and vegetables.";
const DISEASE_ADVISORY: &str = "For disease identification, please upload an image of the \
                                affected plant. Common diseases include bacterial blight, rust, \
                                and leaf spots.";
const FERTILIZER_ADVISORY: &str = "For fertilizer recommendations, consider soil testing and \
                                   crop requirements. Common fertilizers include Urea (Nitrogen) \
                                   and DAP (Phosphorus).";

/// Fraction of whitespace-separated query tokens that appear as substrings of
/// `text_lower`. `text_lower` must already be lower-cased.
pub fn match_score(query: &str, text_lower: &str) -> f32 {
	let tokens: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();

	if tokens.is_empty() {
		return 0.0;
	}

	let hits = tokens.iter().filter(|token| text_lower.contains(token.as_str())).count();

	hits as f32 / tokens.len() as f32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
	CropInfo,
	DiseaseInfo,
	FertilizerInfo,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Advisory {
	pub kind: AdvisoryKind,
	pub score: f32,
	pub text: &'static str,
}

/// Match the query against the fixed keyword sets. Matched categories are
/// emitted in crop, disease, fertilizer order with their fixed confidences, so
/// the advisory tier never returns empty-handed for an on-topic query.
pub fn keyword_advisories(query: &str) -> Vec<Advisory> {
	let query = query.to_lowercase();
	let mut out = Vec::new();

	if CROP_KEYWORDS.iter().any(|keyword| query.contains(keyword)) {
		out.push(Advisory { kind: AdvisoryKind::CropInfo, score: 0.9, text: CROP_ADVISORY });
	}
	if DISEASE_KEYWORDS.iter().any(|keyword| query.contains(keyword)) {
		out.push(Advisory { kind: AdvisoryKind::DiseaseInfo, score: 0.8, text: DISEASE_ADVISORY });
	}
	if FERTILIZER_KEYWORDS.iter().any(|keyword| query.contains(keyword)) {
		out.push(Advisory {
			kind: AdvisoryKind::FertilizerInfo,
			score: 0.7,
			text: FERTILIZER_ADVISORY,
		});
	}

	out
}
