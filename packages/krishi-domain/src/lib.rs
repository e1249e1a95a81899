pub mod knowledge;
pub mod text;

pub use knowledge::{Document, KnowledgeStore, baseline};
pub use text::{Advisory, AdvisoryKind, keyword_advisories, match_score};
