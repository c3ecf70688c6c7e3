//! Transcript record model.

mod construction;
pub mod types;

pub use types::{AttributeKind, SemanticKeys, TranscriptRecord};
