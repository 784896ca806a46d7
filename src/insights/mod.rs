//! Health timeline and insights
//!
//! Symptom and medication timelines are derived from session transcripts,
//! either by a remote collaborator or by local heuristics, then scored and
//! cached as a single snapshot.

pub mod engine;
pub mod extractor;
pub mod remote;
pub mod synthesizer;
pub mod types;

pub use engine::InsightEngine;
pub use remote::{HttpInsightCollaborator, InsightCollaborator};
pub use synthesizer::{distinct_count, filter_disclaimers, health_score, synthesize};
pub use types::{
    Extraction, HealthInsight, HealthSnapshot, InsightCategory, InsightSource, LifestyleFactors,
    MedicationEntry, SymptomEntry,
};
