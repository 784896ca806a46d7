//! Health timeline data types
//!
//! The same shapes are produced by the heuristic extractor and accepted from
//! the remote text-understanding collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One detected symptom with every dated occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomEntry {
    pub name: String,
    pub dates: Vec<DateTime<Utc>>,
    /// Severity estimate (1-10) per occurrence, parallel to `dates`
    pub severity: Vec<u8>,
}

impl SymptomEntry {
    /// Number of recorded occurrences
    pub fn occurrences(&self) -> usize {
        self.dates.len().max(self.severity.len())
    }

    /// Mean severity, 0 when nothing was recorded
    pub fn average_severity(&self) -> f64 {
        if self.severity.is_empty() {
            return 0.0;
        }
        let total: u32 = self.severity.iter().map(|s| u32::from(*s)).sum();
        f64::from(total) / self.severity.len() as f64
    }
}

/// One detected medication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationEntry {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub frequency: String,
}

/// Category of a synthesized insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Symptom,
    Medication,
    Lifestyle,
    #[serde(other)]
    General,
}

impl std::fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsightCategory::Symptom => write!(f, "symptom"),
            InsightCategory::Medication => write!(f, "medication"),
            InsightCategory::Lifestyle => write!(f, "lifestyle"),
            InsightCategory::General => write!(f, "general"),
        }
    }
}

/// A confidence-scored observation with a suggested action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInsight {
    pub pattern: String,
    pub recommendation: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    pub category: InsightCategory,
}

/// Mention counts of lifestyle factors in user messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifestyleFactors {
    pub sleep: usize,
    pub exercise: usize,
    pub stress: usize,
    pub diet: usize,
}

/// Extraction result, local or remote
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub symptoms: Vec<SymptomEntry>,
    pub medications: Vec<MedicationEntry>,
    #[serde(default)]
    pub lifestyle: LifestyleFactors,
    #[serde(default)]
    pub insights: Vec<HealthInsight>,
}

/// Which path produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSource {
    Remote,
    Heuristic,
}

impl std::fmt::Display for InsightSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsightSource::Remote => write!(f, "remote"),
            InsightSource::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// Cached, timestamped result of one explicit refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub symptoms: Vec<SymptomEntry>,
    pub medications: Vec<MedicationEntry>,
    pub lifestyle: LifestyleFactors,
    pub insights: Vec<HealthInsight>,
    pub health_score: u8,
    pub source: InsightSource,
    #[serde(with = "crate::session::types::iso_millis")]
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_severity() {
        let entry = SymptomEntry {
            name: "headache".to_string(),
            dates: vec![Utc::now(); 3],
            severity: vec![8, 6, 3],
        };
        assert_eq!(entry.occurrences(), 3);
        assert!((entry.average_severity() - 17.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_category_maps_to_general() {
        let insight: HealthInsight = serde_json::from_str(
            r#"{"pattern":"p","recommendation":"r","confidence":0.5,"category":"hydration"}"#,
        )
        .unwrap();
        assert_eq!(insight.category, InsightCategory::General);
    }

    #[test]
    fn test_extraction_lifestyle_optional() {
        let extraction: Extraction =
            serde_json::from_str(r#"{"symptoms":[],"medications":[]}"#).unwrap();
        assert_eq!(extraction.lifestyle, LifestyleFactors::default());
        assert!(extraction.insights.is_empty());
    }
}
