//! Rule-based synthesis of health insights
//!
//! Insights are a pure function of the symptom and medication lists:
//!
//! 1. **Recurring symptoms**: each symptom seen at least
//!    `recurring_threshold` times produces exactly one insight. High average
//!    severity asks for trigger logging, otherwise frequent occurrence asks
//!    for lifestyle adjustments, otherwise general monitoring.
//! 2. **Medication adherence**: any tracked medication produces a single
//!    reminder insight.
//!
//! The health score is a flat per-item penalty with no severity or recency
//! weighting.

use super::types::{HealthInsight, InsightCategory, MedicationEntry, SymptomEntry};
use crate::config::InsightsConfig;
use std::collections::HashSet;

pub const TRIGGER_CONFIDENCE: f32 = 0.8;
pub const LIFESTYLE_CONFIDENCE: f32 = 0.7;
pub const MONITORING_CONFIDENCE: f32 = 0.6;
pub const ADHERENCE_CONFIDENCE: f32 = 0.9;

const SYMPTOM_PENALTY: i64 = 5;
const MEDICATION_PENALTY: i64 = 3;

/// Recommendations that only repeat the generic disclaimer
const DISCLAIMERS: &[&str] = &[
    "consult a healthcare provider",
    "consult your healthcare provider",
    "consult a healthcare professional",
    "consult a doctor",
    "consult your doctor",
];

/// Synthesize insights from extracted symptoms and medications
pub fn synthesize(
    symptoms: &[SymptomEntry],
    medications: &[MedicationEntry],
    config: &InsightsConfig,
) -> Vec<HealthInsight> {
    let mut insights: Vec<HealthInsight> = symptoms
        .iter()
        .filter(|s| s.occurrences() >= config.recurring_threshold)
        .map(|s| symptom_insight(s, config))
        .collect();

    if !medications.is_empty() {
        insights.push(HealthInsight {
            pattern: format!("Tracking {} medication(s)", medications.len()),
            recommendation: "Set reminders to take your medications consistently as prescribed."
                .to_string(),
            confidence: ADHERENCE_CONFIDENCE,
            category: InsightCategory::Medication,
        });
    }

    insights
}

fn symptom_insight(symptom: &SymptomEntry, config: &InsightsConfig) -> HealthInsight {
    let count = symptom.occurrences();
    let name = &symptom.name;

    if symptom.average_severity() >= config.high_severity {
        HealthInsight {
            pattern: format!("Recurring severe {name} ({count} times)"),
            recommendation: format!(
                "Keep a log of possible triggers such as food, activity and stress around each {name} episode."
            ),
            confidence: TRIGGER_CONFIDENCE,
            category: InsightCategory::Symptom,
        }
    } else if count >= config.frequent_threshold {
        HealthInsight {
            pattern: format!("Frequent {name} ({count} times)"),
            recommendation: format!(
                "Consider lifestyle adjustments like regular sleep and hydration to reduce {name}."
            ),
            confidence: LIFESTYLE_CONFIDENCE,
            category: InsightCategory::Lifestyle,
        }
    } else {
        HealthInsight {
            pattern: format!("Recurring {name} ({count} times)"),
            recommendation: format!("Keep monitoring your {name} and note any changes."),
            confidence: MONITORING_CONFIDENCE,
            category: InsightCategory::Symptom,
        }
    }
}

/// 100 minus 5 per distinct symptom and 3 per distinct medication, clamped
pub fn health_score(symptom_count: usize, medication_count: usize) -> u8 {
    let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
    let penalty = count(symptom_count)
        .saturating_mul(SYMPTOM_PENALTY)
        .saturating_add(count(medication_count).saturating_mul(MEDICATION_PENALTY));
    100_i64.saturating_sub(penalty).clamp(0, 100) as u8
}

/// Number of distinct names, compared case-insensitively
pub fn distinct_count<'a>(names: impl IntoIterator<Item = &'a str>) -> usize {
    names
        .into_iter()
        .map(|name| name.trim().to_lowercase())
        .collect::<HashSet<_>>()
        .len()
}

/// Drop insights whose recommendation is only the generic disclaimer
pub fn filter_disclaimers(insights: Vec<HealthInsight>) -> Vec<HealthInsight> {
    insights
        .into_iter()
        .filter(|i| !is_disclaimer(&i.recommendation))
        .collect()
}

fn is_disclaimer(text: &str) -> bool {
    let normalized = text
        .trim()
        .trim_end_matches(|c: char| c == '.' || c == '!')
        .to_lowercase();
    let normalized = normalized.strip_prefix("please ").unwrap_or(&normalized);
    DISCLAIMERS.contains(&normalized)
}
