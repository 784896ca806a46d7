//! Heuristic entity extraction from session transcripts
//!
//! Pure keyword and suffix-pattern matching over user-authored messages.
//! Matching is case-insensitive and anchored at word starts, so "headache"
//! also matches "headaches" but "eat" does not match "heat".

use super::types::{Extraction, LifestyleFactors, MedicationEntry, SymptomEntry};
use crate::session::ChatSession;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Canonical symptom name and the terms that indicate it
const SYMPTOM_VOCABULARY: &[(&str, &[&str])] = &[
    ("headache", &["headache", "migraine"]),
    ("nausea", &["nausea", "nauseous", "queasy"]),
    ("fatigue", &["fatigue", "tired", "exhausted"]),
    ("dizziness", &["dizzy", "dizziness", "lightheaded"]),
    ("fever", &["fever"]),
    ("cough", &["cough"]),
    ("sore throat", &["sore throat"]),
    ("back pain", &["back pain", "backache"]),
    ("chest pain", &["chest pain"]),
    ("stomach pain", &["stomach ache", "stomachache", "stomach pain", "abdominal pain"]),
    ("joint pain", &["joint pain"]),
    ("insomnia", &["insomnia", "can't sleep", "cannot sleep"]),
    ("anxiety", &["anxiety", "anxious", "panic"]),
    ("rash", &["rash", "itchy"]),
    ("shortness of breath", &["shortness of breath", "short of breath", "breathless"]),
];

/// (severity, modifiers), checked in order
const SEVERITY_MODIFIERS: &[(u8, &[&str])] = &[
    (8, &["severe", "extreme"]),
    (6, &["bad", "intense"]),
    (3, &["mild", "slight"]),
];

pub const DEFAULT_SEVERITY: u8 = 5;

const MEDICATION_CONTEXT: &[&str] = &[
    "take",
    "taking",
    "took",
    "prescribed",
    "medication",
    "medicine",
    "pill",
    "tablet",
    "dose",
    "mg",
    "started",
];

pub const DEFAULT_FREQUENCY: &str = "daily";

static DRUG_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b([A-Z][a-z]+(?:pril|olol|sartan|statin|formin|dipine|prazole|oxetine|azepam|zolam|cillin|mycin|cycline|profen|triptan|tidine|gliptin|floxacin))\b",
    )
    .expect("drug name pattern is valid")
});

const SLEEP_TERMS: &[&str] = &["sleep", "slept", "insomnia", "nap"];
const EXERCISE_TERMS: &[&str] = &["exercise", "workout", "gym", "jog", "walk", "yoga", "swim"];
const STRESS_TERMS: &[&str] = &["stress", "anxious", "anxiety", "overwhelm", "worried"];
const DIET_TERMS: &[&str] = &["diet", "eat", "ate", "food", "meal", "snack"];

/// Extract symptoms, medications and lifestyle mentions. Insights are left
/// empty for the synthesizer.
pub fn extract(chats: &[ChatSession]) -> Extraction {
    let mut symptoms: BTreeMap<&'static str, Vec<(DateTime<Utc>, u8)>> = BTreeMap::new();
    let mut medications: BTreeMap<String, MedicationEntry> = BTreeMap::new();
    let mut lifestyle = LifestyleFactors::default();

    for message in chats.iter().flat_map(|c| c.user_messages()) {
        let lower = message.content.to_lowercase();

        let severity = severity_of(&lower);
        for (name, terms) in SYMPTOM_VOCABULARY {
            if mentions_any(&lower, terms) {
                symptoms
                    .entry(*name)
                    .or_default()
                    .push((message.timestamp, severity));
            }
        }

        if mentions_any(&lower, MEDICATION_CONTEXT) {
            for name in medication_names(&message.content) {
                medications
                    .entry(name.to_lowercase())
                    .and_modify(|entry| {
                        if message.timestamp < entry.start_date {
                            entry.start_date = message.timestamp;
                        }
                    })
                    .or_insert_with(|| MedicationEntry {
                        name: name.to_string(),
                        start_date: message.timestamp,
                        frequency: DEFAULT_FREQUENCY.to_string(),
                    });
            }
        }

        lifestyle.sleep += usize::from(mentions_any(&lower, SLEEP_TERMS));
        lifestyle.exercise += usize::from(mentions_any(&lower, EXERCISE_TERMS));
        lifestyle.stress += usize::from(mentions_any(&lower, STRESS_TERMS));
        lifestyle.diet += usize::from(mentions_any(&lower, DIET_TERMS));
    }

    let symptoms = symptoms
        .into_iter()
        .map(|(name, mut occurrences)| {
            occurrences.sort_by_key(|(date, _)| *date);
            SymptomEntry {
                name: name.to_string(),
                dates: occurrences.iter().map(|(d, _)| *d).collect(),
                severity: occurrences.iter().map(|(_, s)| *s).collect(),
            }
        })
        .collect();

    let mut medications: Vec<MedicationEntry> = medications.into_values().collect();
    medications.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.name.cmp(&b.name)));

    Extraction {
        symptoms,
        medications,
        lifestyle,
        insights: Vec::new(),
    }
}

/// Severity estimate for one (lowercased) message
pub fn severity_of(lower: &str) -> u8 {
    SEVERITY_MODIFIERS
        .iter()
        .find(|(_, words)| mentions_any(lower, words))
        .map(|(level, _)| *level)
        .unwrap_or(DEFAULT_SEVERITY)
}

/// Capitalized tokens ending in a known drug-name suffix
pub fn medication_names(text: &str) -> Vec<&str> {
    DRUG_NAME
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

fn mentions_any(lower: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| mentions(lower, t))
}

/// Whether `term` occurs in `lower` starting at a word boundary
fn mentions(lower: &str, term: &str) -> bool {
    lower.match_indices(term).any(|(start, _)| {
        lower[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}
