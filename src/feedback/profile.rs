//! Rule-based personalization profile
//!
//! The profile is a pure function of the feedback list (no incremental
//! merge). Rules, all case-insensitive substring checks:
//!
//! 1. **Style**: empathetic when enough liked replies use empathy markers,
//!    else concise when liked replies are short on average, else detailed.
//! 2. **Topics**: fixed categories whose keywords appear in liked replies,
//!    in vocabulary order, capped.
//! 3. **Disliked patterns**: length and jargon checks over disliked replies.
//! 4. **Effective approaches**: examples, step sequences and reassurance
//!    that recur in liked replies.

use super::types::{FeedbackRecord, ResponseStyle, UserProfile};
use crate::config::FeedbackConfig;

const EMPATHY_MARKERS: &[&str] = &[
    "i understand",
    "understandable",
    "i'm sorry",
    "sorry to hear",
    "that must be",
    "it's okay to feel",
    "you're not alone",
    "i hear you",
    "concerning for you",
];

const JARGON_TERMS: &[&str] = &[
    "etiology",
    "pathophysiology",
    "contraindicat",
    "pharmacokinetic",
    "idiopathic",
    "comorbid",
    "prognosis",
    "differential diagnosis",
    "bilateral",
    "sequelae",
];

const EXAMPLE_MARKERS: &[&str] = &["for example", "for instance", "such as", "e.g."];

const STEP_MARKERS: &[&str] = &["step 1", "first,", "second,", "next,", "then,", "finally,", "1."];

const REASSURANCE_MARKERS: &[&str] = &[
    "don't worry",
    "is common",
    "very common",
    "usually not serious",
    "manageable",
    "reassuring",
    "nothing to be alarmed",
];

/// Fixed topic vocabulary: (category, keywords)
const TOPIC_VOCABULARY: &[(&str, &[&str])] = &[
    ("medications", &["medication", "medicine", "drug", "pill", "dosage", "dose"]),
    ("nutrition", &["diet", "nutrition", "food", "vitamin", "eating"]),
    ("mental health", &["stress", "anxiety", "depression", "mood", "mental"]),
    ("sleep", &["sleep", "insomnia", "tired", "fatigue"]),
    ("exercise", &["exercise", "workout", "fitness", "physical activity"]),
    ("pain management", &["pain", "ache", "sore"]),
    ("heart health", &["heart", "blood pressure", "cholesterol"]),
    ("respiratory", &["cough", "breath", "asthma", "lung"]),
];

pub const PATTERN_LENGTHY: &str = "overly lengthy responses";
pub const PATTERN_BRIEF: &str = "responses that are too brief";
pub const PATTERN_JARGON: &str = "overly technical jargon";

pub const APPROACH_EXAMPLES: &str = "concrete examples";
pub const APPROACH_STEPS: &str = "step-by-step guidance";
pub const APPROACH_REASSURANCE: &str = "reassurance";

/// Build a profile from the full feedback list
pub fn build_profile(records: &[FeedbackRecord], config: &FeedbackConfig) -> UserProfile {
    let liked: Vec<String> = records
        .iter()
        .filter(|r| r.liked)
        .map(|r| r.content.to_lowercase())
        .collect();
    let disliked: Vec<String> = records
        .iter()
        .filter(|r| !r.liked)
        .map(|r| r.content.to_lowercase())
        .collect();

    UserProfile {
        preferred_style: preferred_style(&liked, config),
        topics_of_interest: topics_of_interest(&liked, config.max_topics),
        disliked_patterns: disliked_patterns(&disliked, config),
        effective_approaches: effective_approaches(&liked, config),
    }
}

fn preferred_style(liked: &[String], config: &FeedbackConfig) -> ResponseStyle {
    if liked.is_empty() {
        return ResponseStyle::default();
    }
    if fraction_containing(liked, EMPATHY_MARKERS) > config.empathy_ratio {
        ResponseStyle::Empathetic
    } else if mean_length(liked) < config.concise_max_len {
        ResponseStyle::Concise
    } else {
        ResponseStyle::Detailed
    }
}

fn topics_of_interest(liked: &[String], max_topics: usize) -> Vec<String> {
    TOPIC_VOCABULARY
        .iter()
        .filter(|(_, keywords)| liked.iter().any(|text| contains_any(text, keywords)))
        .map(|(category, _)| category.to_string())
        .take(max_topics)
        .collect()
}

fn disliked_patterns(disliked: &[String], config: &FeedbackConfig) -> Vec<String> {
    let mut patterns = Vec::new();
    if disliked.is_empty() {
        return patterns;
    }

    let mean = mean_length(disliked);
    if mean > config.lengthy_min_len {
        patterns.push(PATTERN_LENGTHY.to_string());
    }
    if mean < config.brief_max_len {
        patterns.push(PATTERN_BRIEF.to_string());
    }
    if fraction_containing(disliked, JARGON_TERMS) > config.jargon_ratio {
        patterns.push(PATTERN_JARGON.to_string());
    }
    patterns
}

fn effective_approaches(liked: &[String], config: &FeedbackConfig) -> Vec<String> {
    let checks = [
        (EXAMPLE_MARKERS, APPROACH_EXAMPLES),
        (STEP_MARKERS, APPROACH_STEPS),
        (REASSURANCE_MARKERS, APPROACH_REASSURANCE),
    ];

    checks
        .iter()
        .filter(|(markers, _)| fraction_containing(liked, markers) > config.approach_ratio)
        .map(|(_, label)| label.to_string())
        .collect()
}

/// Append the personalization block to a system prompt.
///
/// Below `min_feedback_for_adaptation` records the base prompt is returned
/// unchanged, whatever the profile says.
pub fn adaptive_prompt(
    base_prompt: &str,
    profile: &UserProfile,
    feedback_count: usize,
    config: &FeedbackConfig,
) -> String {
    if feedback_count < config.min_feedback_for_adaptation {
        return base_prompt.to_string();
    }

    let mut block = String::from("\n\n## Personalization (learned from user feedback)\n");
    block.push_str(&format!(
        "- Response style: {}\n",
        profile.preferred_style.instruction()
    ));
    if !profile.disliked_patterns.is_empty() {
        block.push_str(&format!(
            "- Avoid: {}\n",
            profile.disliked_patterns.join(", ")
        ));
    }
    if !profile.effective_approaches.is_empty() {
        block.push_str(&format!(
            "- The user appreciates: {}\n",
            profile.effective_approaches.join(", ")
        ));
    }
    if !profile.topics_of_interest.is_empty() {
        block.push_str(&format!(
            "- Topics of interest: {}\n",
            profile.topics_of_interest.join(", ")
        ));
    }

    format!("{}{}", base_prompt, block.trim_end())
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

fn fraction_containing(texts: &[String], needles: &[&str]) -> f64 {
    if texts.is_empty() {
        return 0.0;
    }
    let hits = texts.iter().filter(|t| contains_any(t, needles)).count();
    hits as f64 / texts.len() as f64
}

fn mean_length(texts: &[String]) -> f64 {
    if texts.is_empty() {
        return 0.0;
    }
    let total: usize = texts.iter().map(|t| t.chars().count()).sum();
    total as f64 / texts.len() as f64
}
