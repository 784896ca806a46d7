//! Smart session titles
//!
//! A title is derived from the first user message: image-analysis requests
//! become `Image: <label>`, everything else is the opening words of the
//! question with a leading interrogative or pronoun removed.

use super::types::Message;
use regex::Regex;
use std::sync::LazyLock;

/// Title used when nothing usable can be derived
pub const DEFAULT_TITLE: &str = "Health Consultation";

/// Number of words kept by default
pub const DEFAULT_TITLE_WORDS: usize = 5;

/// Words dropped from the start of a question
const LEADING_WORDS: &[&str] = &[
    "what", "why", "how", "when", "where", "who", "which", "whose", "i", "i'm", "im", "my",
    "me", "we", "can", "could", "should", "would", "is", "are", "do", "does", "did", "will",
];

static IMAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[Image Analysis:\s*([^\]]*)\]").expect("image marker pattern is valid")
});

/// Generate a title from free text with the default settings
pub fn generate_title(text: &str) -> String {
    generate_title_with(text, DEFAULT_TITLE_WORDS, DEFAULT_TITLE)
}

/// Generate a title from free text
pub fn generate_title_with(text: &str, max_words: usize, fallback: &str) -> String {
    let trimmed = text.trim().trim_end_matches('?').trim_end();

    let mut words = trimmed.split_whitespace().peekable();
    if let Some(first) = words.peek() {
        let normalized = first
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
            .to_lowercase();
        if LEADING_WORDS.contains(&normalized.as_str()) {
            words.next();
        }
    }

    let title = words.take(max_words).collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        return fallback.to_string();
    }
    capitalize(&title)
}

/// Derive a title for a conversation from its first user message
pub fn smart_title(messages: &[Message], max_words: usize, fallback: &str) -> String {
    let Some(first) = messages.iter().find(|m| m.is_user) else {
        return fallback.to_string();
    };

    if let Some(label) = image_label(&first.content) {
        let label = label
            .split_whitespace()
            .take(max_words)
            .collect::<Vec<_>>()
            .join(" ");
        if !label.is_empty() {
            return format!("Image: {}", label);
        }
    }

    let text = IMAGE_MARKER.replace(&first.content, "");
    generate_title_with(&text, max_words, fallback)
}

/// Label carried by an image-analysis marker, if present
pub fn image_label(content: &str) -> Option<&str> {
    IMAGE_MARKER
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_leading_pronoun() {
        assert_eq!(
            generate_title("I have a headache and feel dizzy"),
            "Have a headache and feel"
        );
    }

    #[test]
    fn test_strips_interrogative_and_question_mark() {
        assert_eq!(generate_title("What causes headaches?"), "Causes headaches");
        assert_eq!(generate_title("how do I sleep better??"), "Do I sleep better");
    }

    #[test]
    fn test_empty_falls_back() {
        assert_eq!(generate_title(""), "Health Consultation");
        assert_eq!(generate_title("   "), "Health Consultation");
        assert_eq!(generate_title("Why?"), "Health Consultation");
    }

    #[test]
    fn test_keeps_non_question_words() {
        assert_eq!(generate_title("fever since yesterday"), "Fever since yesterday");
    }

    #[test]
    fn test_custom_word_count() {
        assert_eq!(
            generate_title_with("one two three four", 2, "x"),
            "One two"
        );
    }

    #[test]
    fn test_smart_title_uses_first_user_message() {
        let messages = vec![
            Message::assistant("Hello, how can I help?"),
            Message::user("Is ibuprofen safe with coffee?"),
            Message::user("Another question"),
        ];
        assert_eq!(
            smart_title(&messages, 5, DEFAULT_TITLE),
            "Ibuprofen safe with coffee"
        );
    }

    #[test]
    fn test_smart_title_image_marker() {
        let messages = vec![Message::user(
            "[Image Analysis: Prescription label for amoxicillin capsules] what does it say",
        )];
        assert_eq!(
            smart_title(&messages, 5, DEFAULT_TITLE),
            "Image: Prescription label for amoxicillin capsules"
        );
    }

    #[test]
    fn test_smart_title_empty_image_label_uses_text() {
        let messages = vec![Message::user("[Image Analysis: ] What is this rash?")];
        assert_eq!(smart_title(&messages, 5, DEFAULT_TITLE), "Is this rash");
    }

    #[test]
    fn test_smart_title_without_user_message() {
        let messages = vec![Message::assistant("Hi")];
        assert_eq!(smart_title(&messages, 5, DEFAULT_TITLE), DEFAULT_TITLE);
    }
}
