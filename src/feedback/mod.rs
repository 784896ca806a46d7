//! Feedback-driven personalization
//!
//! Like/dislike events on assistant replies are aggregated into a
//! `UserProfile`, which in turn adapts the system prompt once enough
//! feedback exists.

pub mod engine;
pub mod profile;
pub mod types;

pub use engine::FeedbackProfileEngine;
pub use profile::{adaptive_prompt, build_profile};
pub use types::{FeedbackRecord, ResponseStyle, UserProfile};
