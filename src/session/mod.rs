//! Conversation sessions
//!
//! - [`types`]: `ChatSession` and `Message`
//! - [`title`]: smart titles derived from the first user message
//! - [`repository`]: coalesced, deduplicating session persistence
//! - [`pointer`]: read-once handoff of the session to resume

pub mod pointer;
pub mod repository;
pub mod title;
pub mod types;

pub use pointer::EphemeralSessionPointer;
pub use repository::{dedup_by_id, sort_for_display, SessionRepository};
pub use title::{generate_title, smart_title};
pub use types::{ChatSession, Message};
