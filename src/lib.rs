//! CareVault - Local-first Encrypted Health Session Store
//!
//! CareVault keeps conversation sessions, medicine lookups and two derived
//! analytics artifacts (a feedback-driven personalization profile and a
//! heuristic health timeline) entirely on the user's device, encrypted at
//! rest. There is no server-side database.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           CareVault                              │
//! │  ┌──────────────────┐ ┌────────────────┐ ┌──────────────────┐   │
//! │  │ SessionRepository│ │ MedicineHistory│ │ SessionPointer   │   │
//! │  │ (coalesced)      │ │ (coalesced)    │ │ (read-once)      │   │
//! │  └────────┬─────────┘ └───────┬────────┘ └────────┬─────────┘   │
//! │  ┌────────┴─────────┐ ┌───────┴────────┐          │             │
//! │  │ FeedbackProfile  │ │ InsightEngine  │──► remote collaborator  │
//! │  │ Engine           │ │ (heuristics)   │          │             │
//! │  └────────┬─────────┘ └───────┬────────┘          │             │
//! │  ┌────────▼───────────────────▼───────────────────▼─────────┐   │
//! │  │                      RecordStore                          │   │
//! │  │   durable keys ──► CryptoStore    volatile keys ──► plain │   │
//! │  └────────────────────────────┬──────────────────────────────┘   │
//! │                  AES-256-GCM  │  CapacityMonitor (read-only)     │
//! │  ┌────────────────────────────▼──────────────────────────────┐   │
//! │  │                 KvBackend (file / memory)                  │   │
//! │  └────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure policy
//!
//! Every failure is recovered locally with a safe default: unreadable
//! values are deleted and read as absent, failed writes are dropped and the
//! last good state is kept, and a failing remote collaborator falls back to
//! local heuristics. Only `EncryptionUnavailable` reaches the caller.
//!
//! ## Modules
//!
//! - [`config`]: Configuration management
//! - [`crypto`]: Key handling and the encrypting value store
//! - [`storage`]: Backends, record routing, write coalescing, capacity
//! - [`session`]: Sessions, smart titles and the session pointer
//! - [`history`]: Medicine lookup history
//! - [`feedback`]: Feedback-driven personalization profile
//! - [`insights`]: Symptom/medication extraction and health insights
//! - [`export`]: Human-readable report
//! - [`vault`]: The `CareVault` handle wiring everything together

pub mod config;
pub mod crypto;
pub mod error;
pub mod export;
pub mod feedback;
pub mod history;
pub mod insights;
pub mod session;
pub mod storage;
pub mod vault;

pub use config::CareVaultConfig;
pub use error::{Error, Result};
pub use vault::CareVault;
