//! Storage layer
//!
//! - [`backend`]: physical key/value backends (file, memory)
//! - [`record`]: logical record routing between durable and volatile backends
//! - [`debounce`]: coalesced writes with one pending timer per key
//! - [`capacity`]: read-only size diagnostics

pub mod backend;
pub mod capacity;
pub mod debounce;
pub mod record;

pub use backend::{FileBackend, KvBackend, MemoryBackend};
pub use capacity::{CapacityMonitor, CapacityReport, CapacityStatus};
pub use debounce::{CoalescedWriter, WriteSink};
pub use record::{RecordKey, RecordStore, Route};
