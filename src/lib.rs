// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod analyze;
pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod heuristics;
pub mod ingest;
pub mod metrics;
pub mod net;
pub mod notify;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::bootstrap::Service;
pub use crate::config::AppConfig;
pub use crate::error::{Rejection, ScanError};
pub use crate::ingest::types::{CandidateRecord, PaymentKind, PersistedRecord, SourceAdapter};
