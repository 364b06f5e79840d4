//! Host information
//!
//! Snapshot of the machine the server runs on, reported by `/api/system-stats`.

pub mod stats;

pub use stats::{SystemStats, collect};
