//! Server core functionality
//!
//! This module contains the HTTP server, its shared state and the startup
//! sequence that ties configuration, the root directory and the router
//! together.

pub mod core;
pub mod state;

pub use core::Server;
pub use state::AppState;
