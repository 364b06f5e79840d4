//! Pi File Server
//!
//! A small HTTP file manager that exposes one directory tree for browsing,
//! upload, download and bulk operations, confining every request to that
//! directory.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod navigate;
pub mod server;
pub mod storage;
pub mod system;
pub mod transfer;
pub mod utils;

pub use config::ServerConfig;
pub use error::{ServerError, StorageError};
pub use server::Server;
