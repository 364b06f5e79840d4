//! Shared request state

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::storage::validation::Root;
use crate::transfer::cleanup::CleanupQueue;

/// State handed to every request handler.
///
/// Everything in here is immutable after startup, so handlers never lock.
#[derive(Debug, Clone)]
pub struct AppState {
    pub root: Arc<Root>,
    pub config: Arc<ServerConfig>,
    pub cleanup: CleanupQueue,
}

impl AppState {
    pub fn new(root: Root, config: ServerConfig, cleanup: CleanupQueue) -> Self {
        Self {
            root: Arc::new(root),
            config: Arc::new(config),
            cleanup,
        }
    }

    /// Upload limit in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.config.max_content_length_bytes()
    }
}
