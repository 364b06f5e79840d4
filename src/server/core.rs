use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use log::{info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::api;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::server::state::AppState;
use crate::storage::validation::Root;
use crate::transfer::cleanup::CleanupQueue;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub struct Server {
    state: AppState,
}

impl Server {
    /// Validates the configuration, canonicalizes the root directory and
    /// starts the archive cleanup task. Must be called inside a tokio runtime.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let base_dir = config.base_dir_path();
        let root = Root::new(&base_dir).map_err(|e| ServerError::InvalidRoot {
            path: base_dir.display().to_string(),
            reason: e.to_string(),
        })?;
        info!("Server root directory: {}", root.path().display());

        let cleanup = CleanupQueue::spawn(config.archive_cleanup_delay());

        Ok(Self {
            state: AppState::new(root, config, cleanup),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    /// Binds the configured address and serves until Ctrl+C.
    ///
    /// HTTPS is used when a certificate and key are configured and present.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.state.config.socket_addr()?;

        let Some((cert, key)) = self.state.config.tls_paths() else {
            let listener = TcpListener::bind(addr).await?;
            return self.serve(listener).await;
        };

        let tls = RustlsConfig::from_pem_file(&cert, &key)
            .await
            .map_err(ServerError::Tls)?;
        self.log_listening("https", addr);

        let handle = Handle::new();
        let shutdown = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router().into_make_service())
            .await?;

        info!("Server stopped");
        Ok(())
    }

    /// Serves plain HTTP on an already bound listener until Ctrl+C.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        self.log_listening("http", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }

    fn log_listening(&self, scheme: &str, addr: SocketAddr) {
        info!(
            "Starting file server on {}://{} (upload limit {} MB)",
            scheme, addr, self.state.config.max_content_length_mb
        );
        if let Some(domain) = self.state.config.domain.as_deref() {
            info!("Public URL: {}://{}:{}", scheme, domain, addr.port());
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
