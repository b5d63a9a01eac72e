//! ServerBuilder: fluent construction of the application
//!
//! Collaborators are constructed once and injected explicitly; the builder
//! is the single place the dependency container comes together.
//!
//! # Example
//!
//! ```ignore
//! ServerBuilder::new()
//!     .with_identity_verifier(verifier)
//!     .with_profile_store(InMemoryProfileStore::new())
//!     .with_task_store(InMemoryTaskStore::new())
//!     .serve("127.0.0.1:3000").await?;
//! ```

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::server::router::build_router;
use crate::server::state::AppState;
use crate::services::{IdentityVerifier, ProfileStore, TaskStore};

/// Builder for the HTTP application
pub struct ServerBuilder {
    config: AppConfig,
    verifier: Option<Arc<dyn IdentityVerifier>>,
    profiles: Option<Arc<dyn ProfileStore>>,
    tasks: Option<Arc<dyn TaskStore>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            verifier: None,
            profiles: None,
            tasks: None,
        }
    }

    /// Replace the default configuration
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the identity-provider verification collaborator (required)
    pub fn with_identity_verifier(mut self, verifier: impl IdentityVerifier + 'static) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    /// Set the profile store (required)
    pub fn with_profile_store(mut self, store: impl ProfileStore + 'static) -> Self {
        self.profiles = Some(Arc::new(store));
        self
    }

    /// Set the task store (required)
    pub fn with_task_store(mut self, store: impl TaskStore + 'static) -> Self {
        self.tasks = Some(Arc::new(store));
        self
    }

    /// Build the shared state container
    pub fn build_state(mut self) -> Result<Arc<AppState>> {
        let verifier = self.verifier.take().ok_or_else(|| {
            anyhow::anyhow!("IdentityVerifier is required. Call .with_identity_verifier()")
        })?;
        let profiles = self.profiles.take().ok_or_else(|| {
            anyhow::anyhow!("ProfileStore is required. Call .with_profile_store()")
        })?;
        let tasks = self
            .tasks
            .take()
            .ok_or_else(|| anyhow::anyhow!("TaskStore is required. Call .with_task_store()"))?;

        Ok(Arc::new(AppState::new(
            self.config,
            verifier,
            profiles,
            tasks,
        )))
    }

    /// Build the final router
    pub fn build(self) -> Result<Router> {
        Ok(build_router(self.build_state()?))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Binds to `addr`, serves requests and shuts down cleanly on SIGTERM or
    /// Ctrl+C.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize tracing from `RUST_LOG`, defaulting to `info`
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
