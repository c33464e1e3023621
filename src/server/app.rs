use super::lifecycle::{HttpServer, admission};
use super::router::services;
use super::state::AppState;
use super::trace::server_identity;
use crate::config::{ConfigServerConfig, StorageBackend};
use crate::core::{ConfigServerError, Result};
use crate::storage::{ClusterStore, FileClusterStore, InMemoryClusterStore};
use axum::Router;
use axum::middleware;
use axum::routing::any;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

pub const SERVICES_PATH: &str = "/services";

/// `/services` behind admission control. Every method reaches the dispatch
/// table, which answers unknown combinations with "invalid action".
pub fn build_router(state: AppState, http: Arc<HttpServer>) -> Router {
    Router::new()
        .route(SERVICES_PATH, any(services))
        .with_state(state)
        .layer(middleware::from_fn_with_state(http, admission))
        .layer(TraceLayer::new_for_http())
}

/// A configured server: store, state and lifecycle, not yet listening.
pub struct ConfigServer {
    config: ConfigServerConfig,
    state: AppState,
    http: Arc<HttpServer>,
    stop: watch::Sender<bool>,
}

impl ConfigServer {
    /// Open the configured storage backend.
    pub async fn open(config: ConfigServerConfig) -> Result<Self> {
        let store: Arc<dyn ClusterStore> = match config.storage.backend {
            StorageBackend::Memory => {
                info!("storage backend: memory");
                Arc::new(InMemoryClusterStore::new())
            }
            StorageBackend::File => {
                let path = config.storage.path.clone().ok_or_else(|| {
                    ConfigServerError::Config(
                        "storage.path is required for the file backend".to_string(),
                    )
                })?;
                info!(path = %path.display(), "storage backend: file");
                Arc::new(FileClusterStore::open(path).await?)
            }
        };
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: ConfigServerConfig, store: Arc<dyn ClusterStore>) -> Self {
        let state = AppState::new(store, config.service_address(), server_identity());
        let http = Arc::new(HttpServer::new(config.shutdown.clone()));
        let (stop, _) = watch::channel(false);
        Self {
            config,
            state,
            http,
            stop,
        }
    }

    pub fn config(&self) -> &ConfigServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn http(&self) -> &Arc<HttpServer> {
        &self.http
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone(), Arc::clone(&self.http))
    }

    /// Ask a running server to drain and exit. Idempotent.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Bind `server.address` and serve until [`ConfigServer::stop`].
    pub async fn run(&self) -> Result<()> {
        let address = &self.config.server.address;
        let listener = TcpListener::bind(address).await.map_err(|e| {
            ConfigServerError::Io(format!("failed to bind to {address}: {e}"))
        })?;
        self.serve(listener).await
    }

    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let mut stop = self.stop.subscribe();
        let shutdown = async move {
            let _ = stop.wait_for(|stop| *stop).await;
        };
        Arc::clone(&self.http)
            .run(listener, self.router(), shutdown)
            .await
    }
}
