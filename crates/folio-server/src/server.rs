//! Folio server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use folio_store::{DataStore, DataStoreConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::routes::create_router;
use crate::state::AppState;

/// HTTP server for the static site and the notes API.
#[derive(Debug, Clone)]
pub struct FolioServer {
    state: Arc<AppState>,
}

impl FolioServer {
    /// Create a server, opening (and creating) the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn new(config: ServerConfig) -> ApiResult<Self> {
        let store = DataStore::open(DataStoreConfig::new(&config.data_dir))?;
        Ok(Self::with_store(config, store))
    }

    /// Create a server around an already opened store.
    #[must_use]
    pub fn with_store(config: ServerConfig, store: DataStore) -> Self {
        Self {
            state: Arc::new(AppState::new(config, store)),
        }
    }

    /// Get the server state for external access.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Bind the configured address, retrying on the fallback port if that fails.
    ///
    /// # Errors
    ///
    /// Returns an error if neither address can be bound.
    pub async fn bind(&self) -> ApiResult<TcpListener> {
        let config = self.state.config();
        match bind_addr(config.bind_addr).await {
            Ok(listener) => Ok(listener),
            Err(err) => {
                let Some(fallback) = config.fallback_addr() else {
                    return Err(err);
                };
                warn!(error = %err, fallback = %fallback, "primary port unavailable, trying fallback");
                bind_addr(fallback).await
            }
        }
    }

    /// Start the server and listen for connections.
    ///
    /// This method runs until the server encounters a fatal error.
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails.
    pub async fn serve(&self) -> ApiResult<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the server with graceful shutdown support.
    ///
    /// The server will shut down when the provided future completes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails.
    pub async fn serve_with_shutdown<F>(&self, shutdown: F) -> ApiResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept loop fails.
    pub async fn serve_listener<F>(&self, listener: TcpListener, shutdown: F) -> ApiResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        info!(
            addr = %addr,
            data_dir = %self.state.config().data_dir.display(),
            static_roots = self.state.config().static_roots.len(),
            auth = self.state.config().api_key.is_some(),
            "Folio server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        info!("Folio server shut down");
        Ok(())
    }

    /// Create the router without starting the server.
    ///
    /// Useful for testing or embedding in another server.
    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }
}

async fn bind_addr(addr: SocketAddr) -> ApiResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::BindFailed(addr, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_test_server(config: ServerConfig) -> (FolioServer, TempDir) {
        let dir = TempDir::new().unwrap();
        let server = FolioServer::new(config.with_data_dir(dir.path())).unwrap();
        (server, dir)
    }

    #[test]
    fn test_server_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("nested/data");

        let server = FolioServer::new(ServerConfig::default().with_data_dir(&data_dir));

        assert!(server.is_ok());
        assert!(data_dir.is_dir());
    }

    #[test]
    fn test_server_clone_shares_state() {
        let (server, _dir) = make_test_server(ServerConfig::default());
        let cloned = server.clone();

        assert!(Arc::ptr_eq(&server.state(), &cloned.state()));
    }

    #[tokio::test]
    async fn test_bind_falls_back_when_port_taken() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let taken_addr = taken.local_addr().unwrap();
        let spare = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let spare_port = spare.local_addr().unwrap().port();
        drop(spare);

        let config = ServerConfig::new(taken_addr).with_fallback_port(Some(spare_port));
        let (server, _dir) = make_test_server(config);

        let listener = server.bind().await.unwrap();
        assert_eq!(listener.local_addr().unwrap().port(), spare_port);
    }

    #[tokio::test]
    async fn test_bind_fails_without_fallback() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig::new(taken.local_addr().unwrap()).with_fallback_port(None);
        let (server, _dir) = make_test_server(config);

        let result = server.bind().await;
        assert!(matches!(result, Err(ApiError::BindFailed(_, _))));
    }

    #[tokio::test]
    async fn test_serve_with_shutdown() {
        let config = ServerConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)));
        let (server, _dir) = make_test_server(config);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server_handle = tokio::spawn(async move {
            server
                .serve_with_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let _ = shutdown_tx.send(());

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), server_handle).await;
        assert!(result.is_ok());
    }
}
