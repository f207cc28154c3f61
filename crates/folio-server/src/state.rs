//! Shared state for the folio server.

use std::sync::Arc;
use std::time::Instant;

use folio_store::DataStore;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};

/// Shared state for the folio server.
#[derive(Debug)]
pub struct AppState {
    /// Server configuration.
    config: Arc<ServerConfig>,
    /// Backing store for the notes API.
    store: Arc<DataStore>,
    /// Server start time.
    start_time: Instant,
}

impl AppState {
    /// Create a new server state around an opened store.
    pub fn new(config: ServerConfig, store: DataStore) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            start_time: Instant::now(),
        }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a reference to the data store.
    #[must_use]
    pub fn store(&self) -> Arc<DataStore> {
        self.store.clone()
    }

    /// Get server uptime in seconds.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Run a store operation on the blocking thread pool.
    pub async fn with_store<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&DataStore) -> folio_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(ApiError::from)
    }
}
