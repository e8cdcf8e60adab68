//! Key-value client: the single process-wide handle on the selected driver.
//!
//! Construct one at startup and share it (`Arc<KvClient>`) with every
//! service that needs the store.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::config::BackendConfig;
use crate::driver::{BackendKind, KvDriver};
use crate::selector::select_driver;

/// Owns backend selection and the active driver for the process lifetime.
pub struct KvClient {
    config: BackendConfig,
    driver: OnceCell<Arc<dyn KvDriver>>,
}

impl std::fmt::Debug for KvClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvClient")
            .field("backend", &self.backend())
            .finish()
    }
}

impl KvClient {
    /// Creates an unconnected client. Selection happens on first [`connect`](Self::connect).
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            driver: OnceCell::new(),
        }
    }

    /// Creates a client that is already bound to `driver`.
    pub fn with_driver(driver: Arc<dyn KvDriver>) -> Self {
        Self {
            config: BackendConfig::default(),
            driver: OnceCell::new_with(Some(driver)),
        }
    }

    /// Selects and connects the backend once; later calls return the same driver.
    ///
    /// Concurrent first calls wait on a single selection, so at most one
    /// connection is ever opened.
    pub async fn connect(&self) -> Arc<dyn KvDriver> {
        self.driver
            .get_or_init(|| select_driver(&self.config))
            .await
            .clone()
    }

    /// Backend in use, or `None` before the first connect.
    pub fn backend(&self) -> Option<BackendKind> {
        self.driver.get().map(|driver| driver.kind())
    }

    /// Liveness check against the active backend. Never errors.
    pub async fn health_check(&self) -> bool {
        let driver = self.connect().await;
        match driver.ping().await {
            Ok(alive) => alive,
            Err(e) => {
                error!(backend = %driver.kind(), error = %e, "Health check failed");
                false
            }
        }
    }

    /// Releases the backend connection if one was opened.
    pub async fn disconnect(&self) {
        let Some(driver) = self.driver.get() else {
            return;
        };
        match driver.disconnect().await {
            Ok(()) => info!(backend = %driver.kind(), "Disconnected from backend"),
            Err(e) => error!(backend = %driver.kind(), error = %e, "Disconnect failed"),
        }
    }
}
