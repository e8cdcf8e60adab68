//! Backend Selector
//!
//! Chooses exactly one driver at startup. Priority: remote REST store, then
//! the native store, then the in-process map. A failure to build or connect
//! an external driver degrades to the in-process one instead of aborting.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::BackendConfig;
use crate::driver::{KvDriver, MemoryDriver, RedisDriver, RestDriver};

/// Builds the driver for this process from the given configuration.
pub async fn select_driver(config: &BackendConfig) -> Arc<dyn KvDriver> {
    if let Some((url, token)) = config.rest() {
        match RestDriver::new(url, token) {
            Ok(driver) => {
                info!(backend = "rest", "Using remote REST store");
                return Arc::new(driver);
            }
            Err(e) => error!(error = %e, "REST store unusable, trying next backend"),
        }
    } else if config.rest_url.is_some() || config.rest_token.is_some() {
        warn!("REST store needs both a URL and a token; ignoring partial configuration");
    }

    if let Some(url) = config.redis() {
        match RedisDriver::connect(url).await {
            Ok(driver) => {
                info!(backend = "redis", "Using native store");
                return Arc::new(driver);
            }
            Err(e) => {
                error!(error = %e, "Native store unavailable, falling back to in-process cache")
            }
        }
    }

    info!(backend = "memory", "Using in-process store");
    Arc::new(MemoryDriver::new())
}
