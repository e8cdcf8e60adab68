//! Cache Layer - a backend-agnostic key-value cache for web services
//!
//! Selects a REST, native Redis, or in-process backend at startup and
//! builds a JSON cache, a sliding-window rate limiter and a session store
//! on top of it.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod rate_limit;
pub mod selector;
pub mod session;

#[cfg(test)]
mod test_support;

pub use api::AppState;
pub use cache::{CacheService, DEFAULT_CACHE_TTL};
pub use client::KvClient;
pub use config::{BackendConfig, Config};
pub use driver::{BackendKind, KvDriver};
pub use error::{CacheError, Result};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use session::SessionStore;
