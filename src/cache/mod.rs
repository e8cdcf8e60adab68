//! Cache Module
//!
//! JSON cache service with cache-aside, pattern invalidation and hash
//! helpers, plus hit/miss statistics.

mod service;
mod stats;

// Re-export public types
pub use service::{CacheService, DEFAULT_CACHE_TTL};
pub use stats::{CacheStats, StatsSnapshot};
