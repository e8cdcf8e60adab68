//! API Module
//!
//! HTTP handlers, rate-limit middleware and routing for the operational
//! surface of the cache layer.
//!
//! # Endpoints
//! - `PUT /cache` - Store a JSON value
//! - `DELETE /cache?pattern=...` - Invalidate by glob pattern
//! - `GET /cache/:key` - Retrieve a value by key
//! - `DELETE /cache/:key` - Delete a key
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
