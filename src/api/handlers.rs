//! API Handlers
//!
//! HTTP request handlers for the operational endpoints. They call the cache
//! layer exactly as any other request path would.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::cache::CacheService;
use crate::client::KvClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, InvalidateParams, InvalidateResponse, SetRequest,
    SetResponse, StatsResponse,
};
use crate::rate_limit::RateLimiter;
use crate::session::SessionStore;

/// Requests allowed per client and window for the HTTP surface.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub window_seconds: u64,
}

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub client: Arc<KvClient>,
    pub cache: CacheService,
    pub limiter: RateLimiter,
    pub sessions: SessionStore,
    pub policy: RateLimitPolicy,
}

impl AppState {
    /// Builds every service over one shared client.
    pub fn new(client: Arc<KvClient>, policy: RateLimitPolicy) -> Self {
        let cache = CacheService::new(client.clone());
        Self {
            limiter: RateLimiter::new(client.clone()),
            sessions: SessionStore::new(cache.clone()),
            cache,
            client,
            policy,
        }
    }

    /// Creates the state from configuration. The backend is selected on
    /// first use, or earlier via `state.client.connect()`.
    pub fn from_config(config: &Config) -> Self {
        let client = Arc::new(KvClient::new(config.backend.clone()));
        Self::new(
            client,
            RateLimitPolicy {
                limit: config.rate_limit_max,
                window_seconds: config.rate_limit_window,
            },
        )
    }
}

/// Handler for PUT /cache
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>, ApiError> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    state.cache.set_json(&req.key, &req.value, req.ttl).await;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>, ApiError> {
    let value: Value = state
        .cache
        .get_json(&key)
        .await
        .ok_or_else(|| ApiError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    state.cache.del(&key).await;
    Json(DeleteResponse::new(key))
}

/// Handler for DELETE /cache?pattern=...
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Query(params): Query<InvalidateParams>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    if params.pattern.is_empty() {
        return Err(ApiError::InvalidRequest("Pattern cannot be empty".to_string()));
    }

    let deleted = state.cache.invalidate_pattern(&params.pattern).await;
    Ok(Json(InvalidateResponse {
        pattern: params.pattern,
        deleted,
    }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        backend: state.client.backend(),
        stats: state.cache.stats(),
    })
}

/// Handler for GET /health
pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let healthy = state.client.health_check().await;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(HealthResponse::new(healthy, state.client.backend())))
}
