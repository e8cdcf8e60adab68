//! Configuration Module
//!
//! Handles loading backend and server configuration from environment variables.

use std::env;

/// Connection settings used to pick the backend driver.
///
/// Empty values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    /// Remote REST store endpoint
    pub rest_url: Option<String>,
    /// Bearer token for the remote REST store
    pub rest_token: Option<String>,
    /// Native protocol connection URL (e.g. `redis://localhost:6379`)
    pub redis_url: Option<String>,
}

impl BackendConfig {
    /// Reads backend settings from the environment.
    ///
    /// # Environment Variables
    /// - `UPSTASH_REDIS_REST_URL` / `UPSTASH_REDIS_REST_TOKEN` - remote REST store
    /// - `REDIS_URL` - native protocol store
    pub fn from_env() -> Self {
        Self {
            rest_url: non_empty_var("UPSTASH_REDIS_REST_URL"),
            rest_token: non_empty_var("UPSTASH_REDIS_REST_TOKEN"),
            redis_url: non_empty_var("REDIS_URL"),
        }
    }

    /// Config that always selects the in-process driver.
    pub fn in_process() -> Self {
        Self::default()
    }

    /// Returns the REST endpoint and token when both are present.
    pub fn rest(&self) -> Option<(&str, &str)> {
        match (self.rest_url.as_deref(), self.rest_token.as_deref()) {
            (Some(url), Some(token)) if !url.is_empty() && !token.is_empty() => Some((url, token)),
            _ => None,
        }
    }

    /// Returns the native connection URL when present.
    pub fn redis(&self) -> Option<&str> {
        self.redis_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Server configuration parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend selection inputs
    pub backend: BackendConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Requests allowed per client within one window
    pub rate_limit_max: u32,
    /// Rate-limit window length in seconds
    pub rate_limit_window: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `RATE_LIMIT_MAX` - Requests per window per client (default: 100)
    /// - `RATE_LIMIT_WINDOW` - Window in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: BackendConfig::from_env(),
            server_port: parsed_var("SERVER_PORT").unwrap_or(defaults.server_port),
            rate_limit_max: parsed_var("RATE_LIMIT_MAX").unwrap_or(defaults.rate_limit_max),
            rate_limit_window: parsed_var("RATE_LIMIT_WINDOW")
                .unwrap_or(defaults.rate_limit_window),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            server_port: 3000,
            rate_limit_max: 100,
            rate_limit_window: 60,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.rate_limit_max, 100);
        assert_eq!(config.rate_limit_window, 60);
        assert_eq!(config.backend, BackendConfig::in_process());
    }

    #[test]
    fn test_rest_requires_url_and_token() {
        let config = BackendConfig {
            rest_url: Some("https://kv.example.com".to_string()),
            rest_token: None,
            redis_url: None,
        };
        assert!(config.rest().is_none());

        let config = BackendConfig {
            rest_token: Some("secret".to_string()),
            ..config
        };
        assert_eq!(config.rest(), Some(("https://kv.example.com", "secret")));
    }

    #[test]
    fn test_empty_values_are_absent() {
        let config = BackendConfig {
            rest_url: Some(String::new()),
            rest_token: Some("token".to_string()),
            redis_url: Some(String::new()),
        };
        assert!(config.rest().is_none());
        assert!(config.redis().is_none());
    }
}
