//! Remote REST store driver.
//!
//! Every command is a stateless HTTPS request: `POST {url}` with the command
//! as a JSON array and a bearer token. Replies look like `{"result": ...}` or
//! `{"error": "..."}`. Multi-command batches go to `{url}/multi-exec`, which
//! runs them as one transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::native::{COMMAND_TIMEOUT, CONNECT_TIMEOUT};
use super::{BackendKind, KvDriver};
use crate::error::{CacheError, Result};

/// Single command reply envelope.
#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Driver for the remote REST-based store. Holds no persistent connection.
#[derive(Debug, Clone)]
pub struct RestDriver {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestDriver {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(COMMAND_TIMEOUT)
            .build()
            .map_err(|e| CacheError::Connection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Sends one command and unwraps its `result`.
    async fn command(&self, args: &[&str]) -> Result<Value> {
        let op = args.first().copied().unwrap_or_default();
        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await?;

        let status = response.status();
        let reply: Reply = response.json().await.map_err(|e| {
            CacheError::Protocol(format!("{} returned unreadable body ({}): {}", op, status, e))
        })?;

        debug!(op = op, status = %status, "REST command");
        unwrap_reply(op, reply)
    }

    /// Sends a batch to the transaction endpoint, returning each result in order.
    async fn transaction(&self, commands: &[Vec<String>]) -> Result<Vec<Value>> {
        let response = self
            .http
            .post(format!("{}/multi-exec", self.base_url))
            .bearer_auth(&self.token)
            .json(commands)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            CacheError::Protocol(format!("multi-exec returned unreadable body ({}): {}", status, e))
        })?;

        // A rejected transaction comes back as a single error envelope.
        if !body.is_array() {
            let reply: Reply = serde_json::from_value(body)?;
            return Err(unwrap_reply("MULTI", reply)
                .err()
                .unwrap_or_else(|| CacheError::Protocol("multi-exec returned no array".into())));
        }
        let replies: Vec<Reply> = serde_json::from_value(body)?;

        replies
            .into_iter()
            .map(|reply| unwrap_reply("MULTI", reply))
            .collect()
    }
}

fn unwrap_reply(op: &str, reply: Reply) -> Result<Value> {
    match reply.error {
        Some(message) if is_unsupported(&message) => {
            Err(CacheError::Unsupported(format!("{}: {}", op, message)))
        }
        Some(message) => Err(CacheError::Protocol(format!("{}: {}", op, message))),
        None => Ok(reply.result),
    }
}

fn is_unsupported(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["unknown command", "not allowed", "not supported", "disabled"]
        .iter()
        .any(|needle| message.contains(needle))
}

// == Reply Conversions ==

fn to_opt_string(value: Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(CacheError::Protocol(format!("expected string, got {}", other))),
    }
}

fn to_i64(value: Value) -> Result<i64> {
    match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| CacheError::Protocol(format!("expected integer, got {}", value)))
}

fn to_strings(value: Value) -> Result<Vec<String>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| to_opt_string(item).map(Option::unwrap_or_default))
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(CacheError::Protocol(format!("expected array, got {}", other))),
    }
}

/// HGETALL replies are a flat `[field, value, field, value, ...]` array.
fn to_field_map(value: Value) -> Result<HashMap<String, String>> {
    let flat = to_strings(value)?;
    if flat.len() % 2 != 0 {
        return Err(CacheError::Protocol("HGETALL returned an odd number of items".into()));
    }
    Ok(flat
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}

#[async_trait]
impl KvDriver for RestDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Rest
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        to_opt_string(self.command(&["GET", key]).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        match ttl_seconds {
            Some(0) => self.del(key).await,
            Some(ttl) => {
                let ttl = ttl.to_string();
                self.command(&["SET", key, value, "EX", ttl.as_str()]).await.map(drop)
            }
            None => self.command(&["SET", key, value]).await.map(drop),
        }
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.command(&["DEL", key]).await.map(drop)
    }

    async fn del_many(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut args = vec!["DEL"];
        args.extend(keys.iter().map(String::as_str));
        let deleted = to_i64(self.command(&args).await?)?;
        Ok(u64::try_from(deleted).unwrap_or(0))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(to_i64(self.command(&["EXISTS", key]).await?)? > 0)
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        to_i64(self.command(&["TTL", key]).await?)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        let seconds = seconds.to_string();
        Ok(to_i64(self.command(&["EXPIRE", key, seconds.as_str()]).await?)? == 1)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        to_opt_string(self.command(&["HGET", key, field]).await?)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.command(&["HSET", key, field, value]).await.map(drop)
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        self.command(&["HDEL", key, field]).await.map(drop)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        to_field_map(self.command(&["HGETALL", key]).await?)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        to_strings(self.command(&["KEYS", pattern]).await?)
    }

    async fn slide_window(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        member: &str,
    ) -> Result<u64> {
        let window_start = now_ms - window_ms;
        let commands = vec![
            vec![
                "ZREMRANGEBYSCORE".to_string(),
                key.to_string(),
                "0".to_string(),
                window_start.to_string(),
            ],
            vec!["ZCARD".to_string(), key.to_string()],
            vec![
                "ZADD".to_string(),
                key.to_string(),
                now_ms.to_string(),
                member.to_string(),
            ],
            vec!["PEXPIRE".to_string(), key.to_string(), window_ms.to_string()],
        ];

        let mut results = self.transaction(&commands).await?;
        if results.len() != commands.len() {
            return Err(CacheError::Protocol(format!(
                "multi-exec returned {} results for {} commands",
                results.len(),
                commands.len()
            )));
        }
        let count = to_i64(results.swap_remove(1))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn ping(&self) -> Result<bool> {
        let pong = to_opt_string(self.command(&["PING"]).await?)?;
        Ok(pong.as_deref() == Some("PONG"))
    }
}
