//! Native Driver Tests
//!
//! Needs a running server: set `TEST_REDIS_URL` (e.g. `redis://127.0.0.1:6379`).
//! Every test returns early when it is unset. Keys are namespaced per test
//! run so parallel tests and leftovers do not collide.

use std::sync::Arc;
use std::time::Duration;

use cache_layer::driver::{KvDriver, RedisDriver};
use cache_layer::{BackendConfig, BackendKind, CacheService, KvClient, RateLimiter};
use serde_json::{json, Value};

async fn client() -> Option<Arc<KvClient>> {
    let url = std::env::var("TEST_REDIS_URL").ok()?;
    let driver = RedisDriver::connect(&url).await.ok()?;
    Some(Arc::new(KvClient::with_driver(Arc::new(driver))))
}

fn namespace() -> String {
    format!("cache_layer_test:{}:", rand::random::<u32>())
}

#[tokio::test]
async fn test_selector_connects_native() {
    let Ok(url) = std::env::var("TEST_REDIS_URL") else {
        return;
    };
    let client = KvClient::new(BackendConfig {
        rest_url: None,
        rest_token: None,
        redis_url: Some(url),
    });

    assert_eq!(client.connect().await.kind(), BackendKind::Redis);
    assert!(client.health_check().await);

    client.disconnect().await;
    assert!(!client.health_check().await);
}

#[tokio::test]
async fn test_json_round_trip_and_expiry() {
    let Some(client) = client().await else {
        return;
    };
    let ns = namespace();
    let cache = CacheService::new(client);

    let key = format!("{}user", ns);
    cache.set_json(&key, &json!({"name": "Ann"}), Some(60)).await;
    assert_eq!(cache.get_json::<Value>(&key).await, Some(json!({"name": "Ann"})));

    let temp = format!("{}temp", ns);
    cache.set_json(&temp, &1, Some(1)).await;
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(cache.get_json::<Value>(&temp).await, None);

    cache.del(&key).await;
}

#[tokio::test]
async fn test_invalidate_pattern() {
    let Some(client) = client().await else {
        return;
    };
    let ns = namespace();
    let cache = CacheService::new(client);

    for suffix in ["user:1", "user:2", "order:1"] {
        cache.set_json(&format!("{}{}", ns, suffix), &true, Some(60)).await;
    }

    assert_eq!(cache.invalidate_pattern(&format!("{}user:*", ns)).await, 2);
    assert!(cache.exists(&format!("{}order:1", ns)).await);

    cache.invalidate_pattern(&format!("{}*", ns)).await;
}

#[tokio::test]
async fn test_hashes() {
    let Some(client) = client().await else {
        return;
    };
    let key = format!("{}profile", namespace());
    let driver = client.connect().await;

    driver.hset(&key, "name", "Ann").await.unwrap();
    driver.hset(&key, "role", "admin").await.unwrap();
    driver.hdel(&key, "role").await.unwrap();

    let all = driver.hgetall(&key).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(driver.hget(&key, "name").await.unwrap().as_deref(), Some("Ann"));

    driver.del(&key).await.unwrap();
}

#[tokio::test]
async fn test_rate_limit_sequence() {
    let Some(client) = client().await else {
        return;
    };
    let identity = namespace();
    let limiter = RateLimiter::new(client);

    let mut outcomes = Vec::new();
    for _ in 0..5 {
        let decision = limiter.check(&identity, 3, 60).await;
        outcomes.push((decision.allowed, decision.remaining));
    }

    assert_eq!(
        outcomes,
        [(true, 2), (true, 1), (true, 0), (false, 0), (false, 0)]
    );
}
