//! Key/value cache with a time-to-live per entry. Values are stored as JSON so callers
//! can cache any serde type; concurrent writers to the same key resolve last-writer-wins.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use moka::{Expiry, future::Cache};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

const DEFAULT_MAX_ENTRIES: u64 = 10_000;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to serialize cache value: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Clone)]
struct CacheEntry {
    json: Arc<str>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Clone)]
pub struct CacheService {
    cache: Cache<String, CacheEntry>,
    default_ttl: Duration,
}

impl CacheService {
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_capacity(default_ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(default_ttl: Duration, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache, default_ttl }
    }

    /// Cached value for `key`, or `None` when missing, expired or of another shape
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.cache.get(key).await?;
        match serde_json::from_str(&entry.json) {
            Ok(value) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                self.cache.invalidate(key).await;
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let json: Arc<str> = serde_json::to_string(value)?.into();
        self.cache
            .insert(key.to_string(), CacheEntry { json, ttl })
            .await;
        Ok(())
    }

    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Drop every entry whose key starts with `prefix`
    pub async fn invalidate_prefix(&self, prefix: &str) {
        let keys: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();
        for key in keys {
            self.cache.invalidate(key.as_str()).await;
        }
    }
}

/// Prefix shared by every user's artist list
pub const ARTISTS_KEY_PREFIX: &str = "artists:";

/// Key for a user's artist list
pub fn artists_key(user_id: Uuid) -> String {
    format!("{ARTISTS_KEY_PREFIX}{user_id}")
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = CacheService::new(Duration::from_secs(60));
        let profile = Profile {
            name: "Trio".to_string(),
        };
        cache.set("profile:1", &profile).await.unwrap();
        assert_eq!(cache.get::<Profile>("profile:1").await, Some(profile));
        assert_eq!(cache.get::<Profile>("profile:2").await, None);
    }

    #[tokio::test]
    async fn test_entries_expire_after_their_ttl() {
        let cache = CacheService::new(Duration::from_secs(60));
        cache
            .set_with_ttl("short", &1u32, Duration::from_millis(20))
            .await
            .unwrap();
        cache.set("long", &2u32).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.get::<u32>("short").await, None);
        assert_eq!(cache.get::<u32>("long").await, Some(2));
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let cache = CacheService::new(Duration::from_secs(60));
        cache.set("k", &"first").await.unwrap();
        cache.set("k", &"second").await.unwrap();
        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_a_miss() {
        let cache = CacheService::new(Duration::from_secs(60));
        cache.set("k", &"text").await.unwrap();
        assert_eq!(cache.get::<u64>("k").await, None);
        assert_eq!(cache.get::<String>("k").await, None);
    }

    #[tokio::test]
    async fn test_invalidate_prefix() {
        let cache = CacheService::new(Duration::from_secs(60));
        let user = Uuid::new_v4();
        cache.set(&artists_key(user), &vec![1, 2]).await.unwrap();
        cache.set("artists:other", &vec![3]).await.unwrap();
        cache.set("events:1", &vec![4]).await.unwrap();

        cache.invalidate_prefix(ARTISTS_KEY_PREFIX).await;

        assert_eq!(cache.get::<Vec<u32>>(&artists_key(user)).await, None);
        assert_eq!(cache.get::<Vec<u32>>("artists:other").await, None);
        assert_eq!(cache.get::<Vec<u32>>("events:1").await, Some(vec![4]));
    }
}
