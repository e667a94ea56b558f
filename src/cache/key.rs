//! Cache policy and time-bucketed cache keys

use crate::error::{QueryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// How long a completed execution may be reused, and under which name.
///
/// Requests sharing `key` whose timestamps fall in the same
/// `floor(now / expiry)` window resolve to the same [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    expiry: Duration,
    key: String,
}

impl CachePolicy {
    pub fn new(expiry: Duration, key: impl Into<String>) -> Result<Self> {
        if expiry.as_millis() == 0 {
            return Err(QueryError::InvalidCachePolicy(
                "expiry must be at least one millisecond".to_string(),
            ));
        }
        Ok(Self {
            expiry,
            key: key.into(),
        })
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Index of the time window `at` falls into
    pub fn bucket_at(&self, at: DateTime<Utc>) -> i64 {
        let expiry_ms = i64::try_from(self.expiry.as_millis()).unwrap_or(i64::MAX);
        at.timestamp_millis().div_euclid(expiry_ms)
    }

    pub fn cache_key_at(&self, at: DateTime<Utc>) -> CacheKey {
        CacheKey::derive(self.bucket_at(at), &self.key)
    }

    pub fn cache_key_now(&self) -> CacheKey {
        self.cache_key_at(Utc::now())
    }
}

/// Deterministic identifier of one (bucket, key) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(Uuid);

impl CacheKey {
    /// Name-based UUID over `"{bucket}:{key}"`. The bucket is an integer,
    /// so the first `:` always ends it and no two pairs share a name.
    pub fn derive(bucket: i64, key: &str) -> Self {
        let name = format!("{}:{}", bucket, key);
        CacheKey(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
