//! Redis-backed balance cache
//!
//! Values are the serialized balance DTOs, stored with `SET EX` so Redis
//! expires them on its own.

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info};

use super::traits::BalanceCache;
use crate::error::{PensionError, Result};

#[derive(Clone)]
pub struct RedisBalanceCache {
    pool: Pool,
}

impl RedisBalanceCache {
    pub fn from_url(redis_url: &str) -> Result<Self> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| PensionError::Cache(format!("failed to create redis pool: {}", e)))?;
        info!("Redis balance cache configured");
        Ok(Self { pool })
    }

    /// Round-trip a PING to fail fast on a bad URL
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl BalanceCache for RedisBalanceCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.get(key).await?;
        debug!(key, hit = value.is_some(), "redis cache lookup");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.pool.get().await?;
        // SET EX rejects a zero expiry
        let secs = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let removed: u64 = conn.del(key).await?;
        debug!(key, removed, "redis cache invalidation");
        Ok(())
    }
}
