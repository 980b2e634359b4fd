//! Redis access
//!
//! The API service keeps short-lived markers here (revoked tokens) so that
//! every replica sees them. Only expiring writes are offered: nothing stored
//! through this client outlives its TTL.

use anyhow::{Result, bail};
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::info;

/// Redis connection settings
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// e.g. `redis://localhost:6379`
    pub url: String,
}

impl RedisConfig {
    /// Reads `REDIS_URL`, defaulting to a local instance
    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Ok(Self { url })
    }
}

/// Cheap to clone; connections are multiplexed per call
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Validates the URL; no connection is made until first use
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client configured for {}", config.url);
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Store `value` under `key` for `ttl_seconds`
    pub async fn set_expiring(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        if ttl_seconds == 0 {
            bail!("refusing to store {key} without a TTL");
        }

        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        Ok(conn.exists(key).await?)
    }

    /// PING round trip
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> RedisConfig {
        RedisConfig {
            url: "redis://localhost:6379".to_string(),
        }
    }

    #[tokio::test]
    async fn accepts_redis_url_without_connecting() {
        assert!(RedisPool::new(&local_config()).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_garbage_url() {
        let config = RedisConfig {
            url: "definitely not redis".to_string(),
        };
        assert!(RedisPool::new(&config).await.is_err());
    }

    #[tokio::test]
    async fn zero_ttl_is_refused_before_connecting() {
        let pool = RedisPool::new(&local_config()).await.unwrap();
        assert!(pool.set_expiring("sponsorhub_no_ttl", "1", 0).await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis instance"]
    async fn expiring_keys_exist_until_their_ttl() -> Result<()> {
        let pool = RedisPool::new(&local_config()).await?;
        assert!(pool.health_check().await?);

        pool.set_expiring("sponsorhub_test_key", "1", 5).await?;
        assert!(pool.exists("sponsorhub_test_key").await?);
        assert!(!pool.exists("sponsorhub_missing_key").await?);

        Ok(())
    }
}
