//! Revoked access tokens
//!
//! A logout revokes the presented token until it would have expired anyway.

use anyhow::Result;
use common::cache::RedisPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::jwt::now_secs;

/// Where revoked tokens are remembered
#[derive(Clone)]
pub enum TokenRevocations {
    /// Shared across replicas; entries expire through Redis TTLs
    Redis(RedisPool),
    /// Process-local; token → expiry in seconds since the epoch
    Memory(Arc<Mutex<HashMap<String, u64>>>),
}

impl TokenRevocations {
    pub fn memory() -> Self {
        TokenRevocations::Memory(Arc::new(Mutex::new(HashMap::new())))
    }

    pub fn redis(pool: RedisPool) -> Self {
        TokenRevocations::Redis(pool)
    }

    fn key(token: &str) -> String {
        format!("revoked_token:{}", token)
    }

    /// Revoke a token that expires at `exp`
    pub async fn revoke(&self, token: &str, exp: u64) -> Result<()> {
        let now = now_secs()?;
        let ttl = exp.saturating_sub(now);
        if ttl == 0 {
            return Ok(());
        }

        match self {
            TokenRevocations::Redis(pool) => pool.set_expiring(&Self::key(token), "1", ttl).await,
            TokenRevocations::Memory(entries) => {
                let mut entries = entries.lock().await;
                entries.retain(|_, expiry| *expiry > now);
                entries.insert(token.to_string(), exp);
                Ok(())
            }
        }
    }

    /// Whether a token has been revoked
    pub async fn is_revoked(&self, token: &str) -> Result<bool> {
        match self {
            TokenRevocations::Redis(pool) => pool.exists(&Self::key(token)).await,
            TokenRevocations::Memory(entries) => {
                let now = now_secs()?;
                let entries = entries.lock().await;
                Ok(entries.get(token).is_some_and(|expiry| *expiry > now))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoked_tokens_are_reported() {
        let revocations = TokenRevocations::memory();
        let exp = now_secs().unwrap() + 600;

        assert!(!revocations.is_revoked("token-a").await.unwrap());
        revocations.revoke("token-a", exp).await.unwrap();
        assert!(revocations.is_revoked("token-a").await.unwrap());
        assert!(!revocations.is_revoked("token-b").await.unwrap());
    }

    #[tokio::test]
    async fn already_expired_tokens_are_not_stored() {
        let revocations = TokenRevocations::memory();
        let exp = now_secs().unwrap() - 1;

        revocations.revoke("stale", exp).await.unwrap();
        match &revocations {
            TokenRevocations::Memory(entries) => assert!(entries.lock().await.is_empty()),
            TokenRevocations::Redis(_) => unreachable!(),
        }
    }
}
