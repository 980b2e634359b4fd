//! Login throttling keyed by normalised email
//!
//! Each key gets a fixed window of attempts. Going over the limit locks the
//! key out for a while; a successful login clears it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Attempt budget per key
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub max_attempts: u32,
    pub window: Duration,
    pub lockout: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(5 * 60),
            lockout: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Counting { attempts: u32, since: Instant },
    LockedOut { until: Instant },
}

/// Shared attempt counters
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count an attempt for `key`; false while the key is locked out
    pub async fn is_allowed(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;

        let next = match slots.get(key).copied() {
            Some(Slot::LockedOut { until }) if now < until => return false,
            Some(Slot::Counting { attempts, since })
                if now.duration_since(since) < self.config.window =>
            {
                if attempts >= self.config.max_attempts {
                    warn!(
                        "Locking out {} for {}s after {} attempts",
                        key,
                        self.config.lockout.as_secs(),
                        attempts
                    );
                    slots.insert(
                        key.to_string(),
                        Slot::LockedOut {
                            until: now + self.config.lockout,
                        },
                    );
                    return false;
                }
                Slot::Counting {
                    attempts: attempts + 1,
                    since,
                }
            }
            _ => Slot::Counting {
                attempts: 1,
                since: now,
            },
        };

        slots.insert(key.to_string(), next);
        true
    }

    /// Forget every attempt recorded for `key`
    pub async fn reset(&self, key: &str) {
        self.slots.lock().await.remove(key);
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}
