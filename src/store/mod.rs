//! Ephemeral key-value store used as a short-lived mailbox.
//!
//! Holds pending OAuth state tokens and freshly obtained token records.
//! Every key may carry a TTL after which it silently disappears.
//!
//! Two backends:
//! - [`MemoryStore`]: single instance, DashMap with lazy expiry
//! - [`RedisStore`]: shared across instances, backed by a deadpool pool
//!
//! Single-consumer semantics rely on [`KvStore::take`] and
//! [`KvStore::delete_if_eq`] being atomic per key.

mod memory;
mod redis_store;

pub use memory::{run_expiry_sweep, MemoryStore};
pub use redis_store::{RedisConfig, RedisStore};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Store backend errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Key-value store with per-key expiration.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value. Expired keys read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one. `None` means no expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Atomically read and remove a value.
    ///
    /// Of several concurrent callers for the same key, at most one sees `Some`.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Atomically remove `key` only if it currently holds `expected`.
    ///
    /// Returns whether the key was removed.
    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool, StoreError>;
}

/// Build the configured store backend.
///
/// Falls back to the in-memory store when Redis is disabled or unreachable.
pub async fn create_store(config: &RedisConfig) -> Arc<dyn KvStore> {
    if !config.enabled {
        tracing::info!("Redis disabled, using in-memory store");
        return memory_store();
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    match RedisStore::connect(config).await {
        Ok(store) => {
            tracing::info!("Connected to Redis");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to in-memory store."
            );
            memory_store()
        }
    }
}

fn memory_store() -> Arc<dyn KvStore> {
    let store = Arc::new(MemoryStore::new());
    tokio::spawn(run_expiry_sweep(Arc::clone(&store), SWEEP_INTERVAL));
    store
}

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
