//! Key-value substrate
//!
//! Responsibilities:
//! - Define the async store contract (`KvStore`) the filesystem persists
//!   through: ready/get/set/remove/keys over raw byte values.
//! - Hand out one store per namespace (`KvBackend`); the filesystem opens
//!   three namespaces per identifier (content, metadata, version).
//!
//! Submodules:
//! - `memory`: in-process ordered map, used for tests and ephemeral mounts
//! - `localfs`: one directory per namespace, one file per key
pub mod localfs;
pub mod memory;

use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::Arc;

pub use localfs::{LocalFsBackend, LocalFsStore};
pub use memory::{MemoryBackend, MemoryStore};

/// Abstract async key-value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Completes once the store can serve requests.
    async fn ready(&self) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Durable write; replaces any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Durable delete. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All stored keys in ascending order.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Source of namespaced stores. Opening the same namespace twice yields
/// handles over the same data.
pub trait KvBackend: Send + Sync {
    fn open(&self, namespace: &str) -> Arc<dyn KvStore>;
}
