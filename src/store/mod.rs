//! Record Store
//!
//! Authoritative, versioned record storage. The cache only ever talks to it
//! through [`StoreGateway`], so a store living behind a real network boundary
//! can replace [`StoreHandle`] without touching the cache.

pub mod handle;
pub mod memory;
mod seed;

pub use handle::StoreHandle;
pub use memory::InMemoryStore;

use crate::error::StorageError;
use crate::model::{ApplyResult, ChangeBatch, Forest, Record};
use crate::types::ElementId;
use async_trait::async_trait;

/// Store interface as seen by the cache
#[async_trait]
pub trait StoreGateway: Send + Sync {
    async fn fetch(&self, id: ElementId) -> Result<Option<Record>, StorageError>;
    async fn apply_batch(&self, batch: ChangeBatch) -> Result<ApplyResult, StorageError>;
    async fn full_snapshot(&self) -> Result<Forest, StorageError>;
    async fn reset_to_defaults(&self) -> Result<(), StorageError>;
}
