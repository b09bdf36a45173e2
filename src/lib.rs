//! Treecache: Lazily Materialized Tree Cache
//!
//! A versioned, tree-shaped record store and a client-side working copy that
//! loads records on demand, buffers edits offline and reconciles them against
//! the store in one atomic batch, reporting per-record conflicts.

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;
pub mod tooling;
pub mod types;
pub mod views;

pub use cache::{DeclineReason, Node, PendingSummary, Staged, TreeCache};
pub use error::{ApiError, StorageError};
pub use model::{ApplyResult, ChangeBatch, ConflictKind, Draft, Forest, PendingUpdate, Record, TreeItem};
pub use store::{InMemoryStore, StoreGateway, StoreHandle};
pub use types::{ElementId, NodeKey, TempId, Version};
