//! Core identifier types for the tree cache.
//!
//! Permanent identifiers are minted by the store; temporary identifiers are
//! minted by the cache for drafts. The two spaces are distinct types so they
//! can only meet through [`NodeKey`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Version: optimistic concurrency token. Persisted records start at 1.
pub type Version = u64;

/// Version carried by a provisional node that the store has not seen yet.
pub const DRAFT_VERSION: Version = 0;

/// ElementId: permanent identifier assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    pub fn from_uuid(raw: Uuid) -> Self {
        ElementId(raw)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// TempId: identifier of a locally drafted, not yet persisted record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TempId(Uuid);

impl TempId {
    /// Mint a fresh temporary identifier (random v4).
    pub fn mint() -> Self {
        TempId(Uuid::new_v4())
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tmp-{}", self.0)
    }
}

/// Key of a node in either identifier space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "space", content = "id", rename_all = "snake_case")]
pub enum NodeKey {
    Permanent(ElementId),
    Temporary(TempId),
}

impl NodeKey {
    pub fn permanent(&self) -> Option<ElementId> {
        match self {
            NodeKey::Permanent(id) => Some(*id),
            NodeKey::Temporary(_) => None,
        }
    }
}

impl From<ElementId> for NodeKey {
    fn from(id: ElementId) -> Self {
        NodeKey::Permanent(id)
    }
}

impl From<TempId> for NodeKey {
    fn from(id: TempId) -> Self {
        NodeKey::Temporary(id)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Permanent(id) => fmt::Display::fmt(id, f),
            NodeKey::Temporary(id) => fmt::Display::fmt(id, f),
        }
    }
}

/// How the store mints permanent identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Random v4 UUIDs
    #[default]
    Random,
    /// Counter-derived UUIDs, reproducible across runs
    Sequential,
}

/// Permanent identifier generator owned by the store
#[derive(Debug, Clone)]
pub struct IdMint {
    strategy: IdStrategy,
    next: u128,
}

impl IdMint {
    pub fn new(strategy: IdStrategy) -> Self {
        Self { strategy, next: 1 }
    }

    /// Restart the sequence (no effect on random minting).
    pub fn reset(&mut self) {
        self.next = 1;
    }

    pub fn mint(&mut self) -> ElementId {
        match self.strategy {
            IdStrategy::Random => ElementId(Uuid::new_v4()),
            IdStrategy::Sequential => {
                let id = ElementId(Uuid::from_u128(self.next));
                self.next += 1;
                id
            }
        }
    }
}
