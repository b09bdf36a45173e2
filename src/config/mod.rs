//! Configuration
//!
//! Layered configuration: built-in defaults, an optional TOML file, then
//! `TREECACHE__*` environment variables (highest precedence).

mod facade;
pub mod sources;

pub use facade::ConfigLoader;

use crate::logging::LoggingConfig;
use crate::types::IdStrategy;
use serde::{Deserialize, Serialize};

fn default_channel_capacity() -> usize {
    64
}

/// Store worker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// How permanent identifiers are minted
    #[serde(default)]
    pub id_strategy: IdStrategy,

    /// Bound of the store worker's request queue
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id_strategy: IdStrategy::default(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeCacheConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}
