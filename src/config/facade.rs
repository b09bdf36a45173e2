//! ConfigLoader facade over the `config` crate.

use super::sources::environment;
use super::TreeCacheConfig;
use crate::error::ApiError;
use config::{Config, File};
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from defaults and environment.
    pub fn load() -> Result<TreeCacheConfig, ApiError> {
        let builder = environment::add_to_builder(Config::builder());
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<TreeCacheConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = Config::builder().add_source(File::from(path));
        let builder = environment::add_to_builder(builder);
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load from `path` when given, otherwise from the environment only.
    pub fn resolve(path: Option<&Path>) -> Result<TreeCacheConfig, ApiError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }
}
