//! Environment variable source: TREECACHE prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub const ENV_PREFIX: &str = "TREECACHE";

/// Add environment variable overlay to builder.
/// `TREECACHE__STORE__ID_STRATEGY=sequential` sets `store.id_strategy`.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    )
}
