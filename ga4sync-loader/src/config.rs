use ga4sync_config::load_config;
use ga4sync_config::shared::LoaderConfig;

use crate::error::{LoaderError, LoaderResult};

/// Loads and validates the loader configuration.
///
/// Uses the standard layered loading mechanism from [`ga4sync_config`] and
/// validates the resulting [`LoaderConfig`] before returning it, so a broken
/// configuration aborts the run before any I/O.
pub fn load_loader_config() -> LoaderResult<LoaderConfig> {
    let config = load_config::<LoaderConfig>().map_err(LoaderError::config)?;
    config.validate().map_err(LoaderError::config)?;

    Ok(config)
}
