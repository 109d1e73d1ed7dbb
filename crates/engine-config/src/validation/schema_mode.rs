use crate::settings::{error::SettingsError, validated::CdcSettings};
use model::catalog::ConfiguredCatalog;
use tracing::debug;

/// Checks that the configured schema mode agrees with the catalog and with the
/// mode the previous run's records were produced under.
///
/// `saved_enforced` is `None` on a first run, in which case only configuration
/// and catalog are compared. An empty catalog cannot disagree with anything.
pub fn check_schema_mode(
    settings: &CdcSettings,
    catalog: &ConfiguredCatalog,
    saved_enforced: Option<bool>,
) -> Result<(), SettingsError> {
    let config = settings.is_schema_enforced();
    let catalog_enforced = if catalog.streams.is_empty() {
        config
    } else {
        !catalog.is_schemaless()
    };
    let state = saved_enforced.unwrap_or(config);

    debug!(config, catalog = catalog_enforced, state, "Checking schema mode");

    if config == catalog_enforced && config == state {
        return Ok(());
    }

    let remedy = if config == catalog_enforced {
        "Please reset your data."
    } else {
        "Please refresh source schema and reset streams."
    };

    Err(SettingsError::SchemaModeMismatch {
        config,
        catalog: catalog_enforced,
        state,
        remedy: remedy.to_string(),
    })
}
