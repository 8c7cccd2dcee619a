//! Fleet configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.botfleet/` in
//! production) and deserializes it into [`FleetConfig`]. Falls back to the
//! production-cadence defaults when the file is missing or malformed, so a
//! fresh deployment runs with no config at all.

use std::path::Path;

use botfleet_types::config::FleetConfig;

use crate::sqlite::pool::default_database_url;

/// Load fleet configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`FleetConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_fleet_config(data_dir: &Path) -> FleetConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return FleetConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return FleetConfig::default();
        }
    };

    match toml::from_str::<FleetConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            FleetConfig::default()
        }
    }
}

/// Resolve the database URL: explicit config first, then the data-directory
/// default.
pub fn resolve_database_url(config: &FleetConfig) -> String {
    config
        .database_url
        .clone()
        .unwrap_or_else(default_database_url)
}
