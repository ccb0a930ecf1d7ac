//! Backend-connection config loading for browser builds.

use platform_host::{
    resolve_backend_config, BackendConfig, ConfigError, ConfigSource, PartialBackendConfig,
};

use crate::bridge::page;

/// Reads `window.firebaseConfig`. Missing or non-object globals read as an empty source.
pub fn runtime_backend_config() -> PartialBackendConfig {
    page::runtime_backend_config()
        .map(|value| PartialBackendConfig::from_json(&value))
        .unwrap_or_default()
}

/// Resolves the backend config from the build environment, then the runtime global.
///
/// # Errors
///
/// Returns [`ConfigError`] when neither source is complete.
pub fn load_backend_config() -> Result<(BackendConfig, ConfigSource), ConfigError> {
    resolve_backend_config([
        (
            ConfigSource::BuildEnvironment,
            PartialBackendConfig::from_build_env(),
        ),
        (ConfigSource::RuntimeGlobal, runtime_backend_config()),
    ])
}
