//! Backend-connection configuration model and source resolution.
//!
//! The realtime backend is configured by a Firebase-style web config object. Values can be baked
//! in at build time through `MULTIXP_FIREBASE_*` environment variables or injected at runtime as
//! `window.firebaseConfig`. A source only counts when every required field is present, non-blank,
//! and not an unreplaced `%TEMPLATE%` token. There is no built-in fallback config.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Complete backend-connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Public API key.
    pub api_key: String,
    /// Auth domain.
    pub auth_domain: String,
    /// Realtime database URL.
    #[serde(rename = "databaseURL")]
    pub database_url: String,
    /// Project identifier.
    pub project_id: String,
    /// Storage bucket.
    pub storage_bucket: String,
    /// Messaging sender identifier.
    pub messaging_sender_id: String,
    /// Web app identifier.
    pub app_id: String,
}

/// Where a backend config was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Compile-time `MULTIXP_FIREBASE_*` variables.
    BuildEnvironment,
    /// The page-level `window.firebaseConfig` global.
    RuntimeGlobal,
}

impl ConfigSource {
    /// Returns a stable label for diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuildEnvironment => "build-environment",
            Self::RuntimeGlobal => "runtime-global",
        }
    }
}

/// Typed error produced when no complete backend config is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No source provided any value at all.
    NotProvided,
    /// The most complete source still lacked these fields.
    Missing {
        /// Wire names of the missing fields.
        fields: Vec<&'static str>,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotProvided => write!(f, "realtime backend configuration was not provided"),
            Self::Missing { fields } => write!(
                f,
                "realtime backend configuration is missing required fields: {}",
                fields.join(", ")
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Backend config fields as read from one source, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialBackendConfig {
    /// `apiKey`.
    pub api_key: Option<String>,
    /// `authDomain`.
    pub auth_domain: Option<String>,
    /// `databaseURL`.
    pub database_url: Option<String>,
    /// `projectId`.
    pub project_id: Option<String>,
    /// `storageBucket`.
    pub storage_bucket: Option<String>,
    /// `messagingSenderId`.
    pub messaging_sender_id: Option<String>,
    /// `appId`.
    pub app_id: Option<String>,
}

impl PartialBackendConfig {
    /// Reads the fields baked in through `MULTIXP_FIREBASE_*` build-time variables.
    pub fn from_build_env() -> Self {
        let field = |value: Option<&'static str>| value.map(str::to_string);
        Self {
            api_key: field(option_env!("MULTIXP_FIREBASE_API_KEY")),
            auth_domain: field(option_env!("MULTIXP_FIREBASE_AUTH_DOMAIN")),
            database_url: field(option_env!("MULTIXP_FIREBASE_DATABASE_URL")),
            project_id: field(option_env!("MULTIXP_FIREBASE_PROJECT_ID")),
            storage_bucket: field(option_env!("MULTIXP_FIREBASE_STORAGE_BUCKET")),
            messaging_sender_id: field(option_env!("MULTIXP_FIREBASE_MESSAGING_SENDER_ID")),
            app_id: field(option_env!("MULTIXP_FIREBASE_APP_ID")),
        }
    }

    /// Reads fields from a JSON config object. Non-string fields are treated as absent.
    pub fn from_json(value: &Value) -> Self {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            api_key: field("apiKey"),
            auth_domain: field("authDomain"),
            database_url: field("databaseURL"),
            project_id: field("projectId"),
            storage_bucket: field("storageBucket"),
            messaging_sender_id: field("messagingSenderId"),
            app_id: field("appId"),
        }
    }

    fn fields(&self) -> [(&'static str, Option<&String>); 7] {
        [
            ("apiKey", self.api_key.as_ref()),
            ("authDomain", self.auth_domain.as_ref()),
            ("databaseURL", self.database_url.as_ref()),
            ("projectId", self.project_id.as_ref()),
            ("storageBucket", self.storage_bucket.as_ref()),
            ("messagingSenderId", self.messaging_sender_id.as_ref()),
            ("appId", self.app_id.as_ref()),
        ]
    }

    /// Returns whether no field carries a usable value.
    pub fn is_empty(&self) -> bool {
        self.missing_fields().len() == 7
    }

    /// Lists the wire names of fields that are absent, blank, or unreplaced placeholders.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| !value.is_some_and(|value| is_usable_value(value)))
            .map(|(name, _)| name)
            .collect()
    }

    /// Validates this source into a complete [`BackendConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] listing every unusable field.
    pub fn complete(self) -> Result<BackendConfig, ConfigError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ConfigError::Missing { fields: missing });
        }
        let take = |value: Option<String>| value.map(|v| v.trim().to_string()).unwrap_or_default();
        Ok(BackendConfig {
            api_key: take(self.api_key),
            auth_domain: take(self.auth_domain),
            database_url: take(self.database_url),
            project_id: take(self.project_id),
            storage_bucket: take(self.storage_bucket),
            messaging_sender_id: take(self.messaging_sender_id),
            app_id: take(self.app_id),
        })
    }
}

/// Returns whether a config value is non-blank and not a `%TEMPLATE%` token left by a deploy step.
pub fn is_usable_value(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    !(trimmed.len() > 1 && trimmed.starts_with('%') && trimmed.ends_with('%'))
}

/// Picks the first complete config from `sources`, in order.
///
/// # Errors
///
/// Returns [`ConfigError::NotProvided`] when every source is empty, otherwise
/// [`ConfigError::Missing`] for the source with the fewest missing fields.
pub fn resolve_backend_config(
    sources: impl IntoIterator<Item = (ConfigSource, PartialBackendConfig)>,
) -> Result<(BackendConfig, ConfigSource), ConfigError> {
    let mut best_missing: Option<Vec<&'static str>> = None;
    for (source, partial) in sources {
        if partial.is_empty() {
            continue;
        }
        match partial.complete() {
            Ok(config) => return Ok((config, source)),
            Err(ConfigError::Missing { fields }) => {
                let better = best_missing
                    .as_ref()
                    .map_or(true, |best| fields.len() < best.len());
                if better {
                    best_missing = Some(fields);
                }
            }
            Err(ConfigError::NotProvided) => {}
        }
    }
    Err(best_missing.map_or(ConfigError::NotProvided, |fields| ConfigError::Missing {
        fields,
    }))
}
