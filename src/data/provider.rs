use async_trait::async_trait;
use thiserror::Error;

use super::types::{AppConfig, AppInfo, Value, ValueMap};

/// Errors that can occur during provider operations.
/// Variants carry plain strings so they can ride inside messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// No definition exists for the requested app or preset.
    #[error("not found: {0}")]
    NotFound(String),
    /// The key is not declared by the app definition.
    #[error("{app} has no field '{key}'")]
    UnknownKey { app: String, key: String },
    /// Reading or writing the backing store failed.
    #[error("I/O error: {0}")]
    Io(String),
    /// The backing store holds something we cannot read.
    #[error("parse error: {0}")]
    Parse(String),
    /// The provider is not usable at all (missing directory, etc.).
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for ProviderError {
    fn from(e: std::io::Error) -> Self {
        ProviderError::Io(e.to_string())
    }
}

/// The data collaborator. Only ever called from command workers, never
/// synchronously from `update()`.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Returns the name of the provider.
    fn name(&self) -> &str;

    /// Every app this provider can edit, sorted by name, with its status.
    async fn list_apps(&self) -> Result<Vec<AppInfo>, ProviderError>;

    /// The field and preset definitions for one app.
    async fn load_config(&self, app: &str) -> Result<AppConfig, ProviderError>;

    /// The values currently persisted for one app.
    async fn get_current_values(&self, app: &str) -> Result<ValueMap, ProviderError>;

    /// Persist a single key.
    async fn apply_change(&self, app: &str, key: &str, value: &Value)
    -> Result<(), ProviderError>;

    /// Persist several keys at once. Every key is checked before anything is
    /// written; on error nothing is persisted.
    async fn apply_changes(
        &self,
        app: &str,
        changes: &[(String, Value)],
    ) -> Result<(), ProviderError>;

    /// Names of the presets declared for one app.
    async fn list_presets(&self, app: &str) -> Result<Vec<String>, ProviderError>;

    /// Persist every value of a preset and return the resulting values.
    async fn apply_preset(&self, app: &str, preset: &str) -> Result<ValueMap, ProviderError>;
}
