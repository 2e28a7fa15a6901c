//! # Commands
//!
//! `update()` never performs I/O. It returns commands, and the event loop
//! hands them to the scheduler. A `Task` runs one provider [`Operation`] on a
//! worker and comes back as exactly one `Message::Completed`, tagged with the
//! epoch it was issued under.

use std::time::Duration;

use crate::core::message::Message;
use crate::data::{AppConfig, AppInfo, DataProvider, ProviderError, Value, ValueMap};

/// Monotonic operation tag. Results whose epoch is no longer in flight are
/// stale and get dropped.
pub type Epoch = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ListApps,
    LoadConfig { app: String },
    SaveChanges { app: String, changes: Vec<(String, Value)> },
    ListPresets { app: String },
    ApplyPreset { app: String, preset: String },
}

/// What a finished operation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Apps(Vec<AppInfo>),
    ConfigLoaded {
        app: String,
        config: AppConfig,
        values: ValueMap,
    },
    Saved {
        app: String,
        keys: Vec<String>,
    },
    Presets {
        app: String,
        presets: Vec<String>,
    },
    PresetApplied {
        app: String,
        preset: String,
        values: ValueMap,
    },
}

/// Operations of the same kind supersede each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ListApps,
    LoadConfig,
    SaveChanges,
    ListPresets,
    ApplyPreset,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::ListApps => OperationKind::ListApps,
            Operation::LoadConfig { .. } => OperationKind::LoadConfig,
            Operation::SaveChanges { .. } => OperationKind::SaveChanges,
            Operation::ListPresets { .. } => OperationKind::ListPresets,
            Operation::ApplyPreset { .. } => OperationKind::ApplyPreset,
        }
    }

    /// Writes are let finish during shutdown; reads are cancelled at once.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::SaveChanges { .. } | Operation::ApplyPreset { .. }
        )
    }

    pub fn label(&self) -> String {
        match self {
            Operation::ListApps => "scan apps".to_string(),
            Operation::LoadConfig { app } => format!("load {app}"),
            Operation::SaveChanges { app, changes } => {
                format!("save {} change(s) to {app}", changes.len())
            }
            Operation::ListPresets { app } => format!("list presets for {app}"),
            Operation::ApplyPreset { app, preset } => format!("apply preset {preset} to {app}"),
        }
    }

    /// Perform the operation against a provider. Runs on a worker.
    pub async fn run(&self, provider: &dyn DataProvider) -> Result<Payload, ProviderError> {
        match self {
            Operation::ListApps => provider.list_apps().await.map(Payload::Apps),
            Operation::LoadConfig { app } => {
                let config = provider.load_config(app).await?;
                let values = provider.get_current_values(app).await?;
                Ok(Payload::ConfigLoaded {
                    app: app.clone(),
                    config,
                    values,
                })
            }
            Operation::SaveChanges { app, changes } => {
                provider.apply_changes(app, changes).await?;
                Ok(Payload::Saved {
                    app: app.clone(),
                    keys: changes.iter().map(|(key, _)| key.clone()).collect(),
                })
            }
            Operation::ListPresets { app } => {
                provider
                    .list_presets(app)
                    .await
                    .map(|presets| Payload::Presets {
                        app: app.clone(),
                        presets,
                    })
            }
            Operation::ApplyPreset { app, preset } => {
                provider
                    .apply_preset(app, preset)
                    .await
                    .map(|values| Payload::PresetApplied {
                        app: app.clone(),
                        preset: preset.clone(),
                        values,
                    })
            }
        }
    }
}

/// One scheduled operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub epoch: Epoch,
    pub operation: Operation,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Task),
    /// Post a message back onto the loop's queue.
    Emit(Message),
    /// Best-effort cancellation of an in-flight task.
    Cancel(Epoch),
    /// Stop the loop and tear down.
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryProvider;

    #[test]
    fn test_load_config_fetches_definition_and_values() {
        let provider = MemoryProvider::sample();
        let op = Operation::LoadConfig {
            app: "ghostty".to_string(),
        };
        let payload = tokio_test::block_on(op.run(&provider)).unwrap();
        match payload {
            Payload::ConfigLoaded { app, config, values } => {
                assert_eq!(app, "ghostty");
                assert_eq!(config.fields.len(), 4);
                assert_eq!(values["font-size"], Value::Integer(13));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_failed_save_changes_nothing() {
        let provider = MemoryProvider::sample();
        let op = Operation::SaveChanges {
            app: "zed".to_string(),
            changes: vec![
                ("tab_size".to_string(), Value::Integer(8)),
                ("no_such_key".to_string(), Value::Boolean(true)),
            ],
        };
        let result = tokio_test::block_on(op.run(&provider));
        assert!(matches!(result, Err(ProviderError::UnknownKey { .. })));
        let values = tokio_test::block_on(provider.get_current_values("zed")).unwrap();
        assert!(!values.contains_key("tab_size"));
    }

    #[test]
    fn test_writes_are_flagged() {
        assert!(
            Operation::ApplyPreset {
                app: "a".into(),
                preset: "p".into()
            }
            .is_write()
        );
        assert!(!Operation::ListApps.is_write());
    }
}
