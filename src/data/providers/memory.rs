//! In-memory provider.
//!
//! Backs `--demo` and the test suite. An optional artificial latency makes
//! every operation sleep first, which is how the scheduler's timeout path is
//! exercised without touching the disk.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::data::{AppConfig, AppInfo, AppStatus, DataProvider, FieldKind, FieldSpec, ProviderError, Value, ValueMap};

struct Entry {
    config: AppConfig,
    values: ValueMap,
}

pub struct MemoryProvider {
    apps: Mutex<BTreeMap<String, Entry>>,
    latency: Duration,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            apps: Mutex::new(BTreeMap::new()),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_app(self, config: AppConfig, values: ValueMap) -> Self {
        if let Ok(mut apps) = self.apps.lock() {
            apps.insert(config.name.clone(), Entry { config, values });
        }
        self
    }

    /// A few terminal emulators and editors, enough to click around in.
    pub fn sample() -> Self {
        let mut ghostty = AppConfig::new(
            "ghostty",
            vec![
                FieldSpec::new("font-size", FieldKind::Int).with_description("Point size"),
                FieldSpec::new("theme", FieldKind::Choice)
                    .with_choices(&["dark", "light", "solarized"]),
                FieldSpec::new("cursor-blink", FieldKind::Bool),
                FieldSpec::new("background-opacity", FieldKind::Float),
            ],
        );
        ghostty.presets.insert(
            "minimal".to_string(),
            ValueMap::from([
                ("font-size".to_string(), Value::Integer(11)),
                ("cursor-blink".to_string(), Value::Boolean(false)),
            ]),
        );
        ghostty.presets.insert(
            "presentation".to_string(),
            ValueMap::from([("font-size".to_string(), Value::Integer(20))]),
        );

        let alacritty = AppConfig::new(
            "alacritty",
            vec![
                FieldSpec::new("font.family", FieldKind::String),
                FieldSpec::new("font.size", FieldKind::Float),
                FieldSpec::new("window.decorations", FieldKind::Choice)
                    .with_choices(&["full", "none", "transparent"]),
            ],
        );

        let zed = AppConfig::new(
            "zed",
            vec![
                FieldSpec::new("vim_mode", FieldKind::Bool),
                FieldSpec::new("tab_size", FieldKind::Int),
            ],
        );

        Self::new()
            .with_app(
                ghostty,
                ValueMap::from([
                    ("font-size".to_string(), Value::Integer(13)),
                    ("theme".to_string(), Value::String("dark".into())),
                ]),
            )
            .with_app(alacritty, ValueMap::new())
            .with_app(
                zed,
                ValueMap::from([("vim_mode".to_string(), Value::Boolean(true))]),
            )
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn with_entry<T>(
        &self,
        app: &str,
        f: impl FnOnce(&mut Entry) -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let mut apps = self
            .apps
            .lock()
            .map_err(|_| ProviderError::Unavailable("memory store poisoned".to_string()))?;
        let entry = apps
            .get_mut(app)
            .ok_or_else(|| ProviderError::NotFound(app.to_string()))?;
        f(entry)
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_apps(&self) -> Result<Vec<AppInfo>, ProviderError> {
        self.simulate_latency().await;
        let apps = self
            .apps
            .lock()
            .map_err(|_| ProviderError::Unavailable("memory store poisoned".to_string()))?;
        Ok(apps
            .iter()
            .map(|(name, entry)| {
                let status = if entry.values.is_empty() {
                    AppStatus::NotConfigured
                } else {
                    AppStatus::Ready
                };
                AppInfo::new(name, status)
            })
            .collect())
    }

    async fn load_config(&self, app: &str) -> Result<AppConfig, ProviderError> {
        self.simulate_latency().await;
        self.with_entry(app, |entry| Ok(entry.config.clone()))
    }

    async fn get_current_values(&self, app: &str) -> Result<ValueMap, ProviderError> {
        self.simulate_latency().await;
        self.with_entry(app, |entry| Ok(entry.values.clone()))
    }

    async fn apply_change(
        &self,
        app: &str,
        key: &str,
        value: &Value,
    ) -> Result<(), ProviderError> {
        self.apply_changes(app, &[(key.to_string(), value.clone())])
            .await
    }

    async fn apply_changes(
        &self,
        app: &str,
        changes: &[(String, Value)],
    ) -> Result<(), ProviderError> {
        self.simulate_latency().await;
        self.with_entry(app, |entry| {
            if let Some((key, _)) = changes
                .iter()
                .find(|(key, _)| entry.config.field(key).is_none())
            {
                return Err(ProviderError::UnknownKey {
                    app: app.to_string(),
                    key: key.clone(),
                });
            }
            for (key, value) in changes {
                debug!("memory: {app}.{key} = {value}");
                entry.values.insert(key.clone(), value.clone());
            }
            Ok(())
        })
    }

    async fn list_presets(&self, app: &str) -> Result<Vec<String>, ProviderError> {
        self.simulate_latency().await;
        self.with_entry(app, |entry| Ok(entry.config.presets.keys().cloned().collect()))
    }

    async fn apply_preset(&self, app: &str, preset: &str) -> Result<ValueMap, ProviderError> {
        self.simulate_latency().await;
        self.with_entry(app, |entry| {
            let preset_values = entry
                .config
                .presets
                .get(preset)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(format!("{app}/{preset}")))?;
            entry.values.extend(preset_values);
            Ok(entry.values.clone())
        })
    }
}
