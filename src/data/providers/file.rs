//! File-backed provider.
//!
//! App definitions live in one directory, one TOML file per app:
//!
//! ```text
//! <apps_dir>/
//! ├── ghostty.toml          (fields + presets)
//! ├── alacritty.toml
//! └── values/
//!     ├── ghostty.toml      (persisted values, flat table)
//!     └── alacritty.toml
//! ```
//!
//! A definition may point `values_file` somewhere else (`~` is expanded).
//! All writes use atomic rename (write `.tmp`, then `rename()`).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::fs;
use tokio::sync::Mutex;

use crate::core::config::expand_home;
use crate::data::{AppConfig, AppInfo, AppStatus, DataProvider, ProviderError, Value, ValueMap};

pub struct FileProvider {
    apps_dir: PathBuf,
    // Serializes read-modify-write cycles on values files.
    write_lock: Mutex<()>,
}

impl FileProvider {
    pub fn new(apps_dir: PathBuf) -> Self {
        Self {
            apps_dir,
            write_lock: Mutex::new(()),
        }
    }

    /// Fails with `Unavailable` when the apps directory does not exist.
    pub fn open(apps_dir: PathBuf) -> Result<Self, ProviderError> {
        if !apps_dir.is_dir() {
            return Err(ProviderError::Unavailable(format!(
                "apps directory {} does not exist",
                apps_dir.display()
            )));
        }
        info!("File provider using {}", apps_dir.display());
        Ok(Self::new(apps_dir))
    }

    fn definition_path(&self, app: &str) -> PathBuf {
        self.apps_dir.join(format!("{app}.toml"))
    }

    fn values_path(&self, config: &AppConfig) -> PathBuf {
        match &config.values_file {
            Some(path) => expand_home(&path.to_string_lossy()),
            None => self
                .apps_dir
                .join("values")
                .join(format!("{}.toml", config.name)),
        }
    }

    async fn read_values(&self, path: &Path) -> Result<ValueMap, ProviderError> {
        if !fs::try_exists(path).await? {
            return Ok(ValueMap::new());
        }
        let contents = fs::read_to_string(path).await?;
        toml::from_str(&contents).map_err(|e| ProviderError::Parse(format!("{}: {e}", path.display())))
    }

    async fn write_values(&self, path: &Path, values: &ValueMap) -> Result<(), ProviderError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let contents =
            toml::to_string_pretty(values).map_err(|e| ProviderError::Parse(e.to_string()))?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents).await?;
        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        debug!("Wrote {} values to {}", values.len(), path.display());
        Ok(())
    }

    /// Copy the current values file to `<name>.backup`. The copy is kept
    /// after a successful write as the previous version.
    async fn backup_values(&self, path: &Path) -> Result<(), ProviderError> {
        if fs::try_exists(path).await? {
            let backup = path.with_extension("backup");
            fs::copy(path, &backup).await?;
            debug!("Backed up {} to {}", path.display(), backup.display());
        }
        Ok(())
    }
}

#[async_trait]
impl DataProvider for FileProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn list_apps(&self) -> Result<Vec<AppInfo>, ProviderError> {
        let mut entries = fs::read_dir(&self.apps_dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "toml")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();

        let mut apps = Vec::with_capacity(names.len());
        for name in names {
            let status = match self.load_config(&name).await {
                Ok(config) => {
                    if fs::try_exists(self.values_path(&config)).await? {
                        AppStatus::Ready
                    } else {
                        AppStatus::NotConfigured
                    }
                }
                Err(e) => {
                    warn!("Skipping status for {name}: {e}");
                    AppStatus::Error(e.to_string())
                }
            };
            apps.push(AppInfo::new(&name, status));
        }
        Ok(apps)
    }

    async fn load_config(&self, app: &str) -> Result<AppConfig, ProviderError> {
        let path = self.definition_path(app);
        if !fs::try_exists(&path).await? {
            return Err(ProviderError::NotFound(app.to_string()));
        }
        let contents = fs::read_to_string(&path).await?;
        let mut config: AppConfig = toml::from_str(&contents)
            .map_err(|e| ProviderError::Parse(format!("{}: {e}", path.display())))?;
        if config.name.is_empty() {
            config.name = app.to_string();
        } else if config.name != app {
            warn!(
                "Definition {} declares name '{}', using '{}'",
                path.display(),
                config.name,
                app
            );
            config.name = app.to_string();
        }
        Ok(config)
    }

    async fn get_current_values(&self, app: &str) -> Result<ValueMap, ProviderError> {
        let config = self.load_config(app).await?;
        let mut values: ValueMap = config
            .fields
            .iter()
            .filter_map(|f| f.default.clone().map(|d| (f.name.clone(), d)))
            .collect();
        values.extend(self.read_values(&self.values_path(&config)).await?);
        Ok(values)
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
        let config = self.load_config(app).await?;
        if let Some((key, _)) = changes.iter().find(|(key, _)| config.field(key).is_none()) {
            return Err(ProviderError::UnknownKey {
                app: app.to_string(),
                key: key.clone(),
            });
        }
        let path = self.values_path(&config);
        let _guard = self.write_lock.lock().await;
        let mut values = self.read_values(&path).await?;
        self.backup_values(&path).await?;
        values.extend(changes.iter().cloned());
        self.write_values(&path, &values).await?;
        info!("Saved {} change(s) to {}", changes.len(), app);
        Ok(())
    }

    async fn list_presets(&self, app: &str) -> Result<Vec<String>, ProviderError> {
        let config = self.load_config(app).await?;
        Ok(config.presets.keys().cloned().collect())
    }

    async fn apply_preset(&self, app: &str, preset: &str) -> Result<ValueMap, ProviderError> {
        let config = self.load_config(app).await?;
        let preset_values = config
            .presets
            .get(preset)
            .ok_or_else(|| ProviderError::NotFound(format!("{app}/{preset}")))?;
        let path = self.values_path(&config);
        {
            let _guard = self.write_lock.lock().await;
            let mut values = self.read_values(&path).await?;
            self.backup_values(&path).await?;
            values.extend(preset_values.clone());
            self.write_values(&path, &values).await?;
        }
        info!("Applied preset {preset} to {app}");
        self.get_current_values(app).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GHOSTTY: &str = r#"
[[fields]]
name = "font-size"
kind = "int"
default = 12

[[fields]]
name = "theme"
kind = "choice"
choices = ["dark", "light"]

[presets.minimal]
font-size = 11
theme = "light"
"#;

    fn provider_with_ghostty() -> (tempfile::TempDir, FileProvider) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ghostty.toml"), GHOSTTY).unwrap();
        let provider = FileProvider::open(dir.path().to_path_buf()).unwrap();
        (dir, provider)
    }

    #[test]
    fn test_open_missing_dir_is_unavailable() {
        let result = FileProvider::open(PathBuf::from("/definitely/not/here"));
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_list_apps_ignores_values_dir() {
        let (dir, provider) = provider_with_ghostty();
        std::fs::create_dir_all(dir.path().join("values")).unwrap();
        std::fs::write(dir.path().join("values").join("ghostty.toml"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        let apps = provider.list_apps().await.unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "ghostty");
    }

    #[tokio::test]
    async fn test_list_apps_reports_status() {
        let (dir, provider) = provider_with_ghostty();
        std::fs::write(dir.path().join("broken.toml"), "fields = 3").unwrap();

        let apps = provider.list_apps().await.unwrap();
        assert!(matches!(apps[0].status, AppStatus::Error(_)));
        assert_eq!(apps[1], AppInfo::new("ghostty", AppStatus::NotConfigured));

        provider
            .apply_change("ghostty", "font-size", &Value::Integer(14))
            .await
            .unwrap();
        let apps = provider.list_apps().await.unwrap();
        assert_eq!(apps[1], AppInfo::new("ghostty", AppStatus::Ready));
    }

    #[tokio::test]
    async fn test_load_config_fills_name_from_file() {
        let (_dir, provider) = provider_with_ghostty();
        let config = provider.load_config("ghostty").await.unwrap();
        assert_eq!(config.name, "ghostty");
        assert_eq!(config.fields.len(), 2);
    }

    #[tokio::test]
    async fn test_load_config_unknown_app() {
        let (_dir, provider) = provider_with_ghostty();
        assert_eq!(
            provider.load_config("kitty").await,
            Err(ProviderError::NotFound("kitty".to_string()))
        );
    }

    #[tokio::test]
    async fn test_current_values_start_from_defaults() {
        let (_dir, provider) = provider_with_ghostty();
        let values = provider.get_current_values("ghostty").await.unwrap();
        assert_eq!(values["font-size"], Value::Integer(12));
        assert!(!values.contains_key("theme"));
    }

    #[tokio::test]
    async fn test_apply_change_persists_atomically() {
        let (dir, provider) = provider_with_ghostty();
        provider
            .apply_change("ghostty", "font-size", &Value::Integer(15))
            .await
            .unwrap();
        let values = provider.get_current_values("ghostty").await.unwrap();
        assert_eq!(values["font-size"], Value::Integer(15));
        let values_dir = dir.path().join("values");
        assert!(values_dir.join("ghostty.toml").exists());
        assert!(!values_dir.join("ghostty.tmp").exists());
    }

    #[tokio::test]
    async fn test_apply_change_rejects_undeclared_key() {
        let (_dir, provider) = provider_with_ghostty();
        let result = provider
            .apply_change("ghostty", "opacity", &Value::Float(0.9))
            .await;
        assert!(matches!(result, Err(ProviderError::UnknownKey { .. })));
    }

    #[tokio::test]
    async fn test_batch_with_unknown_key_writes_nothing() {
        let (dir, provider) = provider_with_ghostty();
        provider
            .apply_change("ghostty", "font-size", &Value::Integer(14))
            .await
            .unwrap();
        let changes = vec![
            ("font-size".to_string(), Value::Integer(20)),
            ("opacity".to_string(), Value::Float(0.5)),
        ];
        let result = provider.apply_changes("ghostty", &changes).await;
        assert!(matches!(result, Err(ProviderError::UnknownKey { key, .. }) if key == "opacity"));
        let values = provider.get_current_values("ghostty").await.unwrap();
        assert_eq!(values["font-size"], Value::Integer(14));
        assert!(!dir.path().join("values").join("ghostty.backup").exists());
    }

    #[tokio::test]
    async fn test_batch_keeps_previous_file_as_backup() {
        let (dir, provider) = provider_with_ghostty();
        provider
            .apply_change("ghostty", "font-size", &Value::Integer(14))
            .await
            .unwrap();
        let changes = vec![
            ("font-size".to_string(), Value::Integer(16)),
            ("theme".to_string(), Value::String("dark".into())),
        ];
        provider.apply_changes("ghostty", &changes).await.unwrap();

        let values = provider.get_current_values("ghostty").await.unwrap();
        assert_eq!(values["font-size"], Value::Integer(16));
        assert_eq!(values["theme"], Value::String("dark".into()));
        let backup =
            std::fs::read_to_string(dir.path().join("values").join("ghostty.backup")).unwrap();
        let previous: ValueMap = toml::from_str(&backup).unwrap();
        assert_eq!(previous["font-size"], Value::Integer(14));
        assert!(!previous.contains_key("theme"));
    }

    #[tokio::test]
    async fn test_apply_preset_merges_values() {
        let (_dir, provider) = provider_with_ghostty();
        assert_eq!(provider.list_presets("ghostty").await.unwrap(), vec!["minimal"]);
        let values = provider.apply_preset("ghostty", "minimal").await.unwrap();
        assert_eq!(values["font-size"], Value::Integer(11));
        assert_eq!(values["theme"], Value::String("light".into()));
    }
}
