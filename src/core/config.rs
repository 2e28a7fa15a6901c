//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.zeroui/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ZeroUiConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub apps_dir: Option<String>,
    pub list_layout: Option<ListLayout>,
}

/// Timing knobs for the event loop. Milliseconds throughout.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RuntimeConfig {
    pub render_cache_ttl_ms: Option<u64>,
    pub render_budget_ms: Option<u64>,
    pub refresh_debounce_ms: Option<u64>,
    pub batch_size: Option<usize>,
    pub batch_window_ms: Option<u64>,
    pub tick_ms: Option<u64>,
    pub status_ttl_ms: Option<u64>,
    pub command_timeout_ms: Option<u64>,
    pub shutdown_grace_ms: Option<u64>,
    pub resize_threshold_width: Option<u16>,
    pub resize_threshold_height: Option<u16>,
}

/// How the application list is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ListLayout {
    #[default]
    List,
    Grid,
}

impl std::str::FromStr for ListLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "list" => Ok(ListLayout::List),
            "grid" => Ok(ListLayout::Grid),
            other => Err(format!("unknown list layout '{other}'")),
        }
    }
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_RENDER_CACHE_TTL_MS: u64 = 50;
pub const DEFAULT_RENDER_BUDGET_MS: u64 = 50;
pub const DEFAULT_REFRESH_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_BATCH_WINDOW_MS: u64 = 16;
pub const DEFAULT_TICK_MS: u64 = 250;
pub const DEFAULT_STATUS_TTL_MS: u64 = 3000;
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 1000;
pub const DEFAULT_RESIZE_THRESHOLD_WIDTH: u16 = 10;
pub const DEFAULT_RESIZE_THRESHOLD_HEIGHT: u16 = 5;

// ============================================================================
// Resolved Settings (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub apps_dir: PathBuf,
    pub list_layout: ListLayout,
    pub render_cache_ttl: Duration,
    pub render_budget: Duration,
    pub refresh_debounce: Duration,
    pub batch_size: usize,
    pub batch_window: Duration,
    pub tick: Duration,
    pub status_ttl: Duration,
    pub command_timeout: Duration,
    pub shutdown_grace: Duration,
    /// A resize is significant when either dimension moves by more than this.
    pub resize_threshold: (u16, u16),
}

impl Default for Settings {
    fn default() -> Self {
        resolve(&ZeroUiConfig::default(), &CliOverrides::default())
    }
}

/// Values taken from command-line flags. `None` means not specified.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub apps_dir: Option<PathBuf>,
    pub list_layout: Option<ListLayout>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.zeroui`.
pub fn zeroui_home() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".zeroui"))
}

/// Returns the path to `~/.zeroui/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    zeroui_home().map(|h| h.join("config.toml"))
}

/// Load config from `~/.zeroui/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `ZeroUiConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<ZeroUiConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(ZeroUiConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<ZeroUiConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(ZeroUiConfig::default());
    }

    let contents = fs::read_to_string(path)?;
    let config: ZeroUiConfig = toml::from_str(&contents)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# ZeroUI Configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# apps_dir = "~/.zeroui/apps"        # Or set ZEROUI_APPS_DIR
# list_layout = "list"               # "list" or "grid", or set ZEROUI_LIST_LAYOUT

# [runtime]
# render_cache_ttl_ms = 50
# render_budget_ms = 50              # Renders slower than this are logged
# refresh_debounce_ms = 300
# batch_size = 10
# batch_window_ms = 16
# tick_ms = 250
# status_ttl_ms = 3000
# command_timeout_ms = 5000          # Or set ZEROUI_COMMAND_TIMEOUT_MS
# shutdown_grace_ms = 1000
# resize_threshold_width = 10
# resize_threshold_height = 5
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final settings by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &ZeroUiConfig, cli: &CliOverrides) -> Settings {
    // Apps dir: CLI → env → config → default
    let apps_dir = cli
        .apps_dir
        .clone()
        .or_else(|| std::env::var("ZEROUI_APPS_DIR").ok().map(|s| expand_home(&s)))
        .or_else(|| config.general.apps_dir.as_deref().map(expand_home))
        .unwrap_or_else(default_apps_dir);

    // Layout: CLI → env → config → default
    let list_layout = cli
        .list_layout
        .or_else(|| env_parse::<ListLayout>("ZEROUI_LIST_LAYOUT"))
        .or(config.general.list_layout)
        .unwrap_or_default();

    // Command timeout: env → config → default
    let command_timeout_ms = env_parse::<u64>("ZEROUI_COMMAND_TIMEOUT_MS")
        .or(config.runtime.command_timeout_ms)
        .unwrap_or(DEFAULT_COMMAND_TIMEOUT_MS);

    let rt = &config.runtime;
    let ms = |value: Option<u64>, default: u64| Duration::from_millis(value.unwrap_or(default));

    Settings {
        apps_dir,
        list_layout,
        render_cache_ttl: ms(rt.render_cache_ttl_ms, DEFAULT_RENDER_CACHE_TTL_MS),
        render_budget: ms(rt.render_budget_ms, DEFAULT_RENDER_BUDGET_MS),
        refresh_debounce: ms(rt.refresh_debounce_ms, DEFAULT_REFRESH_DEBOUNCE_MS),
        batch_size: rt.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1),
        batch_window: ms(rt.batch_window_ms, DEFAULT_BATCH_WINDOW_MS),
        tick: ms(rt.tick_ms, DEFAULT_TICK_MS).max(Duration::from_millis(1)),
        status_ttl: ms(rt.status_ttl_ms, DEFAULT_STATUS_TTL_MS),
        command_timeout: Duration::from_millis(command_timeout_ms),
        shutdown_grace: ms(rt.shutdown_grace_ms, DEFAULT_SHUTDOWN_GRACE_MS),
        resize_threshold: (
            rt.resize_threshold_width
                .unwrap_or(DEFAULT_RESIZE_THRESHOLD_WIDTH),
            rt.resize_threshold_height
                .unwrap_or(DEFAULT_RESIZE_THRESHOLD_HEIGHT),
        ),
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {var}={raw:?}: not a valid value");
            None
        }
    }
}

fn default_apps_dir() -> PathBuf {
    zeroui_home()
        .map(|h| h.join("apps"))
        .unwrap_or_else(|| PathBuf::from("apps"))
}

/// Expands a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
