//! # Data Providers
//!
//! Everything that touches app definitions and persisted values lives behind
//! [`DataProvider`]. The core never calls a provider directly: commands do,
//! from worker tasks, and their results come back as messages.

pub mod provider;
pub mod providers;
pub mod types;

pub use provider::{DataProvider, ProviderError};
pub use providers::{FileProvider, MemoryProvider};
pub use types::{AppConfig, AppInfo, AppStatus, FieldKind, FieldSpec, Value, ValueMap, display_value};
