//! # Screen Components
//!
//! One component per screen. The app list comes in two interchangeable
//! layouts; the rest are fixed.

pub mod app_grid;
pub mod app_list;
pub mod config_form;
pub mod help_panel;
pub mod progress_panel;

pub use app_grid::AppGrid;
pub use app_list::{AppCatalog, AppList};
pub use config_form::ConfigForm;
pub use help_panel::HelpPanel;
pub use progress_panel::ProgressPanel;
