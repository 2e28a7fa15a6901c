//! # App List Component
//!
//! The home screen: one application per line, arrow keys to move, Enter to
//! open. Selection state lives in [`AppCatalog`], which the grid layout
//! shares.

use crate::core::command::Command;
use crate::core::component::Component;
use crate::core::message::{Key, Message};
use crate::data::{AppInfo, AppStatus};

/// The known applications plus the current selection.
#[derive(Debug, Clone, Default)]
pub struct AppCatalog {
    apps: Vec<AppInfo>,
    selected: usize,
    scanned: bool,
}

impl AppCatalog {
    /// Replace the list, keeping the selection on the same app if it survived.
    pub fn set_apps(&mut self, apps: Vec<AppInfo>) {
        let keep = self.selected_app().map(str::to_string);
        self.apps = apps;
        self.scanned = true;
        self.selected = keep
            .and_then(|name| self.apps.iter().position(|a| a.name == name))
            .unwrap_or(0);
    }

    pub fn apps(&self) -> &[AppInfo] {
        &self.apps
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_app(&self) -> Option<&str> {
        self.apps.get(self.selected).map(|a| a.name.as_str())
    }

    pub fn is_scanned(&self) -> bool {
        self.scanned
    }

    /// Move the selection by `delta`, clamped to the list.
    pub fn step(&mut self, delta: isize) {
        if self.apps.is_empty() {
            return;
        }
        let last = self.apps.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    pub fn first(&mut self) {
        self.selected = 0;
    }

    pub fn last(&mut self) {
        self.selected = self.apps.len().saturating_sub(1);
    }

    /// Enter on the current selection.
    pub fn choose(&self) -> Vec<Command> {
        self.selected_app()
            .map(|app| {
                vec![Command::Emit(Message::AppSelected {
                    app: app.to_string(),
                })]
            })
            .unwrap_or_default()
    }

    pub fn empty_text(&self) -> &'static str {
        if self.scanned {
            "No applications found. Add definitions to the apps directory and press r."
        } else {
            "Scanning for applications…"
        }
    }
}

pub struct AppList {
    catalog: AppCatalog,
    height: u16,
}

impl AppList {
    pub fn new() -> Self {
        Self {
            catalog: AppCatalog::default(),
            height: 24,
        }
    }

    pub fn catalog(&self) -> &AppCatalog {
        &self.catalog
    }

    fn page(&self) -> isize {
        visible_rows(self.height) as isize
    }
}

impl Default for AppList {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for AppList {
    fn name(&self) -> &str {
        "app-list"
    }

    fn init(&mut self) -> Vec<Command> {
        vec![Command::Emit(Message::RefreshRequested)]
    }

    fn update(&mut self, msg: &Message) -> Vec<Command> {
        match msg {
            Message::AppsUpdated(apps) => {
                self.catalog.set_apps(apps.clone());
                Vec::new()
            }
            Message::Key(key) => {
                match key {
                    Key::Up | Key::Char('k') => self.catalog.step(-1),
                    Key::Down | Key::Char('j') => self.catalog.step(1),
                    Key::PageUp => self.catalog.step(-self.page()),
                    Key::PageDown => self.catalog.step(self.page()),
                    Key::Home | Key::Char('g') => self.catalog.first(),
                    Key::End | Key::Char('G') => self.catalog.last(),
                    Key::Enter | Key::Right | Key::Char('l') => return self.catalog.choose(),
                    _ => {}
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn view(&self) -> String {
        let apps = self.catalog.apps();
        if apps.is_empty() {
            return self.catalog.empty_text().to_string();
        }

        let rows = visible_rows(self.height);
        let selected = self.catalog.selected();
        // Keep the selection on screen.
        let offset = selected.saturating_sub(rows.saturating_sub(1));

        let mut lines = vec![format!("Applications ({})", apps.len()), String::new()];
        lines.extend(
            apps.iter()
                .enumerate()
                .skip(offset)
                .take(rows)
                .map(|(i, app)| {
                    let marker = if i == selected { "▸" } else { " " };
                    format!("{marker} {}", row_text(app))
                }),
        );
        lines.join("\n")
    }

    fn set_size(&mut self, _width: u16, height: u16) {
        self.height = height;
    }
}

/// The app name, followed by its status unless it is ready.
fn row_text(app: &AppInfo) -> String {
    match &app.status {
        AppStatus::Ready => app.name.clone(),
        status => format!("{}  {} {}", app.name, status.icon(), status.label()),
    }
}

/// Body rows left after the frame's header, footer and the list title.
pub(crate) fn visible_rows(height: u16) -> usize {
    usize::from(height.saturating_sub(8)).max(1)
}
