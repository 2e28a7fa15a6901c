//! # App Grid Component
//!
//! Same catalog as [`AppList`](super::app_list::AppList), laid out in
//! fixed-width columns. Picked with `list_layout = "grid"`.

use unicode_width::UnicodeWidthStr;

use super::app_list::{AppCatalog, visible_rows};
use crate::core::command::Command;
use crate::core::component::Component;
use crate::core::message::{Key, Message};
use crate::data::AppStatus;

const CELL_WIDTH: usize = 22;

pub struct AppGrid {
    catalog: AppCatalog,
    width: u16,
    height: u16,
}

impl AppGrid {
    pub fn new() -> Self {
        Self {
            catalog: AppCatalog::default(),
            width: 80,
            height: 24,
        }
    }

    pub fn catalog(&self) -> &AppCatalog {
        &self.catalog
    }

    fn columns(&self) -> usize {
        (usize::from(self.width) / CELL_WIDTH).max(1)
    }
}

impl Default for AppGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for AppGrid {
    fn name(&self) -> &str {
        "app-grid"
    }

    fn init(&mut self) -> Vec<Command> {
        vec![Command::Emit(Message::RefreshRequested)]
    }

    fn update(&mut self, msg: &Message) -> Vec<Command> {
        let cols = self.columns() as isize;
        match msg {
            Message::AppsUpdated(apps) => self.catalog.set_apps(apps.clone()),
            Message::Key(key) => match key {
                Key::Left | Key::Char('h') => self.catalog.step(-1),
                Key::Right | Key::Char('l') | Key::Tab => self.catalog.step(1),
                Key::Up | Key::Char('k') => self.catalog.step(-cols),
                Key::Down | Key::Char('j') => self.catalog.step(cols),
                Key::Home | Key::Char('g') => self.catalog.first(),
                Key::End | Key::Char('G') => self.catalog.last(),
                Key::Enter => return self.catalog.choose(),
                _ => {}
            },
            _ => {}
        }
        Vec::new()
    }

    fn view(&self) -> String {
        let apps = self.catalog.apps();
        if apps.is_empty() {
            return self.catalog.empty_text().to_string();
        }

        let cols = self.columns();
        let rows = visible_rows(self.height);
        let selected_row = self.catalog.selected() / cols;
        let first_row = selected_row.saturating_sub(rows.saturating_sub(1));

        let mut lines = vec![format!("Applications ({})", apps.len()), String::new()];
        for (row, chunk) in apps.chunks(cols).enumerate().skip(first_row).take(rows) {
            let line: String = chunk
                .iter()
                .enumerate()
                .map(|(col, app)| {
                    let index = row * cols + col;
                    let marker = if index == self.catalog.selected() { "▸" } else { " " };
                    match &app.status {
                        AppStatus::Ready => pad_cell(&format!("{marker} {}", app.name)),
                        status => pad_cell(&format!("{marker} {} {}", app.name, status.icon())),
                    }
                })
                .collect();
            lines.push(line.trim_end().to_string());
        }
        lines.join("\n")
    }

    fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }
}

/// Pad or cut `text` to exactly one cell, by display width.
fn pad_cell(text: &str) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > CELL_WIDTH - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    let pad = CELL_WIDTH.saturating_sub(out.width());
    out.push_str(&" ".repeat(pad));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AppInfo;

    fn grid_with(n: usize) -> AppGrid {
        let mut grid = AppGrid::new();
        grid.set_size(66, 24); // three columns
        let apps = (0..n)
            .map(|i| AppInfo::new(&format!("app{i}"), AppStatus::Ready))
            .collect();
        grid.update(&Message::AppsUpdated(apps));
        grid
    }

    #[test]
    fn test_down_moves_one_row() {
        let mut grid = grid_with(9);
        grid.update(&Message::Key(Key::Down));
        assert_eq!(grid.catalog().selected_app(), Some("app3"));
        grid.update(&Message::Key(Key::Right));
        assert_eq!(grid.catalog().selected_app(), Some("app4"));
    }

    #[test]
    fn test_view_lays_out_columns() {
        let grid = grid_with(5);
        let view = grid.view();
        let rows: Vec<&str> = view.lines().skip(2).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("▸ app0"));
        assert!(rows[0].contains("app2"));
        assert!(rows[1].contains("app4"));
    }

    #[test]
    fn test_unready_apps_carry_status_icon() {
        let mut grid = AppGrid::new();
        grid.update(&Message::AppsUpdated(vec![
            AppInfo::new("alacritty", AppStatus::NotConfigured),
            AppInfo::new("ghostty", AppStatus::Ready),
        ]));
        let view = grid.view();
        assert!(view.contains("▸ alacritty ○"));
        assert!(!view.contains("ghostty ○"));
    }

    #[test]
    fn test_long_names_are_cut_to_cell() {
        let cell = pad_cell("▸ a-really-long-application-name");
        assert_eq!(cell.width(), CELL_WIDTH);
    }

    #[test]
    fn test_enter_emits_selection() {
        let mut grid = grid_with(2);
        let commands = grid.update(&Message::Key(Key::Enter));
        assert_eq!(
            commands,
            vec![Command::Emit(Message::AppSelected {
                app: "app0".to_string()
            })]
        );
    }
}
