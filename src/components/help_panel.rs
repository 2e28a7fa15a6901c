//! # Help Panel Component
//!
//! Key reference, wrapped to the terminal width. Up/Down scroll.

use crate::core::command::Command;
use crate::core::component::Component;
use crate::core::message::{Key, Message};

const HELP_SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Anywhere",
        &[
            ("?", "toggle this help"),
            ("Esc", "go back; on the app list, quit"),
            ("q", "quit (asks first if the form has unsaved changes)"),
            ("Ctrl+C", "quit immediately"),
        ],
    ),
    (
        "App list",
        &[
            ("↑ ↓ / j k", "move the selection (the grid also takes ← →)"),
            ("Enter", "open the selected application"),
            ("r", "rescan the apps directory"),
        ],
    ),
    (
        "Form",
        &[
            ("↑ ↓ / j k", "move between fields"),
            ("Enter", "edit a value, cycle a choice, or flip a switch"),
            ("Space", "flip a switch"),
            ("u", "revert the selected field"),
            ("s", "save all changes"),
            ("p", "pick a preset for this application"),
        ],
    ),
    (
        "Progress",
        &[("Esc", "cancel the running operation and go back")],
    ),
];

pub struct HelpPanel {
    scroll: usize,
    width: u16,
    height: u16,
}

impl HelpPanel {
    pub fn new() -> Self {
        Self {
            scroll: 0,
            width: 80,
            height: 24,
        }
    }

    fn lines(&self) -> Vec<String> {
        let width = usize::from(self.width).max(20);
        let mut lines = Vec::new();
        for (title, bindings) in HELP_SECTIONS {
            lines.push(title.to_string());
            for (keys, what) in *bindings {
                let entry = format!("  {keys:<12} {what}");
                let options = textwrap::Options::new(width).subsequent_indent("               ");
                lines.extend(textwrap::wrap(&entry, options).into_iter().map(|l| l.into_owned()));
            }
            lines.push(String::new());
        }
        lines
    }

    fn rows(&self) -> usize {
        usize::from(self.height.saturating_sub(6)).max(1)
    }
}

impl Default for HelpPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HelpPanel {
    fn name(&self) -> &str {
        "help"
    }

    fn update(&mut self, msg: &Message) -> Vec<Command> {
        if let Message::Key(key) = msg {
            let max = self.lines().len().saturating_sub(self.rows());
            match key {
                Key::Up | Key::Char('k') => self.scroll = self.scroll.saturating_sub(1),
                Key::Down | Key::Char('j') => self.scroll = (self.scroll + 1).min(max),
                Key::PageUp => self.scroll = self.scroll.saturating_sub(self.rows()),
                Key::PageDown => self.scroll = (self.scroll + self.rows()).min(max),
                Key::Home => self.scroll = 0,
                _ => {}
            }
        }
        Vec::new()
    }

    fn view(&self) -> String {
        let lines = self.lines();
        lines
            .iter()
            .skip(self.scroll)
            .take(self.rows())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let max = self.lines().len().saturating_sub(self.rows());
        self.scroll = self.scroll.min(max);
    }
}
