//! # Progress Panel Component
//!
//! Shown while a save or a preset is being applied. The spinner advances on
//! `Message::Tick`.

use crate::core::command::Command;
use crate::core::component::Component;
use crate::core::message::Message;

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct ProgressPanel {
    label: String,
    frame: usize,
}

impl ProgressPanel {
    pub fn new() -> Self {
        Self {
            label: String::new(),
            frame: 0,
        }
    }

    pub fn start(&mut self, label: &str) {
        self.label = label.to_string();
        self.frame = 0;
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for ProgressPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ProgressPanel {
    fn name(&self) -> &str {
        "progress"
    }

    fn update(&mut self, msg: &Message) -> Vec<Command> {
        if let Message::Tick = msg {
            self.frame = (self.frame + 1) % SPINNER.len();
        }
        Vec::new()
    }

    fn view(&self) -> String {
        let label = if self.label.is_empty() {
            "Working"
        } else {
            self.label.as_str()
        };
        format!("{} {label}…\n\nEsc to cancel", SPINNER[self.frame % SPINNER.len()])
    }

    fn set_size(&mut self, _width: u16, _height: u16) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_advances_spinner() {
        let mut panel = ProgressPanel::new();
        panel.start("save 2 change(s) to ghostty");
        let before = panel.view();
        panel.update(&Message::Tick);
        let after = panel.view();
        assert_ne!(before, after);
        assert!(after.contains("save 2 change(s) to ghostty"));
    }

    #[test]
    fn test_spinner_wraps() {
        let mut panel = ProgressPanel::new();
        for _ in 0..SPINNER.len() {
            panel.update(&Message::Tick);
        }
        assert!(panel.view().starts_with(SPINNER[0]));
    }
}
