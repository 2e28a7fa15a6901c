//! # Config Form Component
//!
//! Edits the values of one app. The form keeps two maps: the values as last
//! loaded or saved (`original`) and the values as edited (`values`). The
//! difference between them is what `s` saves and what the leave guard
//! protects.
//!
//! Keys while browsing:
//! - Up/Down (j/k) move between fields
//! - Enter edits text and numbers, cycles choices, flips booleans
//! - Space flips booleans, `u` reverts the selected field
//!
//! While editing or while the preset picker is open, the form captures every
//! key so typing `q` into a text field does not quit.

use crate::core::command::Command;
use crate::core::component::Component;
use crate::core::message::{Key, Message};
use crate::data::{AppConfig, FieldKind, FieldSpec, Value, ValueMap, display_value};

#[derive(Debug, Clone, PartialEq)]
struct PresetPicker {
    presets: Vec<String>,
    selected: usize,
}

pub struct ConfigForm {
    app: Option<String>,
    loading: bool,
    config: Option<AppConfig>,
    original: ValueMap,
    values: ValueMap,
    selected: usize,
    editing: Option<String>,
    picker: Option<PresetPicker>,
    height: u16,
}

impl ConfigForm {
    pub fn new() -> Self {
        Self {
            app: None,
            loading: false,
            config: None,
            original: ValueMap::new(),
            values: ValueMap::new(),
            selected: 0,
            editing: None,
            picker: None,
            height: 24,
        }
    }

    /// Forget the previous app and show a loading placeholder for `app`.
    pub fn begin_loading(&mut self, app: &str) {
        self.clear();
        self.app = Some(app.to_string());
        self.loading = true;
    }

    /// The load for the current app will not arrive.
    pub fn abandon_loading(&mut self) {
        self.loading = false;
    }

    pub fn clear(&mut self) {
        *self = Self {
            height: self.height,
            ..Self::new()
        };
    }

    pub fn app(&self) -> Option<&str> {
        self.app.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_loaded(&self) -> bool {
        self.config.is_some()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.values != self.original
    }

    /// Fields whose edited value differs from the saved one.
    pub fn pending_changes(&self) -> Vec<(String, Value)> {
        self.values
            .iter()
            .filter(|(key, value)| self.original.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn discard_changes(&mut self) {
        self.values = self.original.clone();
        self.editing = None;
    }

    pub fn captures_input(&self) -> bool {
        self.editing.is_some() || self.picker.is_some()
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    fn fields(&self) -> &[FieldSpec] {
        self.config.as_ref().map(|c| c.fields.as_slice()).unwrap_or(&[])
    }

    fn selected_field(&self) -> Option<&FieldSpec> {
        self.fields().get(self.selected)
    }

    fn current_value<'a>(&'a self, field: &'a FieldSpec) -> Option<&'a Value> {
        self.values.get(&field.name).or(field.default.as_ref())
    }

    fn set_value(&mut self, name: String, value: Value) {
        self.values.insert(name, value);
    }

    fn load(&mut self, config: &AppConfig, values: &ValueMap) {
        if self.app.as_deref() != Some(config.name.as_str()) {
            return;
        }
        self.loading = false;
        self.config = Some(config.clone());
        self.original = values.clone();
        self.values = values.clone();
        self.selected = 0;
    }

    fn activate(&mut self) -> Vec<Command> {
        let Some(field) = self.selected_field().cloned() else {
            return Vec::new();
        };
        match field.kind {
            FieldKind::Bool => self.toggle(&field),
            FieldKind::Choice if !field.choices.is_empty() => {
                let current = self.current_value(&field).map(display_value);
                let next = current
                    .and_then(|c| field.choices.iter().position(|choice| *choice == c))
                    .map(|i| (i + 1) % field.choices.len())
                    .unwrap_or(0);
                self.set_value(field.name.clone(), Value::String(field.choices[next].clone()));
            }
            _ => {
                let seed = self.current_value(&field).map(display_value).unwrap_or_default();
                self.editing = Some(seed);
            }
        }
        Vec::new()
    }

    fn toggle(&mut self, field: &FieldSpec) {
        let on = matches!(self.current_value(field), Some(Value::Boolean(true)));
        self.set_value(field.name.clone(), Value::Boolean(!on));
    }

    fn revert_selected(&mut self) {
        if let Some(name) = self.selected_field().map(|f| f.name.clone()) {
            match self.original.get(&name) {
                Some(value) => {
                    self.values.insert(name, value.clone());
                }
                None => {
                    self.values.remove(&name);
                }
            }
        }
    }

    fn edit_key(&mut self, key: Key) -> Vec<Command> {
        let Some(buffer) = self.editing.as_mut() else {
            return Vec::new();
        };
        match key {
            Key::Char(c) => buffer.push(c),
            Key::Backspace => {
                buffer.pop();
            }
            Key::Esc => self.editing = None,
            Key::Enter => {
                let input = self.editing.take().unwrap_or_default();
                if let Some(field) = self.selected_field().cloned() {
                    match field.parse(&input) {
                        Ok(value) => self.set_value(field.name, value),
                        Err(e) => {
                            // Keep the buffer so the user can fix the typo.
                            self.editing = Some(input);
                            return vec![Command::Emit(Message::Invalid(e))];
                        }
                    }
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn picker_key(&mut self, key: Key) -> Vec<Command> {
        let Some(picker) = self.picker.as_mut() else {
            return Vec::new();
        };
        match key {
            Key::Up | Key::Char('k') => picker.selected = picker.selected.saturating_sub(1),
            Key::Down | Key::Char('j') => {
                picker.selected = (picker.selected + 1).min(picker.presets.len().saturating_sub(1));
            }
            Key::Esc => self.picker = None,
            Key::Enter => {
                let chosen = picker.presets.get(picker.selected).cloned();
                self.picker = None;
                if let Some(preset) = chosen {
                    return vec![Command::Emit(Message::PresetChosen { preset })];
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn browse_key(&mut self, key: Key) -> Vec<Command> {
        let count = self.fields().len();
        match key {
            Key::Up | Key::Char('k') => self.selected = self.selected.saturating_sub(1),
            Key::Down | Key::Char('j') | Key::Tab => {
                self.selected = (self.selected + 1).min(count.saturating_sub(1));
            }
            Key::Enter => return self.activate(),
            Key::Char(' ') => {
                if let Some(field) = self.selected_field().cloned()
                    && field.kind == FieldKind::Bool
                {
                    self.toggle(&field);
                }
            }
            Key::Char('u') => self.revert_selected(),
            _ => {}
        }
        Vec::new()
    }

    fn field_line(&self, index: usize, field: &FieldSpec) -> String {
        let marker = if index == self.selected { "▸" } else { " " };
        let dirty = if self.values.get(&field.name) != self.original.get(&field.name) {
            " *"
        } else {
            ""
        };
        let value = match (&self.editing, index == self.selected) {
            (Some(buffer), true) => format!("[{buffer}_]"),
            _ => self
                .current_value(field)
                .map(display_value)
                .unwrap_or_else(|| "(unset)".to_string()),
        };
        let mut line = format!("{marker} {:<24} {value}{dirty}", field.name);
        if index == self.selected {
            if let Some(desc) = &field.description {
                line.push_str(&format!("    {desc}"));
            }
            if field.kind == FieldKind::Choice {
                line.push_str(&format!("    ({})", field.choices.join(" | ")));
            }
        }
        line
    }
}

impl Default for ConfigForm {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ConfigForm {
    fn name(&self) -> &str {
        "config-form"
    }

    fn update(&mut self, msg: &Message) -> Vec<Command> {
        match msg {
            Message::FormLoaded { config, values } => {
                self.load(config, values);
                Vec::new()
            }
            Message::ChangesSaved { keys } => {
                for key in keys {
                    if let Some(value) = self.values.get(key) {
                        self.original.insert(key.clone(), value.clone());
                    }
                }
                Vec::new()
            }
            Message::ValuesReplaced(values) => {
                self.original = values.clone();
                self.values = values.clone();
                Vec::new()
            }
            Message::PresetsUpdated(presets) => {
                if !presets.is_empty() {
                    self.picker = Some(PresetPicker {
                        presets: presets.clone(),
                        selected: 0,
                    });
                }
                Vec::new()
            }
            Message::Key(key) if self.picker.is_some() => self.picker_key(*key),
            Message::Key(key) if self.editing.is_some() => self.edit_key(*key),
            Message::Key(key) => self.browse_key(*key),
            _ => Vec::new(),
        }
    }

    fn view(&self) -> String {
        let Some(app) = &self.app else {
            return "No application selected.".to_string();
        };
        if self.loading {
            return format!("Loading {app}…");
        }
        let Some(config) = &self.config else {
            return format!("{app} is not loaded. Press Esc to go back.");
        };
        if config.fields.is_empty() {
            return format!("{app} has no editable fields.");
        }

        let pending = self.pending_changes().len();
        let mut lines = vec![if pending > 0 {
            format!("{app}: {pending} unsaved change(s)")
        } else {
            app.clone()
        }];
        lines.push(String::new());

        let rows = usize::from(self.height.saturating_sub(8)).max(1);
        let offset = self.selected.saturating_sub(rows.saturating_sub(1));
        lines.extend(
            config
                .fields
                .iter()
                .enumerate()
                .skip(offset)
                .take(rows)
                .map(|(i, field)| self.field_line(i, field)),
        );

        if let Some(picker) = &self.picker {
            lines.push(String::new());
            lines.push("Presets:".to_string());
            lines.extend(picker.presets.iter().enumerate().map(|(i, p)| {
                let marker = if i == picker.selected { "▸" } else { " " };
                format!("  {marker} {p}")
            }));
        }
        lines.join("\n")
    }

    fn set_size(&mut self, _width: u16, height: u16) {
        self.height = height;
    }
}
