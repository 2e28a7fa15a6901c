use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::error::ValidationError;

/// A single configuration value. TOML values cover every type the editor
/// knows about (bool, integer, float, string, arrays).
pub type Value = toml::Value;

/// Current values for one app, keyed by field name.
pub type ValueMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    String,
    Choice,
}

impl FieldKind {
    fn expected(self) -> &'static str {
        match self {
            FieldKind::Bool => "true or false",
            FieldKind::Int => "an integer",
            FieldKind::Float => "a number",
            FieldKind::String => "text",
            FieldKind::Choice => "one of the listed choices",
        }
    }
}

/// Declaration of one editable field.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub choices: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: None,
            default: None,
            choices: Vec::new(),
        }
    }

    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Parse free-form user input into a value of this field's kind.
    pub fn parse(&self, input: &str) -> Result<Value, ValidationError> {
        let input = input.trim();
        let wrong_type = || ValidationError::WrongType {
            field: self.name.clone(),
            expected: self.kind.expected(),
            input: input.to_string(),
        };

        match self.kind {
            FieldKind::Bool => match input.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Boolean(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Boolean(false)),
                _ => Err(wrong_type()),
            },
            FieldKind::Int => input
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| wrong_type()),
            FieldKind::Float => input
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| wrong_type()),
            FieldKind::String => {
                if input.is_empty() {
                    Err(ValidationError::Empty {
                        field: self.name.clone(),
                    })
                } else {
                    Ok(Value::String(input.to_string()))
                }
            }
            FieldKind::Choice => {
                if self.choices.iter().any(|c| c == input) {
                    Ok(Value::String(input.to_string()))
                } else {
                    Err(ValidationError::NotAChoice {
                        field: self.name.clone(),
                        input: input.to_string(),
                        choices: self.choices.clone(),
                    })
                }
            }
        }
    }
}

/// Whether an app is ready to edit, as seen by the app scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppStatus {
    /// The definition parses and values have been saved before.
    Ready,
    /// The definition parses but nothing has been saved yet.
    NotConfigured,
    /// The definition could not be read.
    Error(String),
}

impl AppStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            AppStatus::Ready => "✓",
            AppStatus::NotConfigured => "○",
            AppStatus::Error(_) => "✗",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            AppStatus::Ready => "ready",
            AppStatus::NotConfigured => "not configured",
            AppStatus::Error(reason) => reason,
        }
    }
}

/// One entry of the app scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub name: String,
    pub status: AppStatus,
}

impl AppInfo {
    pub fn new(name: &str, status: AppStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

/// Everything the editor needs to know about one app.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Filled from the definition's file name when absent.
    #[serde(default)]
    pub name: String,
    /// Where the provider persists values for this app.
    #[serde(default)]
    pub values_file: Option<PathBuf>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub presets: BTreeMap<String, ValueMap>,
}

impl AppConfig {
    pub fn new(name: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.to_string(),
            values_file: None,
            fields,
            presets: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Render a value the way the form shows it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
