//! # Messages
//!
//! Everything that can happen in ZeroUI becomes a `Message`.
//! User presses a key? That's `Message::Key`.
//! A load finishes on a worker? That's `Message::Completed { epoch, result }`.
//!
//! `update()` takes the model and one message and returns the commands to
//! run. There is exactly one match over this enum, in `core::update`, so
//! adding a variant is a compile error until it is handled.
//!
//! ```text
//! Model + Message  →  update()  →  Model' + [Command]
//! ```

use std::time::Duration;

use crate::core::command::{Epoch, Payload};
use crate::core::error::{CommandError, Fault, ValidationError};
use crate::data::{AppConfig, AppInfo, ValueMap};

/// Terminal-independent key input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Ctrl(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn icon(self) -> &'static str {
        match self {
            Severity::Info => "ℹ",
            Severity::Success => "✓",
            Severity::Warning => "⚠",
            Severity::Error => "✗",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Input and timers
    Key(Key),
    Resize { width: u16, height: u16 },
    Tick,
    /// Coalesced input, applied in order.
    Batch(Vec<Message>),

    // Command results
    Completed {
        epoch: Epoch,
        result: Result<Payload, CommandError>,
    },
    TimedOut {
        epoch: Epoch,
        operation: String,
        after: Duration,
    },

    // Lifecycle
    RefreshRequested,
    Interrupt,
    Quit,
    ComponentFault(Fault),
    Status { text: String, severity: Severity },
    Invalid(ValidationError),

    // Component messages
    AppSelected { app: String },
    AppsUpdated(Vec<AppInfo>),
    FormLoaded { config: AppConfig, values: ValueMap },
    ChangesSaved { keys: Vec<String> },
    ValuesReplaced(ValueMap),
    PresetsUpdated(Vec<String>),
    PresetChosen { preset: String },
}

impl Message {
    /// Raw input that goes through the event batcher.
    pub fn is_batchable(&self) -> bool {
        matches!(self, Message::Key(_) | Message::Resize { .. })
    }
}
