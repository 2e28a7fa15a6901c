//! # Error Taxonomy
//!
//! Every failure the core can observe falls into one of these kinds. Only
//! `InitError` ends the process; everything else is absorbed by the loop and
//! surfaces as a status line, a fallback render, or a rejected transition.
//!
//! ```text
//! Validation        → transient status (warning)
//! CommandFailure    → transient status (error)
//! CommandTimeout    → transient status (warning), model data untouched
//! ComponentFault    → fallback render, view forced back to List
//! IllegalTransition → rejected, diagnostic status
//! InitError         → returned to the caller before the loop starts
//! ```

use thiserror::Error;

use crate::core::view_state::TransitionError;
use crate::data::ProviderError;

/// Bad user input in the edit form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: expected {expected}, got '{input}'")]
    WrongType {
        field: String,
        expected: &'static str,
        input: String,
    },
    #[error("{field}: '{input}' is not one of {choices:?}")]
    NotAChoice {
        field: String,
        input: String,
        choices: Vec<String>,
    },
    #[error("{field}: value must not be empty")]
    Empty { field: String },
}

/// Why a command did not produce its payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The worker observed its cancellation signal and gave up.
    #[error("cancelled")]
    Cancelled,
    /// The worker panicked; the payload text is kept for the log.
    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// A fault caught at an error boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub component: String,
    pub phase: FaultPhase,
    pub detail: String,
}

/// Which call the boundary was wrapping when the fault happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPhase {
    Update,
    View,
    Loop,
}

impl FaultPhase {
    pub fn label(self) -> &'static str {
        match self {
            FaultPhase::Update => "update",
            FaultPhase::View => "view",
            FaultPhase::Loop => "loop",
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} fault: {}",
            self.component,
            self.phase.label(),
            self.detail
        )
    }
}

/// The runtime error kinds that the event loop absorbs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    ComponentFault(Fault),
    #[error("{operation} timed out after {after_ms}ms")]
    CommandTimeout { operation: String, after_ms: u64 },
    #[error("{operation} failed: {source}")]
    CommandFailure {
        operation: String,
        #[source]
        source: CommandError,
    },
    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),
}

/// A startup dependency failed before the loop could start.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("configuration: {0}")]
    Config(#[from] crate::core::config::ConfigError),
    #[error("data provider: {0}")]
    Provider(#[from] ProviderError),
    #[error("terminal: {0}")]
    Terminal(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display_names_component_and_phase() {
        let fault = Fault {
            component: "app-list".to_string(),
            phase: FaultPhase::View,
            detail: "index out of bounds".to_string(),
        };
        assert_eq!(fault.to_string(), "app-list view fault: index out of bounds");
    }

    #[test]
    fn test_command_failure_wraps_provider_error() {
        let err = AppError::CommandFailure {
            operation: "load ghostty".to_string(),
            source: CommandError::from(ProviderError::NotFound("ghostty".to_string())),
        };
        assert_eq!(err.to_string(), "load ghostty failed: not found: ghostty");
    }

    #[test]
    fn test_validation_error_message() {
        let err = ValidationError::WrongType {
            field: "font-size".to_string(),
            expected: "an integer",
            input: "big".to_string(),
        };
        assert_eq!(err.to_string(), "font-size: expected an integer, got 'big'");
    }
}
