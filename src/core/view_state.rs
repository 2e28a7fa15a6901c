//! # View State Machine
//!
//! The set of screens is closed and every move between them goes through
//! [`StateMachine::transition`], which consults a declared table.
//!
//! ```text
//!            ┌──────────► Help ◄─────────┐
//!            │             │ ▲           │
//!            ▼             ▼ │           │
//!   List ◄──────────────► Form ──────► Progress
//!    ▲  ▲                  │  ▲          │
//!    │  └──── Confirm ◄────┘  └──────────┘
//!    └────────────────────────────────────┘
//! ```
//!
//! Pairs missing from the table are rejected: the current state is left
//! untouched and the caller gets `TransitionError::Illegal`. The edge
//! Form → List is guarded; with unsaved changes it is diverted to Confirm.

use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewState {
    List,
    Form,
    Confirm,
    Help,
    Progress,
}

impl ViewState {
    pub const ALL: [ViewState; 5] = [
        ViewState::List,
        ViewState::Form,
        ViewState::Confirm,
        ViewState::Help,
        ViewState::Progress,
    ];

    /// States whose substate mutates without a matching cache write.
    pub fn is_volatile(self) -> bool {
        matches!(self, ViewState::Form | ViewState::Confirm)
    }

    pub fn name(self) -> &'static str {
        match self {
            ViewState::List => "List",
            ViewState::Form => "Form",
            ViewState::Confirm => "Confirm",
            ViewState::Help => "Help",
            ViewState::Progress => "Progress",
        }
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Condition attached to an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Leaving is only allowed when the form has no unsaved changes.
    NoUnsavedChanges,
}

/// Facts the guards are evaluated against.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardContext {
    pub unsaved_changes: bool,
}

use ViewState::*;

/// (from, to, guard). Anything not listed is illegal.
const TRANSITIONS: &[(ViewState, ViewState, Option<Guard>)] = &[
    (List, List, None),
    (List, Form, None),
    (List, Help, None),
    (List, Progress, None),
    (Form, Form, None),
    (Form, List, Some(Guard::NoUnsavedChanges)),
    (Form, Help, None),
    (Form, Progress, None),
    (Form, Confirm, None),
    (Confirm, List, None),
    (Confirm, Form, None),
    (Help, Help, None),
    (Help, List, None),
    (Help, Form, None),
    (Progress, Progress, None),
    (Progress, List, None),
    (Progress, Form, None),
    (Progress, Help, None),
];

const MAX_HISTORY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("illegal transition {from} → {to}")]
    Illegal { from: ViewState, to: ViewState },
    #[error("no previous view to go back to")]
    NoHistory,
}

/// What a successful `transition` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved { from: ViewState, to: ViewState },
    /// A guard routed the request somewhere else.
    Diverted {
        from: ViewState,
        requested: ViewState,
        to: ViewState,
    },
}

impl Transition {
    pub fn target(self) -> ViewState {
        match self {
            Transition::Moved { to, .. } | Transition::Diverted { to, .. } => to,
        }
    }

    pub fn changed(self) -> bool {
        match self {
            Transition::Moved { from, to } | Transition::Diverted { from, to, .. } => from != to,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateMachine {
    current: ViewState,
    previous: ViewState,
    history: VecDeque<ViewState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new(ViewState::List)
    }
}

impl StateMachine {
    pub fn new(initial: ViewState) -> Self {
        Self {
            current: initial,
            previous: initial,
            history: VecDeque::from([initial]),
        }
    }

    pub fn current(&self) -> ViewState {
        self.current
    }

    pub fn previous(&self) -> ViewState {
        self.previous
    }

    pub fn history(&self) -> impl Iterator<Item = ViewState> + '_ {
        self.history.iter().copied()
    }

    /// Looks up the table entry for a pair. `None` means illegal.
    pub fn edge(from: ViewState, to: ViewState) -> Option<Option<Guard>> {
        TRANSITIONS
            .iter()
            .find(|(f, t, _)| *f == from && *t == to)
            .map(|(_, _, guard)| *guard)
    }

    pub fn is_declared(from: ViewState, to: ViewState) -> bool {
        Self::edge(from, to).is_some()
    }

    pub fn valid_targets(&self) -> Vec<ViewState> {
        TRANSITIONS
            .iter()
            .filter(|(from, _, _)| *from == self.current)
            .map(|(_, to, _)| *to)
            .collect()
    }

    pub fn transition(
        &mut self,
        to: ViewState,
        ctx: GuardContext,
    ) -> Result<Transition, TransitionError> {
        let from = self.current;
        let guard = Self::edge(from, to).ok_or(TransitionError::Illegal { from, to })?;

        match guard {
            Some(Guard::NoUnsavedChanges) if ctx.unsaved_changes => {
                // The diversion target must itself be declared.
                if !Self::is_declared(from, Confirm) {
                    return Err(TransitionError::Illegal { from, to: Confirm });
                }
                self.apply(Confirm);
                Ok(Transition::Diverted {
                    from,
                    requested: to,
                    to: Confirm,
                })
            }
            _ => {
                self.apply(to);
                Ok(Transition::Moved { from, to })
            }
        }
    }

    /// Return to the state before the current one, through the table.
    pub fn back(&mut self, ctx: GuardContext) -> Result<Transition, TransitionError> {
        if self.history.len() <= 1 {
            return Err(TransitionError::NoHistory);
        }
        let popped = self.history.pop_back();
        let target = self.history.back().copied().unwrap_or(List);
        let result = self.transition(target, ctx);
        if result.is_err()
            && let Some(state) = popped
        {
            self.history.push_back(state);
        }
        result
    }

    /// Jump straight to `state`, bypassing the table. Only used for
    /// recovery after a fault.
    pub fn reset(&mut self, state: ViewState) {
        self.current = state;
        self.previous = state;
        self.history = VecDeque::from([state]);
    }

    fn apply(&mut self, to: ViewState) {
        self.previous = self.current;
        self.current = to;
        if self.history.back() != Some(&to) {
            self.history.push_back(to);
            if self.history.len() > MAX_HISTORY {
                self.history.pop_front();
            }
        }
    }
}
