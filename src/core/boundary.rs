//! # Error Boundary
//!
//! Wraps calls into components (and the loop's own update/view) in
//! `catch_unwind`. A panic is turned into a [`Fault`], logged, and replaced by
//! the caller's fallback value. Faults pile up here until the event loop
//! drains them and posts one `Message::ComponentFault` per fault.
//!
//! A component whose `view` faulted is *tripped*: later renders skip it and
//! show the fallback straight away, until its `update` succeeds again. That
//! keeps a view that always panics from faulting on every frame.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

use log::error;

use crate::core::error::{Fault, FaultPhase};

#[derive(Debug, Default)]
pub struct ErrorBoundary {
    faults: Vec<Fault>,
    tripped: HashSet<String>,
    total: u64,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, or `fallback` if `f` panicked. The flag says which happened.
    pub fn guard<T>(
        &mut self,
        component: &str,
        phase: FaultPhase,
        f: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> (T, bool) {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => {
                if phase == FaultPhase::Update {
                    self.tripped.remove(component);
                }
                (value, false)
            }
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                error!("Recovered {} fault in {}: {}", phase.label(), component, detail);
                if phase == FaultPhase::View {
                    self.tripped.insert(component.to_string());
                }
                self.total += 1;
                self.faults.push(Fault {
                    component: component.to_string(),
                    phase,
                    detail,
                });
                (fallback(), true)
            }
        }
    }

    pub fn is_tripped(&self, component: &str) -> bool {
        self.tripped.contains(component)
    }

    pub fn take_faults(&mut self) -> Vec<Fault> {
        std::mem::take(&mut self.faults)
    }

    /// Forget the most recent fault without reporting it.
    pub fn discard_last(&mut self) -> Option<Fault> {
        self.faults.pop()
    }

    /// Faults caught since startup.
    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Plain-text panel shown in place of a component that faulted.
pub fn fallback_panel(component: &str) -> String {
    format!(
        "⚠ {component} failed to render.\n\nThe error was logged. Press Esc to go back or r to retry."
    )
}
