//! # Application State
//!
//! The single `Model` owned by the event loop. Domain logic only: no terminal
//! types, no I/O.
//!
//! ```text
//! Model
//! ├── machine: StateMachine        // current view + bounded history
//! ├── components: Components       // one per screen
//! ├── boundary: ErrorBoundary      // catches component panics
//! ├── cache: RenderCache           // memoized frames per view
//! ├── refresh: RefreshDebouncer    // throttles app rescans
//! ├── width, height                // last terminal size
//! ├── current_app: Option<String>  // app whose values are loaded
//! ├── error: Option<AppError>      // last error, shown until cleared
//! ├── status: Option<Status>       // transient status line
//! ├── confirm: Option<ConfirmIntent>
//! ├── frame_count, last_render,    // render bookkeeping
//! │   slow_frames
//! └── in_flight: HashMap<Epoch, InFlight>
//! ```
//!
//! State changes only happen through `update(model, msg, now)` in update.rs.

use std::collections::HashMap;
use std::time::Instant;

use log::{debug, info, warn};

use crate::components::{AppGrid, AppList, ConfigForm, HelpPanel, ProgressPanel};
use crate::core::boundary::ErrorBoundary;
use crate::core::command::{Command, Epoch, Operation, OperationKind, Task};
use crate::core::component::Component;
use crate::core::config::{ListLayout, Settings};
use crate::core::debounce::RefreshDebouncer;
use crate::core::error::{AppError, FaultPhase};
use crate::core::message::{Message, Severity};
use crate::core::render_cache::RenderCache;
use crate::core::view_state::{GuardContext, StateMachine, Transition, ViewState};

#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub text: String,
    pub severity: Severity,
    pub expires_at: Instant,
}

/// Why the Confirm view is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmIntent {
    /// Back to the app list.
    Leave,
    /// Out of the program.
    Quit,
}

/// Bookkeeping for a dispatched task.
#[derive(Debug, Clone)]
pub struct InFlight {
    pub operation: Operation,
    pub label: String,
    /// Where to go when the task settles, if it owns the Progress view.
    pub return_to: Option<ViewState>,
    pub started_at: Instant,
}

pub struct Components {
    pub list: Box<dyn Component>,
    pub form: ConfigForm,
    pub help: HelpPanel,
    pub progress: ProgressPanel,
}

impl Components {
    pub fn new(layout: ListLayout) -> Self {
        let list: Box<dyn Component> = match layout {
            ListLayout::List => Box::new(AppList::new()),
            ListLayout::Grid => Box::new(AppGrid::new()),
        };
        Self {
            list,
            form: ConfigForm::new(),
            help: HelpPanel::new(),
            progress: ProgressPanel::new(),
        }
    }

    /// The component that renders `state`. Confirm is drawn by the model.
    pub fn for_state(&mut self, state: ViewState) -> Option<&mut dyn Component> {
        match state {
            ViewState::List => Some(self.list.as_mut()),
            ViewState::Form => Some(&mut self.form),
            ViewState::Help => Some(&mut self.help),
            ViewState::Progress => Some(&mut self.progress),
            ViewState::Confirm => None,
        }
    }

    pub fn all_mut(&mut self) -> [&mut dyn Component; 4] {
        [
            self.list.as_mut(),
            &mut self.form,
            &mut self.help,
            &mut self.progress,
        ]
    }
}

pub struct Model {
    pub machine: StateMachine,
    pub components: Components,
    pub boundary: ErrorBoundary,
    pub cache: RenderCache,
    pub refresh: RefreshDebouncer,
    pub settings: Settings,
    pub width: u16,
    pub height: u16,
    pub current_app: Option<String>,
    pub error: Option<AppError>,
    pub status: Option<Status>,
    pub confirm: Option<ConfirmIntent>,
    pub frame_count: u64,
    pub last_render: Option<Instant>,
    /// Frames that took longer than the render budget.
    pub slow_frames: u64,
    pub exit_code: i32,
    /// Results dropped because their epoch was no longer in flight.
    pub discarded: u64,
    initial_app: Option<String>,
    next_epoch: Epoch,
    in_flight: HashMap<Epoch, InFlight>,
}

impl Model {
    pub fn new(settings: &Settings) -> Self {
        Self {
            machine: StateMachine::default(),
            components: Components::new(settings.list_layout),
            boundary: ErrorBoundary::new(),
            cache: RenderCache::new(settings.render_cache_ttl),
            refresh: RefreshDebouncer::new(settings.refresh_debounce),
            settings: settings.clone(),
            width: 0,
            height: 0,
            current_app: None,
            error: None,
            status: None,
            confirm: None,
            frame_count: 0,
            last_render: None,
            slow_frames: 0,
            exit_code: 0,
            discarded: 0,
            initial_app: None,
            next_epoch: 0,
            in_flight: HashMap::new(),
        }
    }

    /// Open `app` straight away instead of starting on the list.
    pub fn with_initial_app(mut self, app: Option<String>) -> Self {
        self.initial_app = app;
        self
    }

    /// Commands to run once, before the first message.
    pub fn init(&mut self) -> Vec<Command> {
        let Model {
            components,
            boundary,
            ..
        } = self;
        let mut commands = Vec::new();
        for component in components.all_mut() {
            let name = component.name().to_string();
            let (init, _) = boundary.guard(&name, FaultPhase::Update, || component.init(), Vec::new);
            commands.extend(init);
        }
        if let Some(app) = self.initial_app.take() {
            commands.push(Command::Emit(Message::AppSelected { app }));
        }
        commands
    }

    pub fn guard_context(&self) -> GuardContext {
        GuardContext {
            unsaved_changes: self.components.form.has_unsaved_changes(),
        }
    }

    /// Request a view change through the table. Rejections leave the view
    /// alone and surface as a warning.
    pub fn go_to(&mut self, to: ViewState, now: Instant) -> Option<Transition> {
        let result = self.machine.transition(to, self.guard_context());
        self.after_transition(result, now)
    }

    pub fn go_back(&mut self, now: Instant) -> Option<Transition> {
        let result = self.machine.back(self.guard_context());
        self.after_transition(result, now)
    }

    fn after_transition(
        &mut self,
        result: Result<Transition, crate::core::view_state::TransitionError>,
        now: Instant,
    ) -> Option<Transition> {
        match result {
            Ok(transition) => {
                if transition.changed() {
                    info!("View {:?}", transition);
                    self.cache.invalidate();
                    self.error = None;
                }
                Some(transition)
            }
            Err(e) => {
                warn!("Rejected view change: {e}");
                let err = AppError::IllegalTransition(e);
                self.set_status(err.to_string(), Severity::Warning, now);
                None
            }
        }
    }

    /// Issue a task for `operation`. Older reads of the same kind are
    /// superseded: they leave the in-flight set and get a cancel.
    pub fn begin(
        &mut self,
        operation: Operation,
        return_to: Option<ViewState>,
        now: Instant,
    ) -> Vec<Command> {
        let mut commands = Vec::new();
        if !operation.is_write() {
            let kind = operation.kind();
            let stale: Vec<Epoch> = self
                .in_flight
                .iter()
                .filter(|(_, f)| f.operation.kind() == kind)
                .map(|(epoch, _)| *epoch)
                .collect();
            for epoch in stale {
                debug!("Epoch {epoch} superseded by a newer {kind:?}");
                self.in_flight.remove(&epoch);
                commands.push(Command::Cancel(epoch));
            }
        }

        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let label = operation.label();
        debug!("Dispatching epoch {epoch}: {label}");
        self.in_flight.insert(
            epoch,
            InFlight {
                operation: operation.clone(),
                label,
                return_to,
                started_at: now,
            },
        );
        commands.push(Command::Run(Task {
            epoch,
            operation,
            timeout: Some(self.settings.command_timeout),
        }));
        commands
    }

    /// Take the bookkeeping for `epoch`. `None` means the result is stale.
    pub fn settle(&mut self, epoch: Epoch) -> Option<InFlight> {
        self.in_flight.remove(&epoch)
    }

    pub fn is_in_flight(&self, epoch: Epoch) -> bool {
        self.in_flight.contains_key(&epoch)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Abandon whatever owns the Progress view. Returns the cancels and the
    /// view to go back to.
    pub fn cancel_progress(&mut self) -> (Vec<Command>, Option<ViewState>) {
        let owners: Vec<(Epoch, Option<ViewState>)> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.return_to.is_some())
            .map(|(epoch, f)| (*epoch, f.return_to))
            .collect();
        let mut commands = Vec::new();
        let mut origin = None;
        for (epoch, return_to) in owners {
            self.in_flight.remove(&epoch);
            info!("Cancelling epoch {epoch}");
            commands.push(Command::Cancel(epoch));
            origin = origin.or(return_to);
        }
        (commands, origin)
    }

    /// Cancel every in-flight task of `kind`.
    pub fn cancel_kind(&mut self, kind: OperationKind) -> Vec<Command> {
        let epochs: Vec<Epoch> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.operation.kind() == kind)
            .map(|(epoch, _)| *epoch)
            .collect();
        epochs
            .into_iter()
            .map(|epoch| {
                self.in_flight.remove(&epoch);
                info!("Cancelling epoch {epoch}");
                Command::Cancel(epoch)
            })
            .collect()
    }

    pub fn kind_in_flight(&self, kind: OperationKind) -> bool {
        self.in_flight.values().any(|f| f.operation.kind() == kind)
    }

    pub fn set_status(&mut self, text: impl Into<String>, severity: Severity, now: Instant) {
        self.status = Some(Status {
            text: text.into(),
            severity,
            expires_at: now + self.settings.status_ttl,
        });
        self.cache.invalidate();
    }

    pub fn active_status(&self, now: Instant) -> Option<&Status> {
        self.status.as_ref().filter(|s| now < s.expires_at)
    }

    /// Drop an expired status. True if something was cleared.
    pub fn expire_status(&mut self, now: Instant) -> bool {
        if self.status.as_ref().is_some_and(|s| now >= s.expires_at) {
            self.status = None;
            self.cache.invalidate();
            return true;
        }
        false
    }

    pub fn set_error(&mut self, err: AppError, now: Instant) {
        self.set_status(err.to_string(), Severity::Error, now);
        self.error = Some(err);
    }

    pub fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.cache.invalidate();
        }
    }

    /// Drop back to the app list after a fault, bypassing the table.
    pub fn reset_to_safe(&mut self) {
        warn!(
            "Resetting view from {} to {}",
            self.machine.current(),
            ViewState::List
        );
        self.machine.reset(ViewState::List);
        self.confirm = None;
        self.current_app = None;
        self.components.form.clear();
        self.cache.invalidate();
    }
}
