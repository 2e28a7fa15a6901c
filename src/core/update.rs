//! # Update
//!
//! The reducer: `update(model, msg, now)` applies one message and returns the
//! commands to run. It is the only place the model changes, and it is only
//! ever called from the event loop, one message at a time.
//!
//! ```text
//! Key ─┬─ Confirm view?        → y / n
//!      ├─ form capturing input → form
//!      ├─ q ? Esc r s p        → global actions
//!      └─ otherwise            → component of the current view
//! ```

use std::time::Instant;

use log::{debug, info, warn};

use crate::core::command::{Command, Epoch, Operation, OperationKind, Payload};
use crate::core::error::{AppError, CommandError, Fault, FaultPhase};
use crate::core::message::{Key, Message, Severity};
use crate::core::state::{ConfirmIntent, InFlight, Model};
use crate::core::view_state::{Transition, ViewState};

pub fn update(model: &mut Model, msg: Message, now: Instant) -> Vec<Command> {
    match msg {
        Message::Key(key) => handle_key(model, key, now),
        Message::Resize { width, height } => handle_resize(model, width, height),
        Message::Tick => handle_tick(model, now),
        Message::Batch(messages) => {
            let mut commands = Vec::new();
            for msg in messages {
                commands.extend(update(model, msg, now));
            }
            commands
        }
        Message::Completed { epoch, result } => handle_completed(model, epoch, result, now),
        Message::TimedOut {
            epoch,
            operation,
            after,
        } => handle_timeout(model, epoch, operation, after.as_millis() as u64, now),
        Message::RefreshRequested => request_refresh(model, now),
        Message::Interrupt => {
            info!("Interrupted, shutting down");
            model.exit_code = 130;
            vec![Command::Quit]
        }
        Message::Quit => vec![Command::Quit],
        Message::ComponentFault(fault) => handle_fault(model, fault, now),
        Message::Status { text, severity } => {
            model.set_status(text, severity, now);
            Vec::new()
        }
        Message::Invalid(e) => {
            debug!("Rejected input: {e}");
            model.set_status(AppError::from(e).to_string(), Severity::Warning, now);
            Vec::new()
        }
        Message::AppSelected { app } => open_app(model, app, now),
        Message::PresetChosen { preset } => apply_preset(model, preset, now),
        msg @ Message::AppsUpdated(_) => deliver(model, ViewState::List, &msg),
        msg @ (Message::FormLoaded { .. }
        | Message::ChangesSaved { .. }
        | Message::ValuesReplaced(_)
        | Message::PresetsUpdated(_)) => deliver(model, ViewState::Form, &msg),
    }
}

/// Hand a message to the component behind `state`, inside the boundary.
/// Its cached frame is dropped since the component may have changed.
fn deliver(model: &mut Model, state: ViewState, msg: &Message) -> Vec<Command> {
    let Model {
        components,
        boundary,
        cache,
        ..
    } = model;
    let Some(component) = components.for_state(state) else {
        return Vec::new();
    };
    let name = component.name().to_string();
    let (commands, _) = boundary.guard(&name, FaultPhase::Update, || component.update(msg), Vec::new);
    cache.invalidate_state(state);
    commands
}

// ============================================================================
// Input
// ============================================================================

fn handle_key(model: &mut Model, key: Key, now: Instant) -> Vec<Command> {
    if key == Key::Ctrl('c') {
        return vec![Command::Quit];
    }

    let state = model.machine.current();
    if state == ViewState::Confirm {
        return handle_confirm_key(model, key, now);
    }
    if state == ViewState::Form && model.components.form.captures_input() {
        return deliver(model, ViewState::Form, &Message::Key(key));
    }

    match key {
        Key::Char('q') => request_quit(model, now),
        Key::Char('?') => toggle_help(model, now),
        Key::Esc => handle_back(model, now),
        Key::Char('r') if state == ViewState::List => request_refresh(model, now),
        Key::Char('s') if state == ViewState::Form => save(model, now),
        Key::Char('p') if state == ViewState::Form => list_presets(model, now),
        _ => deliver(model, state, &Message::Key(key)),
    }
}

fn handle_confirm_key(model: &mut Model, key: Key, now: Instant) -> Vec<Command> {
    match key {
        Key::Char('y') | Key::Char('Y') | Key::Enter => {
            let intent = model.confirm.take().unwrap_or(ConfirmIntent::Leave);
            model.components.form.discard_changes();
            match intent {
                ConfirmIntent::Quit => vec![Command::Quit],
                ConfirmIntent::Leave => {
                    if model.go_to(ViewState::List, now).is_some() {
                        return close_form(model, now);
                    }
                    Vec::new()
                }
            }
        }
        Key::Char('n') | Key::Char('N') | Key::Esc => {
            model.confirm = None;
            model.go_to(ViewState::Form, now);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn request_quit(model: &mut Model, now: Instant) -> Vec<Command> {
    if model.machine.current() == ViewState::Form && model.components.form.has_unsaved_changes() {
        if model.go_to(ViewState::Confirm, now).is_some() {
            model.confirm = Some(ConfirmIntent::Quit);
        }
        return Vec::new();
    }
    vec![Command::Quit]
}

fn toggle_help(model: &mut Model, now: Instant) -> Vec<Command> {
    if model.machine.current() == ViewState::Help {
        if model.go_back(now).is_none() {
            model.go_to(ViewState::List, now);
        }
    } else {
        model.go_to(ViewState::Help, now);
    }
    Vec::new()
}

fn handle_back(model: &mut Model, now: Instant) -> Vec<Command> {
    match model.machine.current() {
        ViewState::List => vec![Command::Quit],
        ViewState::Form => leave_form(model, now),
        ViewState::Help => {
            if model.go_back(now).is_none() {
                model.go_to(ViewState::List, now);
            }
            Vec::new()
        }
        ViewState::Progress => {
            let (commands, origin) = model.cancel_progress();
            model.set_status("Cancelled", Severity::Info, now);
            model.go_to(origin.unwrap_or(ViewState::Form), now);
            commands
        }
        ViewState::Confirm => handle_confirm_key(model, Key::Esc, now),
    }
}

fn leave_form(model: &mut Model, now: Instant) -> Vec<Command> {
    match model.go_to(ViewState::List, now) {
        Some(Transition::Moved { .. }) => close_form(model, now),
        Some(Transition::Diverted { .. }) => {
            model.confirm = Some(ConfirmIntent::Leave);
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Back on the list: forget the app, drop a pending load and rescan.
fn close_form(model: &mut Model, now: Instant) -> Vec<Command> {
    model.current_app = None;
    model.components.form.clear();
    let mut commands = model.cancel_kind(OperationKind::LoadConfig);
    commands.extend(request_refresh(model, now));
    commands
}

fn handle_resize(model: &mut Model, width: u16, height: u16) -> Vec<Command> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let (max_dw, max_dh) = model.settings.resize_threshold;
    let significant =
        model.width.abs_diff(width) > max_dw || model.height.abs_diff(height) > max_dh;
    model.width = width;
    model.height = height;

    let Model {
        components,
        boundary,
        ..
    } = model;
    for component in components.all_mut() {
        let name = component.name().to_string();
        boundary.guard(
            &name,
            FaultPhase::Update,
            || component.set_size(width, height),
            || (),
        );
    }

    if significant {
        debug!("Significant resize to {width}x{height}, dropping cached frames");
        model.cache.invalidate();
    }
    Vec::new()
}

fn handle_tick(model: &mut Model, now: Instant) -> Vec<Command> {
    model.expire_status(now);
    if model.machine.current() == ViewState::Progress {
        return deliver(model, ViewState::Progress, &Message::Tick);
    }
    Vec::new()
}

fn request_refresh(model: &mut Model, now: Instant) -> Vec<Command> {
    if !model.refresh.try_acquire(now) {
        debug!("Refresh dropped, last one ran too recently");
        return Vec::new();
    }
    model.begin(Operation::ListApps, None, now)
}

// ============================================================================
// Form actions
// ============================================================================

fn open_app(model: &mut Model, app: String, now: Instant) -> Vec<Command> {
    match model.go_to(ViewState::Form, now) {
        Some(transition) if transition.target() == ViewState::Form => {
            info!("Opening {app}");
            model.components.form.begin_loading(&app);
            model.clear_error();
            model.begin(Operation::LoadConfig { app }, None, now)
        }
        _ => Vec::new(),
    }
}

fn save(model: &mut Model, now: Instant) -> Vec<Command> {
    let form = &model.components.form;
    let Some(app) = form.app().filter(|_| form.is_loaded()).map(str::to_string) else {
        model.set_status("Nothing loaded to save", Severity::Warning, now);
        return Vec::new();
    };
    let changes = form.pending_changes();
    if changes.is_empty() {
        model.set_status("No changes to save", Severity::Info, now);
        return Vec::new();
    }
    start_progress(model, Operation::SaveChanges { app, changes }, now)
}

fn list_presets(model: &mut Model, now: Instant) -> Vec<Command> {
    let form = &model.components.form;
    match form.app().filter(|_| form.is_loaded()).map(str::to_string) {
        Some(app) => model.begin(Operation::ListPresets { app }, None, now),
        None => {
            model.set_status("Load an app before picking a preset", Severity::Warning, now);
            Vec::new()
        }
    }
}

fn apply_preset(model: &mut Model, preset: String, now: Instant) -> Vec<Command> {
    let app = match (model.machine.current(), model.components.form.app()) {
        (ViewState::Form, Some(app)) => app.to_string(),
        _ => {
            warn!("Preset {preset} chosen outside the form, ignoring");
            return Vec::new();
        }
    };
    start_progress(model, Operation::ApplyPreset { app, preset }, now)
}

/// Show Progress for a write and dispatch it.
fn start_progress(model: &mut Model, operation: Operation, now: Instant) -> Vec<Command> {
    let origin = model.machine.current();
    if model.go_to(ViewState::Progress, now).is_none() {
        return Vec::new();
    }
    model.components.progress.start(&operation.label());
    model.begin(operation, Some(origin), now)
}

// ============================================================================
// Command results
// ============================================================================

fn handle_completed(
    model: &mut Model,
    epoch: Epoch,
    result: Result<Payload, CommandError>,
    now: Instant,
) -> Vec<Command> {
    let Some(flight) = model.settle(epoch) else {
        model.discarded += 1;
        debug!("Discarding result for epoch {epoch}, no longer in flight");
        return Vec::new();
    };

    let commands = match result {
        Ok(payload) => {
            debug!(
                "Epoch {epoch} ({}) finished in {:?}",
                flight.label,
                now.saturating_duration_since(flight.started_at)
            );
            apply_payload(model, payload, now)
        }
        Err(CommandError::Cancelled) => {
            debug!("Epoch {epoch} ({}) was cancelled", flight.label);
            Vec::new()
        }
        Err(source) => {
            warn!("{} failed: {source}", flight.label);
            if flight.operation.kind() == OperationKind::LoadConfig {
                model.components.form.abandon_loading();
            }
            model.set_error(
                AppError::CommandFailure {
                    operation: flight.label.clone(),
                    source,
                },
                now,
            );
            Vec::new()
        }
    };
    finish_progress(model, &flight, now);
    commands
}

fn apply_payload(model: &mut Model, payload: Payload, now: Instant) -> Vec<Command> {
    match payload {
        Payload::Apps(apps) => {
            debug!("Found {} apps", apps.len());
            deliver(model, ViewState::List, &Message::AppsUpdated(apps))
        }
        Payload::ConfigLoaded {
            app,
            config,
            values,
        } => {
            if model.components.form.app() != Some(app.as_str()) {
                debug!("Dropping config for {app}, the form moved on");
                return Vec::new();
            }
            model.current_app = Some(app);
            model.clear_error();
            deliver(model, ViewState::Form, &Message::FormLoaded { config, values })
        }
        Payload::Saved { app, keys } => {
            let count = keys.len();
            let commands = deliver(model, ViewState::Form, &Message::ChangesSaved { keys });
            let at = chrono::Local::now().format("%H:%M:%S");
            info!("Saved {count} change(s) to {app}");
            model.set_status(
                format!("Saved {count} change(s) to {app} at {at}"),
                Severity::Success,
                now,
            );
            commands
        }
        Payload::Presets { app, presets } => {
            if presets.is_empty() {
                model.set_status(format!("{app} has no presets"), Severity::Info, now);
                return Vec::new();
            }
            deliver(model, ViewState::Form, &Message::PresetsUpdated(presets))
        }
        Payload::PresetApplied {
            app,
            preset,
            values,
        } => {
            let commands = deliver(model, ViewState::Form, &Message::ValuesReplaced(values));
            model.set_status(
                format!("Applied preset {preset} to {app}"),
                Severity::Success,
                now,
            );
            commands
        }
    }
}

fn handle_timeout(
    model: &mut Model,
    epoch: Epoch,
    operation: String,
    after_ms: u64,
    now: Instant,
) -> Vec<Command> {
    let Some(flight) = model.settle(epoch) else {
        debug!("Timeout for settled epoch {epoch}, ignoring");
        return Vec::new();
    };
    let err = AppError::CommandTimeout {
        operation,
        after_ms,
    };
    warn!("{err}");
    if flight.operation.kind() == OperationKind::LoadConfig {
        model.components.form.abandon_loading();
    }
    model.set_status(err.to_string(), Severity::Warning, now);
    finish_progress(model, &flight, now);
    Vec::new()
}

/// Leave Progress once the task that opened it has settled.
fn finish_progress(model: &mut Model, flight: &InFlight, now: Instant) {
    if let Some(origin) = flight.return_to
        && model.machine.current() == ViewState::Progress
    {
        model.go_to(origin, now);
    }
}

fn handle_fault(model: &mut Model, fault: Fault, now: Instant) -> Vec<Command> {
    warn!("Component fault: {fault}");
    if model.machine.current() != ViewState::List || fault.phase != FaultPhase::View {
        model.reset_to_safe();
    }
    model.set_error(AppError::ComponentFault(fault), now);
    Vec::new()
}
