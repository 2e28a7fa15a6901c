//! # View
//!
//! Turns the model into a frame of plain text. The frame is served from the
//! render cache when a valid entry exists; otherwise it is composed, stored,
//! and counted.
//!
//! ```text
//! ZeroUI › Form › ghostty      header
//!
//! ...component body...         body (or fallback if the component faulted)
//!
//! ✓ Saved 2 change(s)          status or error, while it lasts
//! Enter edit · s save · ...    key hints
//! ```
//!
//! Every line is cut to the terminal width by display width.

use std::time::Instant;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::boundary::fallback_panel;
use crate::core::error::FaultPhase;
use crate::core::state::{ConfirmIntent, Model};
use crate::core::view_state::ViewState;

pub fn view(model: &mut Model, now: Instant) -> String {
    let state = model.machine.current();
    if let Some(frame) = model.cache.get(state, now) {
        return frame.to_string();
    }

    let body = render_body(model, state);
    let frame = compose(model, state, &body, now);
    model.cache.put(state, &frame, now);
    model.frame_count += 1;
    model.last_render = Some(now);
    frame
}

fn render_body(model: &mut Model, state: ViewState) -> String {
    if state == ViewState::Confirm {
        return confirm_text(model);
    }
    let Model {
        components,
        boundary,
        ..
    } = model;
    let Some(component) = components.for_state(state) else {
        return String::new();
    };
    let name = component.name().to_string();
    if boundary.is_tripped(&name) {
        return fallback_panel(&name);
    }
    let component = &*component;
    let (body, _) = boundary.guard(
        &name,
        FaultPhase::View,
        || component.view(),
        || fallback_panel(&name),
    );
    body
}

fn confirm_text(model: &Model) -> String {
    let form = &model.components.form;
    let app = form.app().unwrap_or("this app");
    let count = form.pending_changes().len();
    let action = match model.confirm.unwrap_or(ConfirmIntent::Leave) {
        ConfirmIntent::Leave => "go back",
        ConfirmIntent::Quit => "quit",
    };
    format!(
        "Discard {count} unsaved change(s) to {app} and {action}?\n\n  [y] discard    [n] keep editing"
    )
}

fn compose(model: &Model, state: ViewState, body: &str, now: Instant) -> String {
    let mut lines = Vec::new();
    lines.push(match (&model.current_app, state) {
        (Some(app), ViewState::Form | ViewState::Confirm | ViewState::Progress) => {
            format!("ZeroUI › {state} › {app}")
        }
        _ => format!("ZeroUI › {state}"),
    });
    lines.push(String::new());
    lines.extend(body.lines().map(str::to_string));
    lines.push(String::new());

    if let Some(status) = model.active_status(now) {
        lines.push(format!("{} {}", status.severity.icon(), status.text));
    }
    lines.push(hints(state).to_string());

    let width = match model.width {
        0 => usize::MAX,
        w => usize::from(w),
    };
    lines
        .iter()
        .map(|line| fit_width(line, width))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hints(state: ViewState) -> &'static str {
    match state {
        ViewState::List => "Enter open · r rescan · ? help · q quit",
        ViewState::Form => "Enter edit · s save · p presets · u revert · Esc back · ? help",
        ViewState::Confirm => "y discard · n keep editing",
        ViewState::Help => "↑↓ scroll · ? or Esc close",
        ViewState::Progress => "Esc cancel",
    }
}

/// Cut `line` to `width` columns, marking the cut with an ellipsis.
pub fn fit_width(line: &str, width: usize) -> String {
    if line.width() <= width {
        return line.to_string();
    }
    let budget = width.saturating_sub(1);
    let mut out = String::new();
    let mut used = 0;
    for ch in line.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    if width > 0 {
        out.push('…');
    }
    out
}
