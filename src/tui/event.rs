//! Terminal input. A blocking thread polls crossterm and posts translated
//! messages into the event loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, warn};

use crate::core::message::{Key, Message};
use crate::runtime::LoopHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Translate one crossterm event. Key releases and repeats are dropped.
pub fn translate(event: Event) -> Option<Message> {
    match event {
        Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
            translate_key(key_event).map(Message::Key)
        }
        Event::Resize(width, height) => Some(Message::Resize { width, height }),
        // Bracketed paste arrives as one event; replay it as typing.
        Event::Paste(data) => {
            let keys: Vec<Message> = data
                .chars()
                .filter(|c| !c.is_control())
                .map(|c| Message::Key(Key::Char(c)))
                .collect();
            (!keys.is_empty()).then_some(Message::Batch(keys))
        }
        _ => None,
    }
}

fn translate_key(key_event: KeyEvent) -> Option<Key> {
    let key = match (key_event.modifiers, key_event.code) {
        (KeyModifiers::CONTROL, KeyCode::Char(c)) => Key::Ctrl(c.to_ascii_lowercase()),
        (_, KeyCode::Char(c)) => Key::Char(c),
        (_, KeyCode::Enter) => Key::Enter,
        (_, KeyCode::Esc) => Key::Esc,
        (_, KeyCode::Backspace) => Key::Backspace,
        (_, KeyCode::Tab) => Key::Tab,
        (_, KeyCode::Up) => Key::Up,
        (_, KeyCode::Down) => Key::Down,
        (_, KeyCode::Left) => Key::Left,
        (_, KeyCode::Right) => Key::Right,
        (_, KeyCode::Home) => Key::Home,
        (_, KeyCode::End) => Key::End,
        (_, KeyCode::PageUp) => Key::PageUp,
        (_, KeyCode::PageDown) => Key::PageDown,
        _ => return None,
    };
    Some(key)
}

/// Poll the terminal until `stop` is set or the loop goes away.
pub fn spawn_input_thread(handle: LoopHandle, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            match event::poll(POLL_INTERVAL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if let Some(msg) = translate(ev)
                            && !handle.post(msg)
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read terminal event: {e}");
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to poll terminal: {e}");
                    break;
                }
            }
        }
        debug!("Input thread stopped");
    })
}
