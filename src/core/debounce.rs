//! # Batching and Debouncing
//!
//! Two separate throttles sit in front of `update()`:
//!
//! - [`EventBatcher`] coalesces bursts of key/resize input. Events are
//!   buffered until the batch is full or the batch window has elapsed since
//!   the first buffered event; one event is emitted alone, more become an
//!   ordered `Message::Batch`.
//! - [`RefreshDebouncer`] throttles external refresh requests with a
//!   drop-latest policy: a request runs only if the interval has elapsed
//!   since the last request that ran. Requests inside the window are
//!   discarded, never queued or re-armed.

use std::time::{Duration, Instant};

use crate::core::message::Message;

#[derive(Debug)]
pub struct EventBatcher {
    max_size: usize,
    window: Duration,
    pending: Vec<Message>,
    first_at: Option<Instant>,
}

impl EventBatcher {
    pub fn new(max_size: usize, window: Duration) -> Self {
        Self {
            max_size: max_size.max(1),
            window,
            pending: Vec::new(),
            first_at: None,
        }
    }

    /// Buffer an event. Returns the batch once it is full.
    pub fn submit(&mut self, msg: Message, now: Instant) -> Option<Message> {
        if self.pending.is_empty() {
            self.first_at = Some(now);
        }
        self.pending.push(msg);
        if self.pending.len() >= self.max_size {
            return self.flush();
        }
        None
    }

    /// Returns the batch if its window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<Message> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// When the current batch must be flushed, if anything is buffered.
    pub fn deadline(&self) -> Option<Instant> {
        self.first_at.map(|first| first + self.window)
    }

    /// Emit whatever is buffered, regardless of size or window.
    pub fn flush(&mut self) -> Option<Message> {
        self.first_at = None;
        match self.pending.len() {
            0 => None,
            1 => self.pending.pop(),
            _ => Some(Message::Batch(std::mem::take(&mut self.pending))),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RefreshDebouncer {
    interval: Duration,
    last_executed: Option<Instant>,
    dropped: u64,
}

impl RefreshDebouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_executed: None,
            dropped: 0,
        }
    }

    /// True if the refresh should run now. Records the execution time when it
    /// does; counts the drop when it doesn't.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        let ready = self
            .last_executed
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if ready {
            self.last_executed = Some(now);
        } else {
            self.dropped += 1;
        }
        ready
    }

    pub fn last_executed(&self) -> Option<Instant> {
        self.last_executed
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
