//! # Render Cache
//!
//! Memoizes the rendered frame per view state. An entry is served only when
//! it was written for the requested state, is younger than the TTL, and the
//! state is not volatile. Anything that can change the rendered output calls
//! [`RenderCache::invalidate`] (or the narrower `invalidate_state`).
//!
//! Time is passed in by the caller so the loop and the tests agree on "now".

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::view_state::ViewState;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub text: String,
    pub written_at: Instant,
}

#[derive(Debug, Clone)]
pub struct RenderCache {
    ttl: Duration,
    entries: HashMap<ViewState, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl RenderCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the cached frame for `state` if it is still valid.
    pub fn get(&mut self, state: ViewState, now: Instant) -> Option<&str> {
        let valid = !state.is_volatile()
            && self
                .entries
                .get(&state)
                .is_some_and(|entry| now.saturating_duration_since(entry.written_at) < self.ttl);
        if valid {
            self.hits += 1;
            self.entries.get(&state).map(|entry| entry.text.as_str())
        } else {
            self.misses += 1;
            None
        }
    }

    /// Volatile states are never stored.
    pub fn put(&mut self, state: ViewState, text: &str, now: Instant) {
        if state.is_volatile() {
            return;
        }
        self.entries.insert(
            state,
            CacheEntry {
                text: text.to_string(),
                written_at: now,
            },
        );
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn invalidate_state(&mut self, state: ViewState) {
        self.entries.remove(&state);
    }

    pub fn contains(&self, state: ViewState) -> bool {
        self.entries.contains_key(&state)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since startup.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
