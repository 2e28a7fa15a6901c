//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::command::Command;
use crate::core::component::Component;
use crate::core::message::Message;
use crate::data::{AppConfig, AppInfo, DataProvider, ProviderError, Value, ValueMap};

/// A provider whose calls never complete. Only cancellation gets a worker
/// out of it.
pub struct HangingProvider;

#[async_trait]
impl DataProvider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn list_apps(&self) -> Result<Vec<AppInfo>, ProviderError> {
        std::future::pending().await
    }

    async fn load_config(&self, _app: &str) -> Result<AppConfig, ProviderError> {
        std::future::pending().await
    }

    async fn get_current_values(&self, _app: &str) -> Result<ValueMap, ProviderError> {
        std::future::pending().await
    }

    async fn apply_change(
        &self,
        _app: &str,
        _key: &str,
        _value: &Value,
    ) -> Result<(), ProviderError> {
        std::future::pending().await
    }

    async fn apply_changes(
        &self,
        _app: &str,
        _changes: &[(String, Value)],
    ) -> Result<(), ProviderError> {
        std::future::pending().await
    }

    async fn list_presets(&self, _app: &str) -> Result<Vec<String>, ProviderError> {
        std::future::pending().await
    }

    async fn apply_preset(&self, _app: &str, _preset: &str) -> Result<ValueMap, ProviderError> {
        std::future::pending().await
    }
}

/// A provider that panics on every call.
pub struct PanickingProvider;

#[async_trait]
impl DataProvider for PanickingProvider {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn list_apps(&self) -> Result<Vec<AppInfo>, ProviderError> {
        panic!("provider exploded")
    }

    async fn load_config(&self, _app: &str) -> Result<AppConfig, ProviderError> {
        panic!("provider exploded")
    }

    async fn get_current_values(&self, _app: &str) -> Result<ValueMap, ProviderError> {
        panic!("provider exploded")
    }

    async fn apply_change(
        &self,
        _app: &str,
        _key: &str,
        _value: &Value,
    ) -> Result<(), ProviderError> {
        panic!("provider exploded")
    }

    async fn apply_changes(
        &self,
        _app: &str,
        _changes: &[(String, Value)],
    ) -> Result<(), ProviderError> {
        panic!("provider exploded")
    }

    async fn list_presets(&self, _app: &str) -> Result<Vec<String>, ProviderError> {
        panic!("provider exploded")
    }

    async fn apply_preset(&self, _app: &str, _preset: &str) -> Result<ValueMap, ProviderError> {
        panic!("provider exploded")
    }
}

/// Counters shared between a [`CountingComponent`] and the test holding it.
#[derive(Default)]
pub struct CallStats {
    pub calls: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

/// Records how often `update` runs and how many calls ever overlapped.
pub struct CountingComponent {
    stats: Arc<CallStats>,
}

impl CountingComponent {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(CallStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<CallStats> {
        self.stats.clone()
    }
}

impl Component for CountingComponent {
    fn name(&self) -> &str {
        "counting"
    }

    fn update(&mut self, _msg: &Message) -> Vec<Command> {
        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_active.fetch_max(active, Ordering::SeqCst);
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
        Vec::new()
    }

    fn view(&self) -> String {
        format!("counting: {} call(s)", self.stats.calls.load(Ordering::SeqCst))
    }

    fn set_size(&mut self, _width: u16, _height: u16) {}
}

/// A component that panics in one phase and behaves in the other.
pub struct PanickingComponent {
    in_view: bool,
}

impl PanickingComponent {
    pub fn in_view() -> Self {
        Self { in_view: true }
    }

    pub fn in_update() -> Self {
        Self { in_view: false }
    }
}

impl Component for PanickingComponent {
    fn name(&self) -> &str {
        "panicking"
    }

    fn update(&mut self, _msg: &Message) -> Vec<Command> {
        if !self.in_view {
            panic!("update exploded");
        }
        Vec::new()
    }

    fn view(&self) -> String {
        if self.in_view {
            panic!("view exploded");
        }
        "still standing".to_string()
    }

    fn set_size(&mut self, _width: u16, _height: u16) {}
}

/// Blocks the calling thread for `delay` on every `view`.
pub struct SlowComponent {
    delay: Duration,
}

impl SlowComponent {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Component for SlowComponent {
    fn name(&self) -> &str {
        "slow"
    }

    fn update(&mut self, _msg: &Message) -> Vec<Command> {
        Vec::new()
    }

    fn view(&self) -> String {
        std::thread::sleep(self.delay);
        "slow but done".to_string()
    }

    fn set_size(&mut self, _width: u16, _height: u16) {}
}

/// A component whose `name` panics once the shared switch is set. `name`
/// is read outside the per-component guard, so the panic escapes to the
/// loop and renderer guards.
pub struct BrittleComponent {
    armed: Arc<AtomicBool>,
}

impl BrittleComponent {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let armed = Arc::new(AtomicBool::new(false));
        (
            Self {
                armed: armed.clone(),
            },
            armed,
        )
    }
}

impl Component for BrittleComponent {
    fn name(&self) -> &str {
        if self.armed.load(Ordering::SeqCst) {
            panic!("name lookup exploded");
        }
        "brittle"
    }

    fn update(&mut self, _msg: &Message) -> Vec<Command> {
        Vec::new()
    }

    fn view(&self) -> String {
        "brittle body".to_string()
    }

    fn set_size(&mut self, _width: u16, _height: u16) {}
}
