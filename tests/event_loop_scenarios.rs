//! End-to-end runs of the event loop against the in-memory provider and a
//! recording surface. Time is paused, so latencies and timeouts are exact.

use std::sync::Arc;
use std::time::{Duration, Instant};

use zeroui::core::command::Command;
use zeroui::core::component::Component;
use zeroui::core::config::Settings;
use zeroui::core::update::update;
use zeroui::core::view::view;
use zeroui::core::{Key, Message, Model, ViewState};
use zeroui::data::MemoryProvider;
use zeroui::runtime::{EventLoop, LoopHandle, MemorySurface};

type Running = tokio::task::JoinHandle<(i32, Model)>;

fn start(model: Model, provider: MemoryProvider) -> (LoopHandle, MemorySurface, Running) {
    let surface = MemorySurface::new();
    let event_loop = EventLoop::new(model, Arc::new(provider), surface.clone());
    let handle = event_loop.handle();
    (handle, surface, tokio::spawn(event_loop.drive()))
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(500)).await;
}

async fn stop(handle: &LoopHandle, running: Running) -> (i32, Model) {
    handle.post(Message::Quit);
    running.await.expect("event loop task panicked")
}

#[tokio::test(start_paused = true)]
async fn selecting_an_app_loads_its_form() {
    let settings = Settings::default();
    let (handle, surface, running) = start(Model::new(&settings), MemoryProvider::sample());
    settle().await;

    handle.post(Message::AppSelected {
        app: "ghostty".into(),
    });
    settle().await;
    let (code, model) = stop(&handle, running).await;

    assert_eq!(code, 0);
    assert_eq!(model.machine.current(), ViewState::Form);
    assert_eq!(model.current_app.as_deref(), Some("ghostty"));
    assert!(model.error.is_none());
    assert!(surface.last_frame().is_some_and(|f| f.contains("font-size")));
}

#[tokio::test(start_paused = true)]
async fn failed_load_stays_in_form_with_error() {
    let settings = Settings::default();
    let (handle, _surface, running) = start(Model::new(&settings), MemoryProvider::sample());
    settle().await;

    handle.post(Message::AppSelected {
        app: "no-such-app".into(),
    });
    settle().await;
    let (_, model) = stop(&handle, running).await;

    assert_eq!(model.machine.current(), ViewState::Form);
    assert_eq!(model.current_app, None);
    assert!(model.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn initial_app_opens_straight_into_form() {
    let settings = Settings::default();
    let model = Model::new(&settings).with_initial_app(Some("zed".into()));
    let (handle, _surface, running) = start(model, MemoryProvider::sample());
    settle().await;
    let (_, model) = stop(&handle, running).await;

    assert_eq!(model.machine.current(), ViewState::Form);
    assert_eq!(model.current_app.as_deref(), Some("zed"));
}

#[test]
fn small_resize_keeps_cached_frame_and_large_resize_drops_it() {
    let settings = Settings::default();
    let mut model = Model::new(&settings);
    let now = Instant::now();

    update(&mut model, Message::Resize { width: 80, height: 24 }, now);
    view(&mut model, now);
    assert!(model.cache.contains(ViewState::List));

    update(&mut model, Message::Resize { width: 81, height: 24 }, now);
    assert!(model.cache.contains(ViewState::List));

    update(&mut model, Message::Resize { width: 200, height: 60 }, now);
    assert!(!model.cache.contains(ViewState::List));
}

struct ExplodingView;

impl Component for ExplodingView {
    fn name(&self) -> &str {
        "exploding-view"
    }

    fn update(&mut self, _msg: &Message) -> Vec<Command> {
        Vec::new()
    }

    fn view(&self) -> String {
        panic!("render went wrong")
    }

    fn set_size(&mut self, _width: u16, _height: u16) {}
}

#[tokio::test(start_paused = true)]
async fn panicking_view_is_contained() {
    let settings = Settings::default();
    let mut model = Model::new(&settings);
    model.components.list = Box::new(ExplodingView);
    let (handle, surface, running) = start(model, MemoryProvider::sample());
    settle().await;

    assert!(
        surface
            .frames()
            .iter()
            .any(|f| f.contains("exploding-view failed to render"))
    );

    // The loop keeps taking messages after the fault.
    handle.post(Message::Key(Key::Char('?')));
    settle().await;
    assert!(surface.last_frame().is_some_and(|f| f.contains("ZeroUI › Help")));

    let (code, model) = stop(&handle, running).await;
    assert_eq!(code, 0);
    assert_eq!(model.machine.current(), ViewState::Help);
}

#[tokio::test(start_paused = true)]
async fn late_result_after_timeout_is_discarded() {
    let mut settings = Settings::default();
    settings.command_timeout = Duration::from_millis(50);
    let provider = MemoryProvider::sample().with_latency(Duration::from_millis(200));
    let (handle, surface, running) = start(Model::new(&settings), provider);
    settle().await;

    handle.post(Message::AppSelected {
        app: "ghostty".into(),
    });
    settle().await;
    let (_, model) = stop(&handle, running).await;

    assert_eq!(model.machine.current(), ViewState::Form);
    assert_eq!(model.current_app, None);
    assert!(!model.components.form.is_loaded());
    assert!(model.discarded >= 1);
    assert!(surface.last_frame().is_some_and(|f| f.contains("timed out")));
}
