//! # Event Loop
//!
//! One task owns the model and is the only caller of `update()` and
//! `view()`. Everything else talks to it through the message queue.
//!
//! ```text
//!   input thread ──┐
//!   ctrl-c task ───┤
//!   workers ───────┼──► mpsc queue ──► EventLoop ──► update() ──► commands
//!   Command::Emit ─┘                      │                         │
//!                                         ▼                         ▼
//!                                 view() → Surface          CommandScheduler
//! ```
//!
//! Raw input (keys, resizes) goes through the [`EventBatcher`] first. Before
//! any other message is applied, pending input is flushed so the order the
//! model sees matches the order things happened.

pub mod scheduler;
pub mod surface;

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;

use crate::core::boundary::{ErrorBoundary, fallback_panel};
use crate::core::command::Command;
use crate::core::debounce::EventBatcher;
use crate::core::error::FaultPhase;
use crate::core::message::Message;
use crate::core::state::Model;
use crate::core::update::update;
use crate::core::view::view;
use crate::data::DataProvider;

pub use scheduler::CommandScheduler;
pub use surface::{MemorySurface, Surface};

/// The loop's notion of "now". Follows tokio's clock so paused-time tests
/// and the loop agree.
pub fn clock() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Posts messages into a running loop.
#[derive(Clone)]
pub struct LoopHandle {
    tx: UnboundedSender<Message>,
}

impl LoopHandle {
    /// False once the loop has stopped.
    pub fn post(&self, msg: Message) -> bool {
        self.tx.send(msg).is_ok()
    }
}

enum Wake {
    Message(Message),
    Tick,
    Flush,
}

pub struct EventLoop<S: Surface> {
    model: Model,
    scheduler: CommandScheduler,
    surface: S,
    batcher: EventBatcher,
    boundary: ErrorBoundary,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
    tick: Duration,
    render_budget: Duration,
    shutdown_grace: Duration,
    last_frame: String,
}

impl<S: Surface> EventLoop<S> {
    pub fn new(model: Model, provider: Arc<dyn DataProvider>, surface: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let settings = &model.settings;
        Self {
            scheduler: CommandScheduler::new(provider, tx.clone()),
            batcher: EventBatcher::new(settings.batch_size, settings.batch_window),
            tick: settings.tick,
            render_budget: settings.render_budget,
            shutdown_grace: settings.shutdown_grace,
            boundary: ErrorBoundary::new(),
            surface,
            tx,
            rx,
            last_frame: String::new(),
            model,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run until a quit and return the process exit code.
    pub async fn run(self) -> i32 {
        self.drive().await.0
    }

    /// Like [`run`](Self::run), but hands the final model back.
    pub async fn drive(mut self) -> (i32, Model) {
        info!(
            "Event loop starting in {} (tick {:?})",
            self.model.machine.current(),
            self.tick
        );
        let init = self.model.init();
        let mut running = self.execute(init);
        if running {
            self.render(clock());
        }
        self.collect_faults();

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        while running {
            let pending = !self.batcher.is_empty();
            let flush_at = self
                .batcher
                .deadline()
                .map(tokio::time::Instant::from_std)
                .unwrap_or_else(tokio::time::Instant::now);

            let wake = tokio::select! {
                received = self.rx.recv() => match received {
                    Some(msg) => Wake::Message(msg),
                    None => break,
                },
                _ = ticker.tick() => Wake::Tick,
                _ = tokio::time::sleep_until(flush_at), if pending => Wake::Flush,
            };

            let now = clock();
            let msg = match wake {
                Wake::Message(msg) if msg.is_batchable() => match self.batcher.submit(msg, now) {
                    Some(batch) => batch,
                    None => continue,
                },
                Wake::Flush => match self.batcher.poll(now) {
                    Some(batch) => batch,
                    None => continue,
                },
                other => {
                    if let Some(batch) = self.batcher.flush() {
                        running = self.step(batch, now);
                        if !running {
                            break;
                        }
                    }
                    match other {
                        Wake::Message(msg) => msg,
                        _ => Message::Tick,
                    }
                }
            };
            running = self.step(msg, now);
        }

        self.teardown().await
    }

    /// Apply one message, run its commands, redraw. False means quit.
    fn step(&mut self, msg: Message, now: Instant) -> bool {
        if let Message::Completed { epoch, .. } = &msg {
            self.scheduler.forget(*epoch);
        }

        let Self {
            model, boundary, ..
        } = self;
        let (commands, faulted) = boundary.guard(
            "event-loop",
            FaultPhase::Loop,
            || update(model, msg, now),
            Vec::new,
        );
        if faulted {
            self.model.reset_to_safe();
        }

        let running = self.execute(commands);
        if running {
            self.render(now);
        }
        self.collect_faults();
        running
    }

    fn execute(&mut self, commands: Vec<Command>) -> bool {
        let mut running = true;
        for command in commands {
            match command {
                Command::Run(task) => self.scheduler.dispatch(task),
                Command::Emit(msg) => {
                    let _ = self.tx.send(msg);
                }
                Command::Cancel(epoch) => self.scheduler.cancel(epoch),
                Command::Quit => running = false,
            }
        }
        running
    }

    /// Turn caught faults into messages for the next turn of the loop.
    fn collect_faults(&mut self) {
        let faults = self
            .boundary
            .take_faults()
            .into_iter()
            .chain(self.model.boundary.take_faults());
        for fault in faults {
            let _ = self.tx.send(Message::ComponentFault(fault));
        }
    }

    fn render(&mut self, now: Instant) {
        let started = Instant::now();
        let Self {
            model, boundary, ..
        } = self;
        let (frame, faulted) = boundary.guard(
            "renderer",
            FaultPhase::View,
            || view(model, now),
            || fallback_panel("renderer"),
        );
        if faulted {
            // Already logged; posting it would fault again on the next frame.
            // Faults from this step's update stay queued.
            self.boundary.discard_last();
        }

        let elapsed = started.elapsed();
        if elapsed > self.render_budget {
            self.model.slow_frames += 1;
            warn!(
                "Slow render: {:?} for {} (budget {:?})",
                elapsed,
                self.model.machine.current(),
                self.render_budget
            );
        }

        if frame != self.last_frame {
            if let Err(e) = self.surface.draw(&frame) {
                warn!("Failed to draw frame: {e}");
            }
            self.last_frame = frame;
        }
    }

    async fn teardown(mut self) -> (i32, Model) {
        info!(
            "Event loop stopping with {} command(s) outstanding",
            self.scheduler.running_count()
        );
        self.scheduler.shutdown(self.shutdown_grace).await;
        if let Err(e) = self.surface.restore() {
            warn!("Failed to restore surface: {e}");
        }
        let (hits, misses) = self.model.cache.stats();
        debug!(
            "Rendered {} frame(s) ({} slow), cache {hits} hit(s) / {misses} miss(es), {} fault(s)",
            self.model.frame_count,
            self.model.slow_frames,
            self.model.boundary.total() + self.boundary.total()
        );
        (self.model.exit_code, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Settings;
    use crate::core::error::AppError;
    use crate::core::message::Key;
    use crate::core::view_state::ViewState;
    use crate::data::MemoryProvider;
    use crate::test_support::{
        BrittleComponent, CountingComponent, PanickingComponent, SlowComponent,
    };
    use std::sync::atomic::Ordering;

    fn event_loop(settings: &Settings) -> (EventLoop<MemorySurface>, MemorySurface) {
        let surface = MemorySurface::new();
        let model = Model::new(settings);
        let provider = Arc::new(MemoryProvider::sample());
        (EventLoop::new(model, provider, surface.clone()), surface)
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_restores_surface_and_returns_zero() {
        let (event_loop, surface) = event_loop(&Settings::default());
        let handle = event_loop.handle();
        handle.post(Message::Quit);
        let code = event_loop.run().await;
        assert_eq!(code, 0);
        assert!(surface.was_restored());
        assert!(!surface.frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_scan_populates_list() {
        let (event_loop, surface) = event_loop(&Settings::default());
        let handle = event_loop.handle();
        let task = tokio::spawn(event_loop.drive());
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.post(Message::Quit);
        let (_, model) = task.await.unwrap();
        assert_eq!(model.machine.current(), ViewState::List);
        assert!(surface.last_frame().is_some_and(|f| f.contains("ghostty")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_exits_130() {
        let (event_loop, _) = event_loop(&Settings::default());
        event_loop.handle().post(Message::Interrupt);
        assert_eq!(event_loop.run().await, 130);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_batched_in_order() {
        let (event_loop, surface) = event_loop(&Settings::default());
        let handle = event_loop.handle();
        let task = tokio::spawn(event_loop.drive());
        tokio::time::sleep(Duration::from_millis(500)).await;
        for key in [Key::Down, Key::Down, Key::Up] {
            handle.post(Message::Key(key));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.post(Message::Quit);
        task.await.unwrap();
        // alacritty, ghostty, zed: down, down, up lands on ghostty.
        assert!(surface.last_frame().is_some_and(|f| f.contains("▸ ghostty")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_never_overlaps() {
        let settings = Settings::default();
        let surface = MemorySurface::new();
        let mut model = Model::new(&settings);
        let counting = CountingComponent::new();
        let stats = counting.stats();
        model.components.list = Box::new(counting);
        let provider = Arc::new(
            MemoryProvider::sample().with_latency(Duration::from_millis(3)),
        );
        let event_loop = EventLoop::new(model, provider, surface);
        let handle = event_loop.handle();
        let task = tokio::spawn(event_loop.drive());

        for i in 0..50u32 {
            handle.post(Message::Key(Key::Char('x')));
            if i % 5 == 0 {
                handle.post(Message::RefreshRequested);
            }
            tokio::time::sleep(Duration::from_millis(7)).await;
        }
        handle.post(Message::Quit);
        task.await.unwrap();

        assert!(stats.calls.load(Ordering::SeqCst) >= 50);
        assert_eq!(stats.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_view_renders_fallback_and_loop_survives() {
        let settings = Settings::default();
        let surface = MemorySurface::new();
        let mut model = Model::new(&settings);
        model.components.list = Box::new(PanickingComponent::in_view());
        let event_loop = EventLoop::new(model, Arc::new(MemoryProvider::sample()), surface.clone());
        let handle = event_loop.handle();
        let task = tokio::spawn(event_loop.drive());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(surface.frames().iter().any(|f| f.contains("failed to render")));

        handle.post(Message::Key(Key::Char('?')));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.post(Message::Quit);
        let (code, model) = task.await.unwrap();
        assert_eq!(code, 0);
        assert_eq!(model.machine.current(), ViewState::Help);
        assert_eq!(model.boundary.total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_update_surfaces_fault() {
        let settings = Settings::default();
        let mut model = Model::new(&settings);
        model.components.list = Box::new(PanickingComponent::in_update());
        let event_loop = EventLoop::new(model, Arc::new(MemoryProvider::sample()), MemorySurface::new());
        let handle = event_loop.handle();
        let task = tokio::spawn(event_loop.drive());

        handle.post(Message::Key(Key::Char('x')));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.post(Message::Quit);
        let (code, model) = task.await.unwrap();
        assert_eq!(code, 0);
        assert_eq!(model.machine.current(), ViewState::List);
        assert!(matches!(model.error, Some(AppError::ComponentFault(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_over_budget_is_counted_and_still_drawn() {
        let mut settings = Settings::default();
        settings.render_budget = Duration::from_millis(5);
        let surface = MemorySurface::new();
        let mut model = Model::new(&settings);
        model.components.list = Box::new(SlowComponent::new(Duration::from_millis(20)));
        let event_loop = EventLoop::new(model, Arc::new(MemoryProvider::sample()), surface.clone());
        let handle = event_loop.handle();
        let task = tokio::spawn(event_loop.drive());

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.post(Message::Quit);
        let (code, model) = task.await.unwrap();
        assert_eq!(code, 0);
        assert!(model.slow_frames >= 1);
        assert!(surface.last_frame().is_some_and(|f| f.contains("slow but done")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_renderer_fault_keeps_update_fault_from_same_step() {
        let settings = Settings::default();
        let surface = MemorySurface::new();
        let mut model = Model::new(&settings);
        let (brittle, armed) = BrittleComponent::new();
        model.components.list = Box::new(brittle);
        let event_loop = EventLoop::new(model, Arc::new(MemoryProvider::sample()), surface.clone());
        let handle = event_loop.handle();
        let task = tokio::spawn(event_loop.drive());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(surface.last_frame().is_some_and(|f| f.contains("brittle body")));

        // The resize handler and the renderer both read the name.
        armed.store(true, Ordering::SeqCst);
        handle.post(Message::Resize {
            width: 120,
            height: 40,
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(
            surface
                .frames()
                .iter()
                .any(|f| f.contains("renderer failed to render"))
        );

        armed.store(false, Ordering::SeqCst);
        handle.post(Message::Quit);
        let (code, model) = task.await.unwrap();
        assert_eq!(code, 0);
        match model.error {
            Some(AppError::ComponentFault(fault)) => {
                assert_eq!(fault.phase, FaultPhase::Loop);
                assert_eq!(fault.detail, "name lookup exploded");
            }
            other => panic!("expected a loop fault, got {other:?}"),
        }
    }
}
