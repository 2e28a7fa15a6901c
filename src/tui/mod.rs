//! # TUI Adapter
//!
//! The ratatui-specific layer. Sets the terminal up, feeds crossterm input
//! into the event loop, and draws the loop's text frames.
//!
//! This is the only module that knows about ratatui and crossterm. The core
//! and the event loop only see a [`Surface`] and a stream of messages.

pub mod event;

use log::{error, info, warn};
use std::io::stdout;
use std::panic::PanicHookInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::cursor::{Hide, Show};
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste};
use crossterm::execute;
use ratatui::DefaultTerminal;
use ratatui::widgets::Paragraph;

use crate::core::config::Settings;
use crate::core::error::InitError;
use crate::core::message::Message;
use crate::core::state::Model;
use crate::data::DataProvider;
use crate::runtime::{EventLoop, Surface};

/// RAII guard for terminal modes that `ratatui::init()` doesn't manage.
struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(stdout(), EnableBracketedPaste, Hide)?;
        info!("Terminal modes enabled (bracketed paste, hidden cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), DisableBracketedPaste, Show);
    }
}

/// Draws frames as a full-screen paragraph.
pub struct TerminalSurface {
    terminal: DefaultTerminal,
    modes: Option<TerminalModeGuard>,
}

impl Surface for TerminalSurface {
    fn draw(&mut self, frame: &str) -> std::io::Result<()> {
        self.terminal.draw(|f| {
            let area = f.area();
            f.render_widget(Paragraph::new(frame), area);
        })?;
        Ok(())
    }

    fn restore(&mut self) -> std::io::Result<()> {
        self.modes.take();
        ratatui::try_restore()
    }
}

impl Drop for TerminalSurface {
    // Covers a loop that unwound before teardown.
    fn drop(&mut self) {
        if self.modes.take().is_some() {
            let _ = ratatui::try_restore();
        }
    }
}

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Sends panic reports to the log file while the loop owns the terminal.
///
/// Panics caught by the error boundary or the scheduler still run the panic
/// hook, and the one `ratatui::try_init` installs restores the terminal. The
/// hook that was installed before is put back on drop.
struct LogPanicHook {
    previous: Option<PanicHook>,
}

impl LogPanicHook {
    fn install() -> Self {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(|info| {
            error!("Panic: {info}");
        }));
        Self {
            previous: Some(previous),
        }
    }
}

impl Drop for LogPanicHook {
    fn drop(&mut self) {
        // set_hook panics when called while unwinding.
        if std::thread::panicking() {
            return;
        }
        if let Some(previous) = self.previous.take() {
            std::panic::set_hook(previous);
        }
    }
}

/// Take over the terminal and run the event loop until quit.
///
/// Errors are only returned for failures before the loop starts; once it is
/// running, everything is absorbed and the exit code says how it ended.
pub async fn run(
    settings: Settings,
    provider: Arc<dyn DataProvider>,
    initial_app: Option<String>,
) -> Result<i32, InitError> {
    let model = Model::new(&settings).with_initial_app(initial_app);

    let terminal = ratatui::try_init()?;
    let prepared =
        TerminalModeGuard::new().and_then(|modes| Ok((modes, crossterm::terminal::size()?)));
    let (modes, size) = match prepared {
        Ok(ready) => ready,
        Err(e) => {
            let _ = ratatui::try_restore();
            return Err(e.into());
        }
    };

    let surface = TerminalSurface {
        terminal,
        modes: Some(modes),
    };
    let event_loop = EventLoop::new(model, provider, surface);
    let handle = event_loop.handle();
    handle.post(Message::Resize {
        width: size.0,
        height: size.1,
    });

    let stop = Arc::new(AtomicBool::new(false));
    let input = event::spawn_input_thread(handle.clone(), stop.clone());
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.post(Message::Interrupt);
        }
    });

    let panic_hook = LogPanicHook::install();
    let code = event_loop.run().await;
    drop(panic_hook);

    stop.store(true, Ordering::Relaxed);
    interrupt.abort();
    match tokio::task::spawn_blocking(move || input.join()).await {
        Ok(Ok(())) => {}
        _ => warn!("Input thread did not shut down cleanly"),
    }
    info!("Exiting with code {code}");
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryProvider;
    use crate::runtime::MemorySurface;
    use crate::test_support::PanickingComponent;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_caught_panic_does_not_reach_terminal_hook() {
        let original = std::panic::take_hook();
        let restores = Arc::new(AtomicUsize::new(0));
        let counter = restores.clone();
        // Stands in for the ratatui hook, which restores the terminal.
        std::panic::set_hook(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let before = restores.load(Ordering::SeqCst);

        let hook = LogPanicHook::install();
        let mut model = Model::new(&Settings::default());
        model.components.list = Box::new(PanickingComponent::in_view());
        let event_loop =
            EventLoop::new(model, Arc::new(MemoryProvider::sample()), MemorySurface::new());
        let handle = event_loop.handle();
        let task = tokio::spawn(event_loop.drive());
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.post(Message::Quit);
        let (code, model) = task.await.unwrap();
        let after = restores.load(Ordering::SeqCst);
        drop(hook);
        std::panic::set_hook(original);

        assert_eq!(code, 0);
        assert_eq!(model.boundary.total(), 1);
        assert_eq!(after, before);
    }
}
