use std::io;
use std::sync::{Arc, Mutex};

/// Where frames go. The terminal is one implementation; tests record frames.
pub trait Surface: Send {
    fn draw(&mut self, frame: &str) -> io::Result<()>;

    /// Give the output device back. Called once, after the loop stops.
    fn restore(&mut self) -> io::Result<()>;
}

/// Keeps every drawn frame in memory. Used for headless runs.
#[derive(Clone, Default)]
pub struct MemorySurface {
    frames: Arc<Mutex<Vec<String>>>,
    restored: Arc<Mutex<bool>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn last_frame(&self) -> Option<String> {
        self.frames.lock().ok().and_then(|f| f.last().cloned())
    }

    pub fn was_restored(&self) -> bool {
        self.restored.lock().map(|r| *r).unwrap_or(false)
    }
}

impl Surface for MemorySurface {
    fn draw(&mut self, frame: &str) -> io::Result<()> {
        let mut frames = self
            .frames
            .lock()
            .map_err(|_| io::Error::other("frame log poisoned"))?;
        frames.push(frame.to_string());
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        let mut restored = self
            .restored
            .lock()
            .map_err(|_| io::Error::other("frame log poisoned"))?;
        *restored = true;
        Ok(())
    }
}
