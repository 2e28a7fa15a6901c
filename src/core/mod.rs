//! # Core Application Logic
//!
//! The model, the messages that change it, and the pure functions that do
//! the changing. It knows nothing about terminals or threads.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │          CORE           │
//!                    │                         │
//!                    │  • Model (all state)    │
//!                    │  • Message (events)     │
//!                    │  • update() → commands  │
//!                    │  • view()   → frame     │
//!                    │                         │
//!                    │  No I/O. No UI. Pure.   │
//!                    └───────────┬─────────────┘
//!                                │
//!                  ┌─────────────┴─────────────┐
//!                  ▼                           ▼
//!           ┌────────────┐              ┌────────────┐
//!           │  Runtime   │              │    TUI     │
//!           │ (loop and  │              │  Adapter   │
//!           │ scheduler) │              │ (ratatui)  │
//!           └────────────┘              └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `Model`, everything the loop owns
//! - [`message`]: The `Message` enum, everything that can happen
//! - [`command`]: Side effects `update()` asks the runtime to perform
//! - [`update`] / [`view`]: The two functions the loop calls
//! - [`view_state`]: Screens and the legal moves between them
//! - [`render_cache`], [`debounce`], [`boundary`]: Runtime support kept pure
//!   so it can be tested without a loop

pub mod boundary;
pub mod command;
pub mod component;
pub mod config;
pub mod debounce;
pub mod error;
pub mod message;
pub mod render_cache;
pub mod state;
pub mod update;
pub mod view;
pub mod view_state;

pub use command::{Command, Operation};
pub use message::{Key, Message};
pub use state::Model;
pub use view_state::ViewState;
