//! ZeroUI library exports for the binary and integration tests

pub mod components;
pub mod core;
pub mod data;
pub mod runtime;
pub mod tui;

#[cfg(test)]
pub mod test_support;
