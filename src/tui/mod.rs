//! Terminal User Interface (TUI) module.
//!
//! This module provides an interactive terminal-based front end for the
//! latency engine using the `ratatui` library: provider selection, run
//! settings, live progress, ranked results and run history.

mod app;

pub use app::App;
