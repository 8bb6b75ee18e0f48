// Library interface for the teahouse client; the binary and the integration
// tests both build on it
pub mod api;
pub mod app;
pub mod cancel;
pub mod config;
pub mod content;
pub mod emoji;

#[macro_use]
pub mod logging;

pub mod session;
pub mod terminal;
pub mod ui;
