//! Pollwatch CLI library
//!
//! Flag and settings-file handling, logging setup, command execution and
//! the event loop behind the `pollwatch` binary.

pub mod app;
pub mod logging;
pub mod runner;
pub mod settings;
pub mod util;
