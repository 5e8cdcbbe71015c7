//! The engine boundary.
//!
//! `Engine` is the trait the coordinator drives. `LibEngine` is the
//! production implementation that binds the scanmem shared library;
//! `MockEngine` is an in-process double with a tiny scripted command
//! language, used by the tests and only built with the `test-support`
//! feature.
//!
//! Only `execute_command` has to be serialized. The progress, match-count
//! and stop-flag accessors are safe to call from another thread while a
//! command is running; that is how a long scan is observed and cancelled.

mod library;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use library::{ENTRY_POINTS, LibEngine};
#[cfg(any(test, feature = "test-support"))]
pub use mock::MockEngine;

use crate::error::Result;
use std::ffi::CStr;

/// Typed access to the seven engine entry points.
pub trait Engine: Send + Sync {
    /// Allocate engine-global state. Returns false if that fails.
    fn initialize(&self) -> bool;

    /// Select the engine's internal scanning backend. Must run before `initialize`.
    fn select_backend(&self);

    /// Execute one textual command.
    ///
    /// May write to standard output and may block for a long time.
    fn execute_command(&self, command: &CStr) -> Result<()>;

    /// Number of matches currently held by the engine.
    fn match_count(&self) -> i64;

    /// Version string reported by the engine.
    fn version(&self) -> Result<String>;

    /// Progress of the running scan, in `[0, 1]`.
    fn scan_progress(&self) -> f64;

    /// Ask a long-running command to stop at its next check.
    fn set_stop_flag(&self, stop: bool);
}
