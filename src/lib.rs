//! scanhost: host-side adapter for the scanmem engine library.
//!
//! Loads `libscanmem.so`, drives it through its seven C entry points and can
//! run any engine command with its standard output captured into a `String`.
//!
//! ```no_run
//! use scanhost::backend::Backend;
//! use scanhost::config::Config;
//!
//! let backend = Backend::open(&Config::default())?;
//! let listing = backend.capture("list")?;
//! println!("{} matches\n{}", backend.match_count(), listing);
//! # Ok::<(), scanhost::error::HostError>(())
//! ```

pub mod backend;
pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod journal;
pub mod redirect;

pub use backend::Backend;
pub use engine::{Engine, LibEngine};
#[cfg(any(test, feature = "test-support"))]
pub use engine::MockEngine;
pub use error::{HostError, Result};
