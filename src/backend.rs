//! The engine coordinator.
//!
//! `Backend` owns the engine, runs the startup sequence and serializes
//! command execution. Commands run in one of two modes:
//!
//! - plain: the command runs on the calling thread and whatever it prints
//!   goes to the real standard output;
//! - captured: the command runs on a worker thread while its standard output
//!   is collected and returned as a `String` (see [`crate::capture`]).
//!
//! Both modes hold the process-wide stdout claim, so a plain command can
//! never print into somebody else's capture.
//!
//! The progress, match-count and stop-flag accessors do not take the claim:
//! they are meant to be called from another thread while a scan runs.

use crate::capture::capture_stdout;
use crate::config::{BusyPolicy, Config};
use crate::engine::{Engine, LibEngine};
use crate::error::{HostError, Result};
use crate::journal::{Journal, JournalEntry, Outcome};
use crate::redirect::{claim_stdout, flush_stdout};
use std::ffi::CString;
use std::sync::OnceLock;
use std::time::Instant;

/// Drives one engine instance.
pub struct Backend<E: Engine = LibEngine> {
    engine: E,
    read_chunk_size: usize,
    busy_policy: BusyPolicy,
    journal: Option<Journal>,
    version: OnceLock<String>,
}

impl Backend<LibEngine> {
    /// Load the library named by `config` and start it.
    pub fn open(config: &Config) -> Result<Self> {
        let engine = LibEngine::load(&config.library_path)?;
        Self::start(engine, config)
    }
}

impl<E: Engine> Backend<E> {
    /// Start an engine: select its backend, initialize it, then send the
    /// baseline command.
    pub fn start(engine: E, config: &Config) -> Result<Self> {
        config.validate()?;

        engine.select_backend();
        if !engine.initialize() {
            return Err(HostError::EngineInit);
        }

        let backend = Self {
            engine,
            read_chunk_size: config.read_chunk_size,
            busy_policy: config.busy_policy,
            journal: config.journal_path.as_ref().map(Journal::new),
            version: OnceLock::new(),
        };

        if let Some(baseline) = config.baseline() {
            backend.exec(baseline)?;
        }
        log::debug!("engine started");
        Ok(backend)
    }

    /// Send one command to the engine.
    ///
    /// With `capture` set, returns everything the command wrote to standard
    /// output. Otherwise the output passes through and `None` is returned.
    pub fn send_command(&self, command: &str, capture: bool) -> Result<Option<String>> {
        let c_command =
            CString::new(command).map_err(|_| HostError::InvalidCommand(command.to_string()))?;

        let claim = claim_stdout(self.busy_policy)?;
        let started = Instant::now();

        let result = if capture {
            capture_stdout(&claim, self.read_chunk_size, || {
                self.engine.execute_command(&c_command)
            })
            .and_then(|bytes| Ok(Some(String::from_utf8(bytes)?)))
        } else {
            flush_stdout();
            let result = self.engine.execute_command(&c_command);
            flush_stdout();
            result.map(|()| None)
        };
        drop(claim);

        self.record(command, capture, started, &result);
        result
    }

    /// Send a command without capturing its output.
    pub fn exec(&self, command: &str) -> Result<()> {
        self.send_command(command, false).map(|_| ())
    }

    /// Send a command and return what it printed.
    pub fn capture(&self, command: &str) -> Result<String> {
        self.send_command(command, true)
            .map(|output| output.unwrap_or_default())
    }

    /// Number of matches currently held by the engine.
    pub fn match_count(&self) -> i64 {
        self.engine.match_count()
    }

    /// Engine version, fetched once and cached.
    pub fn version(&self) -> Result<String> {
        if let Some(version) = self.version.get() {
            return Ok(version.clone());
        }
        let version = self.engine.version()?;
        Ok(self.version.get_or_init(|| version).clone())
    }

    /// Progress of the running scan, in `[0, 1]`.
    pub fn scan_progress(&self) -> f64 {
        self.engine.scan_progress().clamp(0.0, 1.0)
    }

    /// Request (or clear a request for) cooperative cancellation.
    pub fn set_stop_flag(&self, stop: bool) {
        self.engine.set_stop_flag(stop);
    }

    /// The engine being driven.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn record(&self, command: &str, captured: bool, started: Instant, result: &Result<Option<String>>) {
        let Some(journal) = &self.journal else {
            return;
        };

        let mut entry = JournalEntry::new(command, captured);
        entry.duration_ms = started.elapsed().as_millis() as u64;
        entry.matches = self.engine.match_count();
        match result {
            Ok(output) => entry.bytes = output.as_ref().map(String::len),
            Err(e) => {
                entry.outcome = Outcome::Error;
                entry.error = Some(e.to_string());
            }
        }

        // The command already ran; a journal failure must not replace its result.
        if let Err(e) = journal.append(&entry) {
            log::warn!("{}", e);
        }
    }
}
