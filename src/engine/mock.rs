//! Scripted in-process engine for tests.
//!
//! Understands a handful of commands, enough to exercise every path of the
//! coordinator without a real scanmem library:
//!
//! | Command | Effect |
//! |---|---|
//! | `reset` | clear matches |
//! | `store N` | set the match count to `N` |
//! | `print TEXT` | write `TEXT` (everything after the first space) with raw `write(2)` calls on fd 1 |
//! | `fill N C` | write `N` copies of byte `C` through Rust's buffered stdout, without a final flush |
//! | `bytes HH HH ..` | write the given hex bytes on fd 1 |
//! | `scan MS` | run for about `MS` milliseconds in 5 ms steps, polling the stop flag |
//! | `fail MSG` | report a command failure |
//! | `panic MSG` | panic |

use super::Engine;
use crate::error::{HostError, Result};
use std::ffi::CStr;
use std::io::{self, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

const SCAN_STEP: Duration = Duration::from_millis(5);

/// Test-double engine that records calls and runs scripted commands.
pub struct MockEngine {
    init_ok: bool,
    version: String,
    matches: AtomicI64,
    progress_bits: AtomicU64,
    stop: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockEngine {
    /// Version string reported by default.
    pub const VERSION: &'static str = "0.17-mock";

    pub fn new() -> Self {
        Self {
            init_ok: true,
            version: Self::VERSION.to_string(),
            matches: AtomicI64::new(0),
            progress_bits: AtomicU64::new(0f64.to_bits()),
            stop: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// An engine whose `initialize` reports failure.
    pub fn failing_init() -> Self {
        Self {
            init_ok: false,
            ..Self::new()
        }
    }

    /// Override the reported version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Every entry-point call seen so far, in order.
    ///
    /// Commands are recorded as `exec:<command>`.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(call.into());
    }

    fn set_progress(&self, progress: f64) {
        self.progress_bits.store(progress.to_bits(), Ordering::SeqCst);
    }

    fn scan(&self, millis: u64) {
        let steps = (millis / SCAN_STEP.as_millis() as u64).max(1);
        let mut done = 0;
        self.set_progress(0.0);
        while done < steps {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(SCAN_STEP);
            done += 1;
            self.set_progress(done as f64 / steps as f64);
        }
        let stopped = done < steps;
        self.stop.store(false, Ordering::SeqCst);
        self.matches.store(done as i64, Ordering::SeqCst);
        let line = if stopped {
            format!("scan stopped after {} steps\n", done)
        } else {
            format!("scan complete: {} steps\n", done)
        };
        write_fd1(line.as_bytes());
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MockEngine {
    fn initialize(&self) -> bool {
        self.record("initialize");
        self.init_ok
    }

    fn select_backend(&self) {
        self.record("select_backend");
    }

    fn execute_command(&self, command: &CStr) -> Result<()> {
        let command = command
            .to_str()
            .map_err(|e| HostError::Command(format!("command is not UTF-8: {}", e)))?;
        self.record(format!("exec:{}", command));

        let (verb, rest) = command.split_once(' ').unwrap_or((command, ""));
        match verb {
            "reset" => {
                self.matches.store(0, Ordering::SeqCst);
                self.set_progress(0.0);
            }
            "store" => {
                let n = rest
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| HostError::Command(format!("bad match count '{}'", rest)))?;
                self.matches.store(n, Ordering::SeqCst);
            }
            "print" => write_fd1(rest.as_bytes()),
            "fill" => {
                let (count, byte) = parse_fill(rest)?;
                let chunk = vec![byte; 4096];
                let mut out = io::stdout();
                let mut left = count;
                while left > 0 {
                    let n = left.min(chunk.len());
                    out.write_all(&chunk[..n])
                        .map_err(|e| HostError::Command(format!("write failed: {}", e)))?;
                    left -= n;
                }
            }
            "bytes" => {
                let bytes = rest
                    .split_whitespace()
                    .map(|h| u8::from_str_radix(h, 16))
                    .collect::<std::result::Result<Vec<u8>, _>>()
                    .map_err(|e| HostError::Command(format!("bad hex byte: {}", e)))?;
                write_fd1(&bytes);
            }
            "scan" => {
                let millis = rest
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| HostError::Command(format!("bad scan duration '{}'", rest)))?;
                self.scan(millis);
            }
            "fail" => return Err(HostError::Command(rest.to_string())),
            "panic" => panic!("{}", rest),
            _ => return Err(HostError::Command(format!("unknown command '{}'", command))),
        }
        Ok(())
    }

    fn match_count(&self) -> i64 {
        self.matches.load(Ordering::SeqCst)
    }

    fn version(&self) -> Result<String> {
        self.record("version");
        Ok(self.version.clone())
    }

    fn scan_progress(&self) -> f64 {
        f64::from_bits(self.progress_bits.load(Ordering::SeqCst))
    }

    fn set_stop_flag(&self, stop: bool) {
        self.record(format!("set_stop_flag:{}", stop));
        self.stop.store(stop, Ordering::SeqCst);
    }
}

fn parse_fill(args: &str) -> Result<(usize, u8)> {
    let mut parts = args.split_whitespace();
    let count = parts.next().and_then(|n| n.parse::<usize>().ok());
    let byte = parts.next().and_then(|c| c.bytes().next());
    match (count, byte) {
        (Some(count), Some(byte)) => Ok((count, byte)),
        _ => Err(HostError::Command(format!("usage: fill N C (got '{}')", args))),
    }
}

/// Write straight to fd 1 the way a C library calling `write(2)` would.
fn write_fd1(mut bytes: &[u8]) {
    while !bytes.is_empty() {
        let n = unsafe { libc::write(libc::STDOUT_FILENO, bytes.as_ptr().cast(), bytes.len()) };
        if n < 0 {
            if io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return;
        }
        bytes = &bytes[n as usize..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn exec(engine: &MockEngine, command: &str) -> Result<()> {
        engine.execute_command(&CString::new(command).unwrap())
    }

    #[test]
    fn store_and_reset_update_match_count() {
        let engine = MockEngine::new();
        exec(&engine, "store 42").unwrap();
        assert_eq!(engine.match_count(), 42);
        exec(&engine, "reset").unwrap();
        assert_eq!(engine.match_count(), 0);
    }

    #[test]
    fn fail_reports_command_error() {
        let engine = MockEngine::new();
        let err = exec(&engine, "fail no process attached").unwrap_err();
        assert!(matches!(err, HostError::Command(msg) if msg == "no process attached"));
    }

    #[test]
    fn unknown_command_is_rejected() {
        let engine = MockEngine::new();
        assert!(exec(&engine, "frobnicate").is_err());
    }

    #[test]
    fn calls_are_recorded_in_order() {
        let engine = MockEngine::new();
        engine.select_backend();
        assert!(engine.initialize());
        exec(&engine, "reset").unwrap();
        assert_eq!(engine.calls(), vec!["select_backend", "initialize", "exec:reset"]);
    }

    #[test]
    fn failing_init_reports_false() {
        assert!(!MockEngine::failing_init().initialize());
    }

    #[test]
    fn parse_fill_requires_count_and_byte() {
        assert_eq!(parse_fill("10 x").unwrap(), (10, b'x'));
        assert!(parse_fill("10").is_err());
        assert!(parse_fill("x y").is_err());
    }
}
