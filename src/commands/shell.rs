//! Implementation of the `scanhost shell` command.
//!
//! A line-oriented loop over stdin. The prompt (`[matches]> `) and progress
//! reports go to stderr so stdout carries only what the engine printed.

use super::flush_output;
use crate::cli::ShellArgs;
use scanhost::backend::Backend;
use scanhost::engine::Engine;
use scanhost::error::{HostError, Result};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Read and run commands until `exit`, `quit` or end of input.
///
/// A failing command is reported and the loop continues. Losing standard
/// output (a failed restore) ends the shell.
pub fn cmd_shell<E: Engine, R: BufRead>(backend: &Backend<E>, args: &ShellArgs, mut input: R) -> Result<()> {
    let mut line = String::new();
    loop {
        eprint!("[{}]> ", backend.match_count());
        line.clear();
        let read = input
            .read_line(&mut line)
            .map_err(|e| HostError::Io(format!("failed to read command: {}", e)))?;
        if read == 0 {
            eprintln!("exit");
            return Ok(());
        }

        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if matches!(command, "exit" | "quit") {
            return Ok(());
        }

        let result = if args.progress {
            run_with_progress(backend, command, args.capture)
        } else {
            backend.send_command(command, args.capture)
        };

        match result {
            Ok(Some(text)) => {
                print!("{}", text);
                flush_output()?;
            }
            Ok(None) => {}
            Err(e @ HostError::Restore(_)) => return Err(e),
            Err(e) => eprintln!("error: {}", e),
        }
    }
}

/// Run one command while a watcher thread reports scan progress on stderr.
fn run_with_progress<E: Engine>(
    backend: &Backend<E>,
    command: &str,
    capture: bool,
) -> Result<Option<String>> {
    let done = AtomicBool::new(false);
    thread::scope(|scope| {
        let watcher = scope.spawn(|| {
            let mut reported = false;
            while !done.load(Ordering::SeqCst) {
                let progress = backend.scan_progress();
                if progress > 0.0 {
                    eprint!("\rprogress: {:>3.0}%", progress * 100.0);
                    reported = true;
                }
                thread::sleep(PROGRESS_INTERVAL);
            }
            if reported {
                eprintln!();
            }
        });

        let result = backend.send_command(command, capture);
        done.store(true, Ordering::SeqCst);
        if watcher.join().is_err() {
            log::warn!("progress watcher panicked");
        }
        result
    })
}

#[cfg(all(test, feature = "test-support"))]
mod tests {
    use super::*;
    use scanhost::config::Config;
    use scanhost::engine::MockEngine;
    use serial_test::serial;
    use std::io::Cursor;

    fn backend() -> Backend<MockEngine> {
        Backend::start(MockEngine::new(), &Config::default()).unwrap()
    }

    fn plain() -> ShellArgs {
        ShellArgs {
            capture: false,
            progress: false,
        }
    }

    #[test]
    #[serial]
    fn runs_lines_until_exit() {
        let backend = backend();
        let input = Cursor::new("store 5\n\nexit\nstore 8\n");
        cmd_shell(&backend, &plain(), input).unwrap();

        assert_eq!(backend.match_count(), 5);
        assert!(!backend.engine().calls().contains(&"exec:store 8".to_string()));
    }

    #[test]
    #[serial]
    fn end_of_input_ends_shell() {
        let backend = backend();
        cmd_shell(&backend, &plain(), Cursor::new("store 3")).unwrap();
        assert_eq!(backend.match_count(), 3);
    }

    #[test]
    #[serial]
    fn failing_command_does_not_end_shell() {
        let backend = backend();
        let input = Cursor::new("fail nope\nstore 6\nquit\n");
        cmd_shell(&backend, &plain(), input).unwrap();
        assert_eq!(backend.match_count(), 6);
    }

    /// Delegates to `MockEngine` but panics when progress is polled.
    struct BrokenProgress(MockEngine);

    impl Engine for BrokenProgress {
        fn initialize(&self) -> bool {
            self.0.initialize()
        }
        fn select_backend(&self) {
            self.0.select_backend()
        }
        fn execute_command(&self, command: &std::ffi::CStr) -> Result<()> {
            self.0.execute_command(command)
        }
        fn match_count(&self) -> i64 {
            self.0.match_count()
        }
        fn version(&self) -> Result<String> {
            self.0.version()
        }
        fn scan_progress(&self) -> f64 {
            panic!("progress unavailable")
        }
        fn set_stop_flag(&self, stop: bool) {
            self.0.set_stop_flag(stop)
        }
    }

    #[test]
    #[serial]
    fn watcher_panic_does_not_lose_command_result() {
        let backend = Backend::start(BrokenProgress(MockEngine::new()), &Config::default()).unwrap();
        let result = run_with_progress(&backend, "store 2", false).unwrap();

        assert_eq!(result, None);
        assert_eq!(backend.match_count(), 2);
    }

    #[test]
    #[serial]
    fn progress_watcher_stops_with_command() {
        let backend = backend();
        let args = ShellArgs {
            capture: false,
            progress: true,
        };
        cmd_shell(&backend, &args, Cursor::new("store 1\nexit\n")).unwrap();
        assert_eq!(backend.match_count(), 1);
    }
}
