//! Error types for scanhost.
//!
//! Uses thiserror for derive macros. Every variant is a distinct failure class
//! so callers can tell a missing library apart from a busy stdout or a
//! command that printed bytes which are not valid UTF-8.

use crate::exit_codes;
use std::io;
use std::path::PathBuf;
use std::string::FromUtf8Error;
use thiserror::Error;

/// Main error type for scanhost operations.
#[derive(Error, Debug)]
pub enum HostError {
    /// The shared library could not be loaded.
    #[error("failed to load engine library '{}': {source}", .path.display())]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// A required entry point is not exported by the library.
    #[error("engine library does not export '{symbol}': {source}")]
    MissingEntryPoint {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// `sm_init` reported that the engine could not allocate its state.
    #[error("engine initialization failed")]
    EngineInit,

    /// Another call already owns standard output.
    #[error("standard output is already being captured by another call")]
    Busy,

    /// The command string cannot be passed across the C boundary.
    #[error("invalid command {0:?}: contains a NUL byte")]
    InvalidCommand(String),

    /// Setting up the redirect (dup, pipe, dup2, worker spawn) failed.
    /// Standard output was left untouched.
    #[error("failed to redirect standard output: {0}")]
    Redirect(#[source] io::Error),

    /// Standard output could not be pointed back at its original target.
    #[error("failed to restore standard output: {0}")]
    Restore(#[source] io::Error),

    /// Reading captured output from the pipe failed.
    #[error("failed to read captured output: {0}")]
    Drain(#[source] io::Error),

    /// The worker thread running the engine command panicked.
    #[error("engine command panicked: {0}")]
    WorkerPanicked(String),

    /// The engine reported that the command failed.
    #[error("engine command failed: {0}")]
    Command(String),

    /// Captured output (or the version string) is not valid UTF-8.
    #[error("engine output is not valid UTF-8: {0}")]
    Decode(#[from] FromUtf8Error),

    /// Configuration could not be read, parsed or validated.
    #[error("{0}")]
    Config(String),

    /// The command journal could not be written or read.
    #[error("journal error: {0}")]
    Journal(String),

    /// Other I/O failure in the CLI front end.
    #[error("{0}")]
    Io(String),
}

impl HostError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            HostError::LibraryLoad { .. }
            | HostError::MissingEntryPoint { .. }
            | HostError::EngineInit => exit_codes::LOAD_FAILURE,
            HostError::Busy => exit_codes::BUSY,
            HostError::InvalidCommand(_) | HostError::Config(_) | HostError::Io(_) => {
                exit_codes::USER_ERROR
            }
            HostError::Redirect(_)
            | HostError::Restore(_)
            | HostError::Drain(_)
            | HostError::WorkerPanicked(_)
            | HostError::Command(_)
            | HostError::Decode(_)
            | HostError::Journal(_) => exit_codes::ENGINE_FAILURE,
        }
    }
}

/// Result type alias for scanhost operations.
pub type Result<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_error_has_correct_exit_code() {
        assert_eq!(HostError::Busy.exit_code(), exit_codes::BUSY);
    }

    #[test]
    fn init_failure_is_a_load_failure() {
        assert_eq!(HostError::EngineInit.exit_code(), exit_codes::LOAD_FAILURE);
    }

    #[test]
    fn command_failures_are_engine_failures() {
        let err = HostError::Command("scan aborted".to_string());
        assert_eq!(err.exit_code(), exit_codes::ENGINE_FAILURE);

        let err = HostError::WorkerPanicked("boom".to_string());
        assert_eq!(err.exit_code(), exit_codes::ENGINE_FAILURE);

        let err = HostError::Redirect(io::Error::from_raw_os_error(libc::EMFILE));
        assert_eq!(err.exit_code(), exit_codes::ENGINE_FAILURE);
    }

    #[test]
    fn invalid_command_is_a_user_error() {
        let err = HostError::InvalidCommand("a\0b".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn decode_error_converts_from_utf8_error() {
        let utf8 = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        let err: HostError = utf8.into();
        assert!(matches!(err, HostError::Decode(_)));
        assert!(err.to_string().starts_with("engine output is not valid UTF-8"));
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = HostError::Command("unknown command".to_string());
        assert_eq!(err.to_string(), "engine command failed: unknown command");

        let err = HostError::Busy;
        assert_eq!(
            err.to_string(),
            "standard output is already being captured by another call"
        );
    }
}
