//! Exit code constants for the scanhost CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, bad config, malformed command)
//! - 2: Engine library could not be loaded, bound or initialized
//! - 3: Engine command or output capture failed
//! - 4: Standard output is already claimed by another call

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or a command string the engine cannot take.
pub const USER_ERROR: i32 = 1;

/// Load failure: missing library, missing entry point, or `sm_init` returned false.
pub const LOAD_FAILURE: i32 = 2;

/// Engine failure: the command failed or panicked, or its output could not be captured or decoded.
pub const ENGINE_FAILURE: i32 = 3;

/// Busy: another call currently owns standard output.
pub const BUSY: i32 = 4;
