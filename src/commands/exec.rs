//! Implementation of the `scanhost exec` command.

use super::flush_output;
use crate::cli::ExecArgs;
use scanhost::backend::Backend;
use scanhost::engine::Engine;
use scanhost::error::{HostError, Result};
use serde::Serialize;

/// One line of `exec --json` output.
#[derive(Debug, Serialize)]
pub struct CommandReport<'a> {
    pub command: &'a str,
    pub output: Option<&'a str>,
    pub matches: i64,
}

/// Run each command in order, stopping at the first failure.
pub fn cmd_exec<E: Engine>(backend: &Backend<E>, args: &ExecArgs) -> Result<()> {
    for command in &args.commands {
        let output = backend.send_command(command, args.capture)?;

        if args.json {
            let report = CommandReport {
                command,
                output: output.as_deref(),
                matches: backend.match_count(),
            };
            let line = serde_json::to_string(&report)
                .map_err(|e| HostError::Io(format!("failed to serialize report: {}", e)))?;
            println!("{}", line);
        } else if let Some(text) = output {
            print!("{}", text);
        }
    }
    flush_output()
}
