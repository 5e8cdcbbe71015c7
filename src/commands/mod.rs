//! Command implementations for scanhost.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Everything except `config` needs a started engine.

mod exec;
mod shell;

use crate::cli::{Cli, Command};
use scanhost::backend::Backend;
use scanhost::config::Config;
use scanhost::error::{HostError, Result};

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Config => {
            print!("{}", config.to_yaml()?);
            flush_output()
        }
        Command::Exec(args) => exec::cmd_exec(&Backend::open(&config)?, &args),
        Command::Version => {
            println!("{}", Backend::open(&config)?.version()?);
            Ok(())
        }
        Command::Shell(args) => {
            let backend = Backend::open(&config)?;
            let stdin = std::io::stdin();
            shell::cmd_shell(&backend, &args, stdin.lock())
        }
    }
}

/// Build the effective config: file (or defaults), then command-line overrides.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(library) = &cli.library {
        config.library_path = library.clone();
    }
    if let Some(policy) = cli.busy_policy {
        config.busy_policy = policy;
    }

    config.validate()?;
    Ok(config)
}

/// Flush stdout, mapping failure into the CLI's I/O error.
fn flush_output() -> Result<()> {
    use std::io::Write;
    std::io::stdout()
        .flush()
        .map_err(|e| HostError::Io(format!("failed to write to stdout: {}", e)))
}
