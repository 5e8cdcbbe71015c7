//! CLI argument parsing for scanhost.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use scanhost::config::BusyPolicy;
use std::path::PathBuf;

/// scanhost: drive the scanmem engine library from the command line.
///
/// Every command is passed verbatim to the engine. With `--capture`, what the
/// engine prints is collected and shown after the command finishes instead
/// of streaming straight to the terminal.
#[derive(Parser, Debug)]
#[command(name = "scanhost")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML config file. Defaults are used when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Engine library to load (overrides `library_path` from the config).
    #[arg(short, long, global = true)]
    pub library: Option<PathBuf>,

    /// What to do when standard output is already claimed: reject or wait.
    #[arg(long, global = true, value_parser = parse_busy_policy)]
    pub busy_policy: Option<BusyPolicy>,

    /// Log capture and engine lifecycle details to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for scanhost.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one or more engine commands in order.
    Exec(ExecArgs),

    /// Print the engine version.
    Version,

    /// Read engine commands from stdin, one per line.
    ///
    /// The prompt shows the current match count. `exit`, `quit` or end of
    /// input leaves the shell.
    Shell(ShellArgs),

    /// Print the effective configuration as YAML.
    Config,
}

/// Arguments for the `exec` command.
#[derive(Parser, Debug)]
pub struct ExecArgs {
    /// Capture each command's output and print it after the command returns.
    #[arg(long)]
    pub capture: bool,

    /// Print one JSON object per command (command, output, matches).
    #[arg(long)]
    pub json: bool,

    /// Engine commands, e.g. `"pid 1234"` `list`.
    #[arg(required = true)]
    pub commands: Vec<String>,
}

/// Arguments for the `shell` command.
#[derive(Parser, Debug)]
pub struct ShellArgs {
    /// Capture each command's output and print it after the command returns.
    #[arg(long)]
    pub capture: bool,

    /// Report scan progress on stderr while a command runs.
    #[arg(long)]
    pub progress: bool,
}

fn parse_busy_policy(s: &str) -> Result<BusyPolicy, String> {
    BusyPolicy::from_str(s).ok_or_else(|| format!("expected 'reject' or 'wait', got '{}'", s))
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
