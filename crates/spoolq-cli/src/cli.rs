//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `spoolq`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "spoolq",
    version,
    about = "Inspect and drive a maildir-style job queue on disk.",
    long_about = None
)]
pub struct CliArgs {
    /// JSON config file with `dir`, `ttl` and `retries`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base directory (overrides the config file).
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Queue name; the queue lives in `<dir>/<name>`.
    #[arg(long, value_name = "NAME", default_value = "default")]
    pub name: String,

    /// Expiry in milliseconds, 0 disables (overrides the config file).
    #[arg(long, value_name = "MS")]
    pub ttl_ms: Option<u64>,

    /// Requeue limit, negative disables (overrides the config file).
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub retries: Option<i64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SPOOLQ_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Enqueue a JSON payload and print the envelope.
    Add {
        /// Payload as JSON, e.g. '{"hello":"world"}'.
        payload: String,
    },

    /// Claim the oldest job and print it.
    Pop {
        /// Fail the job instead, to exercise requeue / discard.
        #[arg(long)]
        fail: bool,
    },

    /// Print pending jobs, oldest first.
    List,

    /// Print the number of pending jobs.
    Count,

    /// Print file counts per state as JSON.
    Status,

    /// Delete expired files from every state directory.
    Empty,

    /// Run workers that print payloads until Ctrl-C.
    Work {
        #[arg(long, default_value_t = 1)]
        workers: usize,

        /// Sleep between polls of an empty queue.
        #[arg(long, value_name = "MS", default_value_t = 500)]
        poll_ms: u64,
    },

    /// Add `{"hello":"world"}` and pop it again.
    Demo,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
