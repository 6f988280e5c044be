// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `remake`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "remake",
    version,
    about = "Run module operations: external tools, follow-up chains and built-in actions.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the engine config file (TOML).
    ///
    /// Default: `remake.toml` in the current working directory. A missing
    /// file means built-in defaults rooted at the current directory.
    #[arg(long, value_name = "PATH", default_value = "remake.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `REMAKE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List registered modules.
    Modules,

    /// List the operations of a module.
    Ops {
        module: String,
    },

    /// Run one operation and its `on_success` chain.
    Run {
        module: String,
        /// Operation name (or script, if the operation has no name).
        operation: String,
        #[command(flatten)]
        answers: AnswerArgs,
    },

    /// Run every operation of a module in catalog order.
    RunAll {
        module: String,
        #[command(flatten)]
        answers: AnswerArgs,
        /// Draw a live progress panel on stderr.
        #[arg(long)]
        progress: bool,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct AnswerArgs {
    /// Pre-answer a prompt, `name=value`. Repeatable. Checkbox values are
    /// comma-separated.
    #[arg(long = "answer", value_name = "NAME=VALUE", value_parser = parse_answer)]
    pub answers: Vec<(String, String)>,

    /// Do not ask anything: prompts keep their defaults and child prompts
    /// get an empty line.
    #[arg(long)]
    pub defaults: bool,
}

fn parse_answer(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty prompt name in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
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
