//! cli
//!
//! Command-line interface layer for volborg.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Initialize logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! handlers that resolve the volume's repository from configuration and call
//! the [`crate::engine`] operations.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use crate::engine;
use crate::logging::{self, LogFormat};
use anyhow::Result;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Human
    };
    logging::init_logging(format, cli.debug, cli.quiet);

    let ctx = engine::Context {
        config_path: cli.config.clone(),
        quiet: cli.quiet,
        json: cli.json,
    };

    commands::dispatch(cli.command, &ctx)
}
