//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this configuration file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Only warnings and errors on stderr, no borg output
//! - `--json`: Machine-readable output and JSON logs

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// volborg - borg backups for storage volumes
#[derive(Parser, Debug)]
#[command(name = "volborg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: $VOLBORG_CONFIG, then standard locations)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Machine-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Selects one volume's repository.
#[derive(Args, Debug, Clone)]
pub struct VolumeArgs {
    /// Storage pool the volume belongs to
    #[arg(long, default_value = "default")]
    pub pool: String,

    /// Volume name; the repository is <pool repo>/<volume>
    #[arg(long)]
    pub volume: String,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Make sure a volume's repository exists
    #[command(
        name = "prepare",
        long_about = "Make sure a volume's repository exists.\n\n\
            Runs `borg list` against the repository. If that fails for any reason, \
            the repository is initialized with `borg init -e none`. A list failure \
            caused by an unreachable host also triggers the init attempt, which then \
            fails and is reported.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Prepare the repository for volume 'web' in the default pool
    volborg prepare --volume web"
    )]
    Prepare {
        #[command(flatten)]
        target: VolumeArgs,
    },

    /// Initialize a volume's repository (unencrypted)
    Init {
        #[command(flatten)]
        target: VolumeArgs,
    },

    /// List archives in a volume's repository
    List {
        #[command(flatten)]
        target: VolumeArgs,
    },

    /// Archive a folder into a volume's repository
    #[command(
        name = "create",
        after_help = "\
WORKFLOW EXAMPLES:
    # Archive /var/lib/volumes/web with a timestamped name
    volborg create --volume web --source /var/lib/volumes/web

    # Use an explicit archive name
    volborg create --volume web --source /var/lib/volumes/web --name web-before-upgrade"
    )]
    Create {
        #[command(flatten)]
        target: VolumeArgs,

        /// Folder to archive
        #[arg(long)]
        source: PathBuf,

        /// Archive name (default: <volume>-<UTC timestamp>); path prefixes are stripped
        #[arg(long)]
        name: Option<String>,
    },

    /// Replace a folder's contents with an archive
    #[command(
        name = "restore",
        long_about = "Replace a folder's contents with an archive.\n\n\
            Everything inside the destination folder is deleted first, then the \
            archive is extracted into it. The root directory is refused.",
        after_help = "\
WORKFLOW EXAMPLES:
    volborg restore --volume web --name web-2024-01-01T00:00:00 --dest /var/lib/volumes/web"
    )]
    Restore {
        #[command(flatten)]
        target: VolumeArgs,

        /// Archive to restore
        #[arg(long)]
        name: String,

        /// Folder to restore into; its contents are deleted first
        #[arg(long)]
        dest: PathBuf,
    },

    /// Delete an archive
    Delete {
        #[command(flatten)]
        target: VolumeArgs,

        /// Archive to delete
        #[arg(long)]
        name: String,
    },

    /// Apply the configured retention policy
    Prune {
        #[command(flatten)]
        target: VolumeArgs,
    },

    /// Prepare, create and prune in one go
    #[command(
        name = "run",
        after_help = "\
WORKFLOW EXAMPLES:
    # Nightly backup of one volume
    volborg run --volume web --source /var/lib/volumes/web"
    )]
    Run {
        #[command(flatten)]
        target: VolumeArgs,

        /// Folder to archive
        #[arg(long)]
        source: PathBuf,

        /// Archive name (default: <volume>-<UTC timestamp>)
        #[arg(long)]
        name: Option<String>,

        /// Skip the prune step
        #[arg(long)]
        no_prune: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    volborg completion bash >> ~/.bashrc

    # Zsh
    volborg completion zsh > ~/.zfunc/_volborg"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the path the configuration is loaded from
    Path,
    /// Print the repository location resolved for a volume
    Repo {
        #[command(flatten)]
        target: VolumeArgs,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
