use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{checkout, commit, compare, log, restore, tag};

#[derive(Parser)]
#[command(name = "retrace")]
#[command(version, about = "Lightweight local version control with delta snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the current state of a file or directory as a new version
    #[command(visible_alias = "push")]
    Commit {
        /// File or directory to snapshot
        path: PathBuf,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show version history
    #[command(visible_alias = "pull")]
    Log {
        /// Number of versions to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Restore a saved version into the working tree
    #[command(visible_alias = "retrace")]
    Checkout {
        /// File or directory to restore
        path: PathBuf,

        /// Version name to restore
        #[arg(long)]
        version: String,

        /// Show what would change without restoring
        #[arg(long)]
        diff: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List safety backups
    Tag {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Restore from a safety backup
    Restore {
        /// Backup name, as listed by `retrace tag`
        backup: String,

        /// File or directory to restore into
        path: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the differences between two versions
    Compare {
        /// Older version name
        version_a: String,

        /// Newer version name
        version_b: String,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Commit {
            path,
            message,
            config,
        } => {
            commit::run(path, message, config)?;
        }
        Commands::Log { limit, config } => {
            log::run(limit, config)?;
        }
        Commands::Checkout {
            path,
            version,
            diff,
            force,
            config,
        } => {
            checkout::run(path, version, diff, force, config)?;
        }
        Commands::Tag { config } => {
            tag::run(config)?;
        }
        Commands::Restore {
            backup,
            path,
            force,
            config,
        } => {
            restore::run(backup, path, force, config)?;
        }
        Commands::Compare {
            version_a,
            version_b,
            config,
        } => {
            compare::run(version_a, version_b, config)?;
        }
    }

    Ok(())
}
