//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// careplan - medical report analysis and treatment-plan boards
#[derive(Parser, Debug)]
#[command(
    name = "cp",
    about = "Analyse medical reports and turn treatment plans into task boards",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Shorthand for --log-level DEBUG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Email of the user to act as (overrides session.user-email)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Effective log level, `--verbose` winning over `--log-level`
    pub fn effective_log_level(&self) -> Option<&str> {
        if self.verbose {
            Some("DEBUG")
        } else {
            self.log_level.as_deref()
        }
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Manage records
    Record {
        #[command(subcommand)]
        command: RecordCommand,
    },

    /// Upload a report to a record and analyse it
    Upload {
        /// Record ID
        record_id: String,

        /// Report file (PDF, image, text)
        file: PathBuf,
    },

    /// Turn a record's narrative into a treatment board
    Structure {
        /// Record ID
        record_id: String,
    },

    /// Describe an image with the vision model
    Describe {
        /// Image file, or a `data:<mime>;base64,` URL
        image: String,
    },
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Add a user
    Add {
        /// Email address
        email: String,

        /// Display name
        name: String,
    },
}

/// Record subcommands
#[derive(Debug, Subcommand)]
pub enum RecordCommand {
    /// Create a record for the current user
    New {
        /// Record name
        name: String,
    },

    /// List the current user's records
    List,

    /// Show a record's narrative and board
    Show {
        /// Record ID
        id: String,
    },
}
