//! CLI argument definitions using clap
//!
//! Commands:
//! - pagevault migrate [--dry-run] [--verbose] [--report <path>]
//! - pagevault validate
//! - pagevault rollback --yes
//! - pagevault reindex
//! - pagevault history <page> [--limit <n>]
//! - pagevault show <page> <version>
//! - pagevault diff <page> <v1> <v2>
//! - pagevault restore <page> <version> [--author <a>] [--comment <c>]
//! - pagevault info <page>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pagevault - versioned page storage
#[derive(Parser, Debug)]
#[command(name = "pagevault")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Migrate the flat-file store into versioned storage
    Migrate {
        /// Discover and pre-validate without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Log every page, not just failures
        #[arg(long)]
        verbose: bool,

        /// Where to write the migration report
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Check versioned storage against the page index
    Validate,

    /// Remove all versioned data; legacy files are kept
    Rollback {
        /// Confirm removal
        #[arg(long)]
        yes: bool,
    },

    /// Rebuild the page index from manifests
    Reindex,

    /// List versions of a page, newest first
    History {
        /// Page UUID or title
        page: String,

        /// Maximum number of versions to list
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the content of one version
    Show {
        /// Page UUID or title
        page: String,
        version: u64,
    },

    /// Line diff between two versions
    Diff {
        /// Page UUID or title
        page: String,
        v1: u64,
        v2: u64,
    },

    /// Restore a version as a new version
    Restore {
        /// Page UUID or title
        page: String,
        version: u64,

        #[arg(long, default_value = "system")]
        author: String,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Storage statistics for a page
    Info {
        /// Page UUID or title
        page: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
