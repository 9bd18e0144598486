//! CLI module for pagevault
//!
//! Operator commands:
//! - migrate / validate / rollback / reindex: flat-file store migration
//! - history / show / diff / restore / info: version history of one page

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{load_config, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
