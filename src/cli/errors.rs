//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code.

use std::fmt;
use std::io;

use crate::errors::VaultError;

/// Stable codes written to the `error.code` field of CLI output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    ConfigError,
    /// stdout or report file
    IoError,
    /// Destructive command run without confirmation
    NotConfirmed,
    /// Wraps a `VaultError`; the message keeps its `VAULT_*` code
    VaultError,
    /// Migration finished with failures
    MigrationFailed,
    /// Validation found errors
    ValidationFailed,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "PAGEVAULT_CLI_CONFIG_ERROR",
            Self::IoError => "PAGEVAULT_CLI_IO_ERROR",
            Self::NotConfirmed => "PAGEVAULT_CLI_NOT_CONFIRMED",
            Self::VaultError => "PAGEVAULT_CLI_VAULT_ERROR",
            Self::MigrationFailed => "PAGEVAULT_CLI_MIGRATION_FAILED",
            Self::ValidationFailed => "PAGEVAULT_CLI_VALIDATION_FAILED",
        }
    }
}

/// Error ending a CLI command
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Rollback without `--yes`
    pub fn not_confirmed() -> Self {
        Self::new(
            CliErrorCode::NotConfirmed,
            "Rollback removes all version history. Re-run with --yes to confirm.",
        )
    }

    /// Migration report lists failures
    pub fn migration_failed(failed: usize) -> Self {
        Self::new(
            CliErrorCode::MigrationFailed,
            format!("Migration finished with {} failed page(s)", failed),
        )
    }

    /// Validation report lists errors
    pub fn validation_failed(errors: usize) -> Self {
        Self::new(
            CliErrorCode::ValidationFailed,
            format!("Validation found {} error(s)", errors),
        )
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Code string for the JSON error envelope
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<VaultError> for CliError {
    fn from(e: VaultError) -> Self {
        Self::new(CliErrorCode::VaultError, format!("{}: {}", e.code(), e))
    }
}

pub type CliResult<T> = Result<T, CliError>;
