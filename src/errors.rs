//! # Vault Errors
//!
//! Error types shared by every storage component.
//!
//! "Page not found" and "version not found" are distinct variants so callers
//! can render different messages, and `Unsupported` is distinct from both so
//! a backend without versioning is never reported as a missing page.

use std::io;
use std::path::Path;

use thiserror::Error;

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Version storage errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VaultError {
    // ==================
    // Lookup Errors
    // ==================
    /// Page has no manifest (or is unknown to the index)
    #[error("Page not found: {0}")]
    NotFound(String),

    /// Page exists but the version number is out of range
    #[error("Version {version} not found for page {page_id} (current: {current})")]
    VersionNotFound {
        page_id: String,
        version: u64,
        current: u64,
    },

    // ==================
    // Write Ordering Errors
    // ==================
    /// Manifest append does not follow `currentVersion + 1`
    #[error("Out-of-order append for page {page_id}: expected version {expected}, got {actual}")]
    OutOfOrder {
        page_id: String,
        expected: u64,
        actual: u64,
    },

    /// Manifest or version directory already present
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Two legacy pages share a UUID
    #[error("Duplicate UUID found: {0}")]
    DuplicateUuid(String),

    // ==================
    // Integrity Errors
    // ==================
    /// Stored hash does not match the reconstructed content
    #[error("Integrity mismatch for page {page_id} v{version}: expected {expected}, computed {actual}")]
    IntegrityMismatch {
        page_id: String,
        version: u64,
        expected: String,
        actual: String,
    },

    /// Stored artifact could not be parsed or applied
    #[error("Corrupt artifact at {path}: {reason}")]
    Corrupt { path: String, reason: String },

    // ==================
    // Environment Errors
    // ==================
    /// Underlying storage failure
    #[error("I/O error at {path}: {message}")]
    Io { path: String, message: String },

    /// Versioning requested on a backend that has none
    #[error("Versioning not supported: {0}")]
    Unsupported(String),

    /// Caller supplied an invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl VaultError {
    /// Wrap an I/O error with the path it happened at
    pub fn io(path: &Path, source: io::Error) -> Self {
        VaultError::Io {
            path: path.display().to_string(),
            message: source.to_string(),
        }
    }

    /// Build a corruption error for an artifact
    pub fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        VaultError::Corrupt {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::NotFound(_) => "VAULT_NOT_FOUND",
            VaultError::VersionNotFound { .. } => "VAULT_VERSION_NOT_FOUND",
            VaultError::OutOfOrder { .. } => "VAULT_OUT_OF_ORDER",
            VaultError::AlreadyExists(_) => "VAULT_ALREADY_EXISTS",
            VaultError::DuplicateUuid(_) => "VAULT_DUPLICATE_UUID",
            VaultError::IntegrityMismatch { .. } => "VAULT_INTEGRITY_MISMATCH",
            VaultError::Corrupt { .. } => "VAULT_CORRUPT",
            VaultError::Io { .. } => "VAULT_IO",
            VaultError::Unsupported(_) => "VAULT_UNSUPPORTED",
            VaultError::InvalidArgument(_) => "VAULT_INVALID_ARGUMENT",
        }
    }

    /// True for a missing page or a missing version
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VaultError::NotFound(_) | VaultError::VersionNotFound { .. }
        )
    }

    /// True when the backend has no versioning at all
    pub fn is_unsupported(&self) -> bool {
        matches!(self, VaultError::Unsupported(_))
    }
}
