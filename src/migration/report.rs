//! Migration, validation and rollback reports
//!
//! Plain values. The engine never persists them; the caller decides where
//! a report goes (the CLI writes it next to the page index).

use std::path::Path;

use serde::Serialize;

use crate::errors::{VaultError, VaultResult};
use crate::fsutil;
use crate::store::PageLocation;
use crate::version::now_rfc3339;

/// Warning codes used in reports
pub mod codes {
    pub const MISSING_METADATA: &str = "MISSING_METADATA";
    pub const UNREADABLE_FILE: &str = "UNREADABLE_FILE";
    pub const VERSION_DIR_EXISTS: &str = "VERSION_DIR_EXISTS";
    pub const ALREADY_MIGRATED: &str = "ALREADY_MIGRATED";
    pub const CANCELLED: &str = "CANCELLED";
    pub const PAGE_EVOLVED: &str = "PAGE_EVOLVED";
    pub const INDEX_STALE: &str = "INDEX_STALE";
    pub const UNINDEXED_MANIFEST: &str = "UNINDEXED_MANIFEST";
}

/// One error or warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIssue {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    pub message: String,
}

impl ReportIssue {
    pub fn new(code: &str, page_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            page_id: page_id.map(str::to_string),
            message: message.into(),
        }
    }

    /// Issue carrying the error's code and message
    pub fn from_error(page_id: Option<&str>, error: &VaultError) -> Self {
        Self::new(error.code(), page_id, error.to_string())
    }
}

/// Per-page migration log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationLogEntry {
    pub uuid: String,
    pub title: String,
    pub location: PageLocation,
    pub timestamp: String,
}

/// Outcome of `validate_migration`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub pages_checked: usize,
    pub errors: Vec<ReportIssue>,
    pub warnings: Vec<ReportIssue>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            valid: true,
            pages_checked: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ValidationReport {
    pub fn error(&mut self, issue: ReportIssue) {
        self.valid = false;
        self.errors.push(issue);
    }

    pub fn warning(&mut self, issue: ReportIssue) {
        self.warnings.push(issue);
    }

    /// Errors that name `page_id`
    pub fn errors_for(&self, page_id: &str) -> Vec<&ReportIssue> {
        self.errors
            .iter()
            .filter(|issue| issue.page_id.as_deref() == Some(page_id))
            .collect()
    }
}

/// Outcome of `rollback_migration`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    pub version_directories_removed: usize,
    pub index_removed: bool,
    /// Empty `versions/` roots removed afterwards
    pub roots_removed: usize,
}

/// Outcome of a migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub success: bool,
    pub dry_run: bool,
    pub cancelled: bool,
    pub duration_ms: u64,
    pub pages_discovered: usize,
    pub pages_processed: usize,
    pub pages_failed: usize,
    pub pages_skipped: usize,
    pub errors: Vec<ReportIssue>,
    pub warnings: Vec<ReportIssue>,
    pub migration_log: Vec<MigrationLogEntry>,
    /// Post-migration validation, absent in dry-run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    pub timestamp: String,
}

impl MigrationReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            success: false,
            dry_run,
            cancelled: false,
            duration_ms: 0,
            pages_discovered: 0,
            pages_processed: 0,
            pages_failed: 0,
            pages_skipped: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            migration_log: Vec::new(),
            validation: None,
            timestamp: now_rfc3339(),
        }
    }

    /// Serializes the report to pretty-printed JSON.
    pub fn to_json(&self) -> VaultResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| VaultError::Corrupt {
            path: "migration report".to_string(),
            reason: format!("failed to serialize report: {}", e),
        })
    }

    /// Writes the report atomically.
    pub fn write_to_file(&self, path: &Path) -> VaultResult<()> {
        fsutil::write_atomic(path, self.to_json()?.as_bytes())
    }
}
