//! Observable events
//!
//! Every log line emitted by the vault names one of these events.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Version writes
    /// Version record committed
    VersionWritten,
    /// Version stored as full checkpoint
    CheckpointWritten,
    /// Manifest created for a new page
    ManifestCreated,
    /// Manifest appended with a new version
    ManifestAppended,
    /// Restore created a new version
    VersionRestored,
    /// Uncommitted version directory removed before a write
    OrphanDiscarded,

    // Reads
    /// Reconstructed content failed hash verification
    IntegrityMismatch,

    // Page index
    /// Page index persisted
    IndexSaved,
    /// Page index rebuilt from manifests
    IndexRebuilt,
    /// Manifest skipped during index rebuild
    IndexEntrySkipped,

    // Migration
    /// Legacy file skipped during discovery
    PageSkipped,
    /// Page migrated
    PageMigrated,
    /// Page migration failed
    PageFailed,
    /// Dry-run would have migrated a page
    PageDryRun,
    /// Migration aborted before writes
    MigrationAborted,
    /// Migration cancelled between pages
    MigrationCancelled,
    /// Pre-validation warning
    MigrationWarning,

    // Validation / rollback
    /// Validation finished
    ValidationResult,
    /// Rollback removed a version directory
    RollbackRemoved,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::VersionWritten => "VERSION_WRITTEN",
            Event::CheckpointWritten => "CHECKPOINT_WRITTEN",
            Event::ManifestCreated => "MANIFEST_CREATED",
            Event::ManifestAppended => "MANIFEST_APPENDED",
            Event::VersionRestored => "VERSION_RESTORED",
            Event::OrphanDiscarded => "ORPHAN_DISCARDED",

            Event::IntegrityMismatch => "INTEGRITY_MISMATCH",

            Event::IndexSaved => "INDEX_SAVED",
            Event::IndexRebuilt => "INDEX_REBUILT",
            Event::IndexEntrySkipped => "INDEX_ENTRY_SKIPPED",

            Event::PageSkipped => "PAGE_SKIPPED",
            Event::PageMigrated => "PAGE_MIGRATED",
            Event::PageFailed => "PAGE_FAILED",
            Event::PageDryRun => "PAGE_DRY_RUN",
            Event::MigrationAborted => "MIGRATION_ABORTED",
            Event::MigrationCancelled => "MIGRATION_CANCELLED",
            Event::MigrationWarning => "MIGRATION_WARNING",

            Event::ValidationResult => "VALIDATION_RESULT",
            Event::RollbackRemoved => "ROLLBACK_REMOVED",
        }
    }

    /// Returns true if the event reports a data problem
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::IntegrityMismatch | Event::PageFailed | Event::MigrationAborted
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
