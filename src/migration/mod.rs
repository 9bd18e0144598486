//! Flat-file store migration
//!
//! One-way conversion of legacy `.md` pages into the versioned layout:
//! every page gets a `v1` record holding its exact body, a manifest, and an
//! entry in the page index. Legacy files are never modified, so
//! [`rollback_migration`] can always return to the pre-migration state.

mod engine;
mod progress;
mod report;
mod rollback;
mod validate;

pub use engine::{MigrationEngine, DEFAULT_AUTHOR, MIGRATION_COMMENT};
pub use progress::{CancelFlag, ChannelObserver, NoopObserver, ProgressEvent, ProgressObserver};
pub use report::{
    codes, MigrationLogEntry, MigrationReport, ReportIssue, RollbackReport, ValidationReport,
};
pub use rollback::rollback_migration;
pub use validate::validate_migration;

/// Options for a single migration run
#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    /// Discover and pre-validate only; nothing is written
    pub dry_run: bool,
    /// Log every page, not just failures
    pub verbose: bool,
    /// Checked between pages
    pub cancel: Option<CancelFlag>,
}

impl MigrationOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, CancelFlag::is_cancelled)
    }
}
