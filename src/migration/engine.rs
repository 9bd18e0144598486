//! Migration engine
//!
//! Converts a flat-file store into the versioned layout in six phases. Each
//! phase finishes before the next begins:
//!
//! 1. Discovery: parse every legacy file; files without uuid/title are skipped
//! 2. Pre-validation: duplicate UUIDs abort the run before any write
//! 3. Structure creation: `versions/` roots and the data directory
//! 4. Per-page migration: v1 record then manifest; failures are per page
//! 5. Index build: from the pages that are now versioned
//! 6. Post-validation: re-read and re-hash what was written
//!
//! Dry run executes phases 1-2 and previews phase 4 without touching disk.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use crate::config::{VaultConfig, MAX_PARALLEL_PAGES};
use crate::errors::{VaultError, VaultResult};
use crate::fsutil;
use crate::index::{self, PageIndex, PageIndexEntry};
use crate::manifest::ManifestManager;
use crate::observability::{emit, Event, Logger, ObservationScope, Severity};
use crate::store::{LegacyPage, LegacyPageSource, SkipKind, StoreLayout};
use crate::version::{now_rfc3339, ChangeType, VersionMetadata, VersionPayload, VersionStore};

use super::progress::{NoopObserver, ProgressEvent, ProgressObserver};
use super::report::{
    codes, MigrationLogEntry, MigrationReport, ReportIssue, RollbackReport, ValidationReport,
};
use super::{rollback, validate, MigrationOptions};

/// Comment stamped on every migrated v1
pub const MIGRATION_COMMENT: &str = "Initial version (migrated from flat-file store)";

/// Author used when the legacy header names none
pub const DEFAULT_AUTHOR: &str = "system";

/// Result of migrating one page
#[derive(Debug)]
enum PageOutcome {
    Migrated(PageIndexEntry),
    /// Manifest already present from an earlier run
    AlreadyMigrated(PageIndexEntry),
    DryRun,
    Failed(VaultError),
}

/// Flat-file to versioned store migration
pub struct MigrationEngine<'a> {
    layout: StoreLayout,
    source: &'a dyn LegacyPageSource,
    records: VersionStore,
    manifests: ManifestManager,
    max_parallel_pages: usize,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(config: &VaultConfig, source: &'a dyn LegacyPageSource) -> Self {
        let layout = config.layout();
        Self {
            records: VersionStore::new(layout.clone()),
            manifests: ManifestManager::new(layout.clone()),
            layout,
            source,
            max_parallel_pages: config.migration.max_parallel_pages.clamp(1, MAX_PARALLEL_PAGES),
        }
    }

    /// Run a migration without progress reporting.
    pub fn migrate_from_flat_store(&self, options: &MigrationOptions) -> VaultResult<MigrationReport> {
        self.migrate_with_observer(options, &NoopObserver)
    }

    /// Run a migration, reporting progress after each page.
    ///
    /// # Errors
    ///
    /// Only run-level failures are errors: a discovery failure, a
    /// `DuplicateUuid` (no writes happened), or failing to create the
    /// `versions/` roots. Per-page failures land in the report.
    pub fn migrate_with_observer(
        &self,
        options: &MigrationOptions,
        observer: &dyn ProgressObserver,
    ) -> VaultResult<MigrationReport> {
        let _verbosity = options
            .verbose
            .then(|| Logger::with_threshold(Severity::Trace));
        let dry_run = if options.dry_run { "true" } else { "false" };
        let scope = ObservationScope::begin("MIGRATION", &[("dry_run", dry_run)]);
        let mut report = MigrationReport::new(options.dry_run);

        // Phase 1: discovery
        let discovery = match self.source.discover() {
            Ok(discovery) => discovery,
            Err(e) => {
                scope.fail(&e);
                return Err(e);
            }
        };
        report.pages_discovered = discovery.pages.len();
        for skipped in &discovery.skipped {
            report.pages_skipped += 1;
            let message = format!("{}: {}", skipped.path.display(), skipped.reason);
            emit(Severity::Warn, Event::PageSkipped, &[("reason", &message)]);
            match skipped.kind {
                SkipKind::MissingMetadata => report.warnings.push(ReportIssue::new(
                    codes::MISSING_METADATA,
                    None,
                    message,
                )),
                SkipKind::Unreadable => {
                    report
                        .errors
                        .push(ReportIssue::new(codes::UNREADABLE_FILE, None, message))
                }
            }
        }

        let pages = discovery.pages;
        if pages.is_empty() {
            report.success = true;
            report.duration_ms = scope.elapsed_millis();
            scope.complete(&[("pages_processed", "0")]);
            return Ok(report);
        }

        // Phase 2: pre-validation
        if let Err(e) = self.pre_validate(&pages, &mut report) {
            scope.fail(&e);
            return Err(e);
        }

        // Phase 3: structure creation
        if !options.dry_run {
            if let Err(e) = self.create_structure() {
                scope.fail(&e);
                return Err(e);
            }
        }

        // Phase 4: per-page migration
        let outcomes = self.migrate_pages(&pages, options, observer);
        let mut index_entries = Vec::new();
        let mut attempted = 0;
        for (page, outcome) in pages.iter().zip(outcomes) {
            let Some(outcome) = outcome else { continue };
            attempted += 1;
            match outcome {
                PageOutcome::Migrated(entry) => {
                    report.pages_processed += 1;
                    report.migration_log.push(log_entry(page));
                    index_entries.push(entry);
                }
                PageOutcome::DryRun => {
                    report.pages_processed += 1;
                    report.migration_log.push(log_entry(page));
                }
                PageOutcome::AlreadyMigrated(entry) => {
                    report.pages_skipped += 1;
                    report.warnings.push(ReportIssue::new(
                        codes::ALREADY_MIGRATED,
                        Some(&page.uuid),
                        format!("{} ({}) already has a manifest", page.title, page.file_name),
                    ));
                    index_entries.push(entry);
                }
                PageOutcome::Failed(e) => {
                    report.pages_failed += 1;
                    report.errors.push(ReportIssue::from_error(Some(&page.uuid), &e));
                }
            }
        }

        if options.is_cancelled() && attempted < pages.len() {
            report.cancelled = true;
            let message = format!("cancelled after {} of {} pages", attempted, pages.len());
            emit(Severity::Warn, Event::MigrationCancelled, &[("reason", &message)]);
            report
                .warnings
                .push(ReportIssue::new(codes::CANCELLED, None, message));
        }

        let mut index_failed = false;
        if !options.dry_run {
            // Phase 5: index build
            let index = PageIndex::new(self.layout.index_path());
            if let Err(e) = index.rebuild(index_entries) {
                index_failed = true;
                report.errors.push(ReportIssue::from_error(None, &e));
            }

            // Phase 6: post-validation
            let validation = validate::validate_migration(&self.layout);
            report.errors.extend(validation.errors.iter().cloned());
            report.warnings.extend(validation.warnings.iter().cloned());
            report.validation = Some(validation);
        }

        report.success = report.pages_failed == 0 && !index_failed && !report.cancelled;
        report.duration_ms = scope.elapsed_millis();

        let processed = report.pages_processed.to_string();
        let failed = report.pages_failed.to_string();
        scope.complete(&[("pages_processed", &processed), ("pages_failed", &failed)]);

        Ok(report)
    }

    /// Check the versioned layout against the page index.
    pub fn validate_migration(&self) -> ValidationReport {
        validate::validate_migration(&self.layout)
    }

    /// Remove all versioned data, leaving legacy files alone.
    pub fn rollback_migration(&self) -> VaultResult<RollbackReport> {
        rollback::rollback_migration(&self.layout)
    }

    /// Rebuild the page index from manifests already on disk.
    pub fn rebuild_index(&self) -> VaultResult<index::RebuildSummary> {
        let index = PageIndex::new(self.layout.index_path());
        index::rebuild_from_manifests(&index, &self.manifests)
    }

    fn pre_validate(&self, pages: &[LegacyPage], report: &mut MigrationReport) -> VaultResult<()> {
        let mut seen: HashMap<&str, &LegacyPage> = HashMap::with_capacity(pages.len());
        for page in pages {
            if let Some(first) = seen.insert(page.uuid.as_str(), page) {
                let first_file = first.path.display().to_string();
                let second_file = page.path.display().to_string();
                emit(
                    Severity::Error,
                    Event::MigrationAborted,
                    &[
                        ("uuid", &page.uuid),
                        ("first", &first_file),
                        ("second", &second_file),
                    ],
                );
                return Err(VaultError::DuplicateUuid(page.uuid.clone()));
            }
        }

        for page in pages {
            let exists = self
                .layout
                .page_dir(&page.uuid, page.location)
                .map(|dir| dir.exists())
                .unwrap_or(false);
            if exists {
                let message = format!(
                    "version directory already exists for {} ({})",
                    page.title, page.uuid
                );
                emit(
                    Severity::Warn,
                    Event::MigrationWarning,
                    &[("uuid", &page.uuid), ("reason", &message)],
                );
                report.warnings.push(ReportIssue::new(
                    codes::VERSION_DIR_EXISTS,
                    Some(&page.uuid),
                    message,
                ));
            }
        }

        Ok(())
    }

    fn create_structure(&self) -> VaultResult<()> {
        for root in self.layout.versions_roots() {
            fsutil::ensure_dir(&root)?;
        }
        fsutil::ensure_dir(self.layout.data_dir())
    }

    /// Migrate pages with bounded parallelism.
    ///
    /// Results keep discovery order; `None` marks a page not started
    /// because of cancellation.
    fn migrate_pages(
        &self,
        pages: &[LegacyPage],
        options: &MigrationOptions,
        observer: &dyn ProgressObserver,
    ) -> Vec<Option<PageOutcome>> {
        let total = pages.len();
        let workers = self.max_parallel_pages.min(total).max(1);
        let next = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        let results: Mutex<Vec<Option<PageOutcome>>> =
            Mutex::new((0..total).map(|_| None).collect());

        let worker = || loop {
            if options.is_cancelled() {
                break;
            }
            let idx = next.fetch_add(1, Ordering::SeqCst);
            if idx >= total {
                break;
            }

            let page = &pages[idx];
            let outcome = self.migrate_page(page, options.dry_run);
            log_outcome(page, &outcome, options.verbose);

            results.lock().unwrap_or_else(PoisonError::into_inner)[idx] = Some(outcome);

            let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
            observer.on_progress(&ProgressEvent::new(current, total, page.title.as_str()));
        };

        if workers == 1 {
            worker();
        } else {
            thread::scope(|s| {
                for _ in 0..workers {
                    s.spawn(&worker);
                }
            });
        }

        results.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn migrate_page(&self, page: &LegacyPage, dry_run: bool) -> PageOutcome {
        if dry_run {
            return PageOutcome::DryRun;
        }

        if self.manifests.exists(&page.uuid, page.location) {
            return match self.manifests.read_manifest(&page.uuid, page.location) {
                Ok(manifest) => PageOutcome::AlreadyMigrated(index::entry_from_manifest(
                    &manifest,
                    page.location,
                )),
                Err(e) => PageOutcome::Failed(e),
            };
        }

        let metadata = VersionMetadata::for_content(
            1,
            &page.content,
            page.author.as_deref().unwrap_or(DEFAULT_AUTHOR),
            ChangeType::Created,
            MIGRATION_COMMENT,
        )
        .with_date_created(page.last_modified.clone().unwrap_or_else(now_rfc3339));

        let payload = VersionPayload::Full(page.content.clone());
        let metadata = match self
            .records
            .write_version(&page.uuid, page.location, &payload, metadata)
        {
            Ok(metadata) => metadata,
            Err(e) => return PageOutcome::Failed(e),
        };

        match self
            .manifests
            .create_manifest(&page.uuid, page.location, &page.title, metadata)
        {
            Ok(manifest) => {
                PageOutcome::Migrated(index::entry_from_manifest(&manifest, page.location))
            }
            Err(e) => {
                let _ = self
                    .records
                    .discard_uncommitted(&page.uuid, page.location, 1);
                PageOutcome::Failed(e)
            }
        }
    }
}

fn log_entry(page: &LegacyPage) -> MigrationLogEntry {
    MigrationLogEntry {
        uuid: page.uuid.clone(),
        title: page.title.clone(),
        location: page.location,
        timestamp: now_rfc3339(),
    }
}

fn log_outcome(page: &LegacyPage, outcome: &PageOutcome, verbose: bool) {
    let location = page.location.as_str();
    match outcome {
        PageOutcome::Failed(e) => {
            let reason = e.to_string();
            emit(
                Severity::Error,
                Event::PageFailed,
                &[
                    ("uuid", &page.uuid),
                    ("file", &page.file_name),
                    ("reason", &reason),
                ],
            );
        }
        _ if !verbose => {}
        PageOutcome::Migrated(_) => emit(
            Severity::Trace,
            Event::PageMigrated,
            &[("uuid", &page.uuid), ("title", &page.title), ("location", location)],
        ),
        PageOutcome::DryRun => emit(
            Severity::Trace,
            Event::PageDryRun,
            &[("uuid", &page.uuid), ("title", &page.title), ("location", location)],
        ),
        PageOutcome::AlreadyMigrated(_) => emit(
            Severity::Trace,
            Event::PageSkipped,
            &[("uuid", &page.uuid), ("reason", "already migrated")],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LegacyDiscovery, PageLocation};
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Source serving pages from memory
    struct MemorySource {
        pages: Vec<LegacyPage>,
        fail: bool,
    }

    impl LegacyPageSource for MemorySource {
        fn discover(&self) -> VaultResult<LegacyDiscovery> {
            if self.fail {
                return Err(VaultError::Io {
                    path: "pages".to_string(),
                    message: "permission denied".to_string(),
                });
            }
            Ok(LegacyDiscovery {
                pages: self.pages.clone(),
                skipped: Vec::new(),
            })
        }
    }

    fn page(uuid: &str, title: &str, content: &str) -> LegacyPage {
        LegacyPage {
            path: PathBuf::from(format!("{}.md", title)),
            file_name: format!("{}.md", title),
            uuid: uuid.to_string(),
            title: title.to_string(),
            author: None,
            last_modified: None,
            content: content.to_string(),
            location: PageLocation::Pages,
        }
    }

    #[test]
    fn test_discovery_failure_is_returned() {
        let temp_dir = TempDir::new().unwrap();
        let config = VaultConfig::rooted(temp_dir.path());
        let source = MemorySource {
            pages: Vec::new(),
            fail: true,
        };

        let err = MigrationEngine::new(&config, &source)
            .migrate_from_flat_store(&MigrationOptions::default())
            .unwrap_err();
        assert_eq!(err.code(), "VAULT_IO");
    }

    #[test]
    fn test_duplicate_names_both_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = VaultConfig::rooted(temp_dir.path());
        let source = MemorySource {
            pages: vec![page("dup-1", "a", "x"), page("dup-1", "b", "y")],
            fail: false,
        };

        let engine = MigrationEngine::new(&config, &source);
        let mut report = MigrationReport::new(false);
        let err = engine.pre_validate(&source.pages, &mut report).unwrap_err();

        assert_eq!(err, VaultError::DuplicateUuid("dup-1".to_string()));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_invalid_page_id_fails_only_that_page() {
        let temp_dir = TempDir::new().unwrap();
        let config = VaultConfig::rooted(temp_dir.path());
        let source = MemorySource {
            pages: vec![page("../escape", "bad", "x"), page("uuid-ok", "good", "y")],
            fail: false,
        };

        let report = MigrationEngine::new(&config, &source)
            .migrate_from_flat_store(&MigrationOptions::default())
            .unwrap();

        assert_eq!(report.pages_processed, 1);
        assert_eq!(report.pages_failed, 1);
        assert_eq!(report.errors[0].code, "VAULT_INVALID_ARGUMENT");
        assert!(!temp_dir.path().join("escape").exists());
        assert!(!report.success);
    }

    #[test]
    fn test_dry_run_outcome_per_page() {
        let temp_dir = TempDir::new().unwrap();
        let config = VaultConfig::rooted(temp_dir.path());
        let source = MemorySource {
            pages: vec![page("uuid-1", "one", "1"), page("uuid-2", "two", "2")],
            fail: false,
        };

        let report = MigrationEngine::new(&config, &source)
            .migrate_from_flat_store(&MigrationOptions::dry_run())
            .unwrap();

        assert!(report.success);
        assert_eq!(report.pages_processed, 2);
        assert_eq!(report.migration_log.len(), 2);
        assert!(!temp_dir.path().join("versions").exists());
    }

    #[test]
    fn test_v1_metadata_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = VaultConfig::rooted(temp_dir.path());
        let source = MemorySource {
            pages: vec![page("uuid-1", "one", "body")],
            fail: false,
        };

        let engine = MigrationEngine::new(&config, &source);
        let outcome = engine.migrate_page(&source.pages[0], false);
        let PageOutcome::Migrated(entry) = &outcome else {
            panic!("unexpected outcome: {:?}", outcome);
        };
        assert_eq!(entry.current_version, 1);
        assert_eq!(entry.author, DEFAULT_AUTHOR);

        let meta = engine
            .records
            .read_metadata("uuid-1", PageLocation::Pages, 1)
            .unwrap();
        assert_eq!(meta.comment, MIGRATION_COMMENT);
        assert!(!meta.compressed);
        assert!(!meta.is_delta);
    }
}
