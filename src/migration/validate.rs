//! Migration validation
//!
//! Report-generating: every problem becomes an entry, nothing is thrown.
//! Checked per indexed page:
//! - version directory and manifest exist
//! - manifest names the same page and lists versions `1..=currentVersion`
//! - v1 `contentHash` is a well-formed SHA-256 hex digest
//! - v1 content file exists and hashes to the stored `contentHash`
//!
//! Manifests without an index entry are warnings; rebuilding the index
//! fixes them.

use std::collections::BTreeSet;

use crate::errors::{VaultError, VaultResult};
use crate::hash;
use crate::index::{PageIndexEntry, PageIndexFile};
use crate::manifest::ManifestManager;
use crate::observability::{emit, Event, Severity};
use crate::store::{PageLocation, StoreLayout};
use crate::version::{VersionPayload, VersionStore};

use super::report::{codes, ReportIssue, ValidationReport};

/// Validate the versioned layout against the page index.
pub fn validate_migration(layout: &StoreLayout) -> ValidationReport {
    let mut report = ValidationReport::default();

    let index = match PageIndexFile::load(&layout.index_path()) {
        Ok(index) => index,
        Err(e) => {
            let message = match &e {
                VaultError::NotFound(_) => "page-index.json not found".to_string(),
                other => other.to_string(),
            };
            report.error(ReportIssue::new(e.code(), None, message));
            log_result(&report);
            return report;
        }
    };

    if index.page_count != index.pages.len() {
        report.warning(ReportIssue::new(
            codes::INDEX_STALE,
            None,
            format!(
                "pageCount {} does not match {} indexed pages",
                index.page_count,
                index.pages.len()
            ),
        ));
    }

    let records = VersionStore::new(layout.clone());
    let manifests = ManifestManager::new(layout.clone());

    for (uuid, entry) in &index.pages {
        report.pages_checked += 1;
        if let Err(e) = check_page(layout, &records, &manifests, uuid, entry, &mut report) {
            report.error(ReportIssue::from_error(Some(uuid), &e));
        }
    }

    let mut on_disk = BTreeSet::new();
    for location in PageLocation::ALL {
        match manifests.list_pages(location) {
            Ok(pages) => on_disk.extend(pages),
            Err(e) => report.warning(ReportIssue::from_error(None, &e)),
        }
    }
    for page_id in on_disk {
        if !index.pages.contains_key(&page_id) {
            report.warning(ReportIssue::new(
                codes::UNINDEXED_MANIFEST,
                Some(&page_id),
                format!("manifest for {} has no page index entry", page_id),
            ));
        }
    }

    log_result(&report);
    report
}

fn check_page(
    layout: &StoreLayout,
    records: &VersionStore,
    manifests: &ManifestManager,
    uuid: &str,
    entry: &PageIndexEntry,
    report: &mut ValidationReport,
) -> VaultResult<()> {
    let location = entry.location;

    if entry.uuid != uuid {
        report.warning(ReportIssue::new(
            codes::INDEX_STALE,
            Some(uuid),
            format!("index key {} holds entry for {}", uuid, entry.uuid),
        ));
    }

    let page_dir = layout.page_dir(uuid, location)?;
    if !page_dir.is_dir() {
        return Err(VaultError::NotFound(format!(
            "version directory for {}",
            uuid
        )));
    }

    let manifest = manifests
        .read_manifest(uuid, location)
        .map_err(|e| match e {
            VaultError::NotFound(_) => VaultError::NotFound(format!("manifest for {}", uuid)),
            other => other,
        })?;

    if manifest.page_id != uuid {
        return Err(VaultError::Corrupt {
            path: uuid.to_string(),
            reason: format!("pageId mismatch: manifest says {}", manifest.page_id),
        });
    }

    manifest.check_sequence().map_err(|reason| VaultError::Corrupt {
        path: uuid.to_string(),
        reason,
    })?;

    if manifest.current_version != 1 {
        report.warning(ReportIssue::new(
            codes::PAGE_EVOLVED,
            Some(uuid),
            format!(
                "{} has currentVersion {} (edited since migration)",
                uuid, manifest.current_version
            ),
        ));
    }
    if entry.current_version != manifest.current_version {
        report.warning(ReportIssue::new(
            codes::INDEX_STALE,
            Some(uuid),
            format!(
                "index lists v{} but manifest is at v{}",
                entry.current_version, manifest.current_version
            ),
        ));
    }

    let content_path = records
        .payload_path(uuid, location, 1)?
        .ok_or_else(|| VaultError::NotFound(format!("v1 content file for {}", uuid)))?;
    let meta = records.read_metadata(uuid, location, 1)?;
    if meta.is_delta {
        return Err(VaultError::corrupt(&content_path, "v1 must hold full content"));
    }
    if !hash::is_well_formed(&meta.content_hash) {
        return Err(VaultError::corrupt(
            &content_path,
            format!("malformed contentHash {:?}", meta.content_hash),
        ));
    }

    let actual = if meta.compressed {
        match records.read_version(uuid, location, 1)?.payload {
            VersionPayload::Full(content) => hash::content_hash(content.as_bytes()),
            VersionPayload::Delta(_) => {
                return Err(VaultError::corrupt(&content_path, "v1 must hold full content"))
            }
        }
    } else {
        hash::file_hash(&content_path)?
    };

    if !actual.eq_ignore_ascii_case(&meta.content_hash) {
        return Err(VaultError::IntegrityMismatch {
            page_id: uuid.to_string(),
            version: 1,
            expected: meta.content_hash,
            actual,
        });
    }

    let listed = manifest.require(1)?;
    if !listed.content_hash.eq_ignore_ascii_case(&meta.content_hash) {
        return Err(VaultError::IntegrityMismatch {
            page_id: uuid.to_string(),
            version: 1,
            expected: listed.content_hash.clone(),
            actual: meta.content_hash,
        });
    }

    Ok(())
}

fn log_result(report: &ValidationReport) {
    let checked = report.pages_checked.to_string();
    let errors = report.errors.len().to_string();
    let warnings = report.warnings.len().to_string();
    let severity = if report.valid {
        Severity::Info
    } else {
        Severity::Warn
    };
    emit(
        severity,
        Event::ValidationResult,
        &[
            ("valid", if report.valid { "true" } else { "false" }),
            ("pages_checked", &checked),
            ("errors", &errors),
            ("warnings", &warnings),
        ],
    );
}
