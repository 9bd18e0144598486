//! Migration rollback
//!
//! Removes every page directory under each `versions/` root, the roots
//! themselves once empty, and the page index file. Works from what is on
//! disk, so it also cleans up after a partial or interrupted migration.
//! Legacy page files live beside the `versions/` roots and are never
//! touched.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::errors::{VaultError, VaultResult};
use crate::observability::{emit, Event, Severity};
use crate::store::StoreLayout;

use super::report::RollbackReport;

/// Remove all versioned data.
pub fn rollback_migration(layout: &StoreLayout) -> VaultResult<RollbackReport> {
    let mut report = RollbackReport::default();

    for root in layout.versions_roots() {
        let entries = match fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(VaultError::io(&root, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| VaultError::io(&root, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| VaultError::io(&path, e))?;
            if !file_type.is_dir() {
                continue;
            }

            fs::remove_dir_all(&path).map_err(|e| VaultError::io(&path, e))?;
            report.version_directories_removed += 1;

            let path_str = path.display().to_string();
            emit(Severity::Trace, Event::RollbackRemoved, &[("path", &path_str)]);
        }

        if is_empty_dir(&root)? {
            fs::remove_dir(&root).map_err(|e| VaultError::io(&root, e))?;
            report.roots_removed += 1;
        }
    }

    let index_path = layout.index_path();
    match fs::remove_file(&index_path) {
        Ok(()) => report.index_removed = true,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(VaultError::io(&index_path, e)),
    }

    let dirs = report.version_directories_removed.to_string();
    emit(
        Severity::Info,
        Event::RollbackRemoved,
        &[
            ("version_directories_removed", &dirs),
            ("index_removed", if report.index_removed { "true" } else { "false" }),
        ],
    );

    Ok(report)
}

fn is_empty_dir(path: &Path) -> VaultResult<bool> {
    let mut entries = fs::read_dir(path).map_err(|e| VaultError::io(path, e))?;
    Ok(entries.next().is_none())
}
