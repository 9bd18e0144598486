//! Page Index
//!
//! A single cross-page lookup table stored at `<data_dir>/page-index.json`.
//! Migration rebuilds it wholesale; runtime saves maintain it through
//! [`PageIndex::upsert`] and [`PageIndex::remove`]. If the file is lost it
//! can be recovered from the manifests with [`rebuild_from_manifests`].

mod page_index;

pub use page_index::{PageIndex, PageIndexEntry, PageIndexFile, INDEX_FORMAT_VERSION};

use serde::Serialize;

use crate::errors::VaultResult;
use crate::manifest::{ManifestManager, PageManifest};
use crate::observability::{emit, Event, Severity};
use crate::store::PageLocation;

/// Outcome of a rebuild from manifests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildSummary {
    pub pages_indexed: usize,
    /// `(page_id, reason)` for every manifest left out
    pub skipped: Vec<(String, String)>,
}

/// Build an index entry from a manifest
pub fn entry_from_manifest(manifest: &PageManifest, location: PageLocation) -> PageIndexEntry {
    let (last_modified, author) = manifest
        .latest()
        .map(|meta| (meta.date_created.clone(), meta.author.clone()))
        .unwrap_or_default();

    PageIndexEntry {
        uuid: manifest.page_id.clone(),
        title: manifest.page_name.clone(),
        current_version: manifest.current_version,
        location,
        last_modified,
        author,
        has_versions: !manifest.versions.is_empty(),
    }
}

/// Replace the index with one entry per readable manifest.
///
/// Unreadable manifests and ids that appear in both locations are skipped
/// and reported; the regular location wins a conflict.
pub fn rebuild_from_manifests(
    index: &PageIndex,
    manifests: &ManifestManager,
) -> VaultResult<RebuildSummary> {
    let mut entries: Vec<PageIndexEntry> = Vec::new();
    let mut summary = RebuildSummary::default();

    for location in PageLocation::ALL {
        for page_id in manifests.list_pages(location)? {
            if entries.iter().any(|entry| entry.uuid == page_id) {
                skip(&mut summary, page_id, "duplicate page id in another location".to_string());
                continue;
            }

            match manifests.read_manifest(&page_id, location) {
                Ok(manifest) => entries.push(entry_from_manifest(&manifest, location)),
                Err(e) => skip(&mut summary, page_id, e.to_string()),
            }
        }
    }

    summary.pages_indexed = entries.len();
    index.rebuild(entries)?;

    let indexed = summary.pages_indexed.to_string();
    let skipped = summary.skipped.len().to_string();
    emit(
        Severity::Info,
        Event::IndexRebuilt,
        &[("pages_indexed", &indexed), ("skipped", &skipped)],
    );

    Ok(summary)
}

fn skip(summary: &mut RebuildSummary, page_id: String, reason: String) {
    emit(
        Severity::Warn,
        Event::IndexEntrySkipped,
        &[("page_id", &page_id), ("reason", &reason)],
    );
    summary.skipped.push((page_id, reason));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreLayout;
    use crate::version::{ChangeType, VersionMetadata};
    use tempfile::TempDir;

    #[test]
    fn test_rebuild_from_manifests() {
        let temp_dir = TempDir::new().unwrap();
        let layout = StoreLayout::rooted(temp_dir.path());
        let manifests = ManifestManager::new(layout.clone());

        let v1 = VersionMetadata::for_content(1, "a", "system", ChangeType::Created, "");
        manifests
            .create_manifest("uuid-1", PageLocation::Pages, "First", v1.clone())
            .unwrap();
        manifests
            .create_manifest("uuid-2", PageLocation::RequiredPages, "Second", v1.clone())
            .unwrap();
        let v2 = VersionMetadata::for_content(2, "b", "alice", ChangeType::Updated, "");
        manifests
            .append_version("uuid-2", PageLocation::RequiredPages, v2, None)
            .unwrap();

        // Unreadable manifest is skipped, not fatal
        let broken = layout.manifest_path("uuid-3", PageLocation::Pages).unwrap();
        std::fs::create_dir_all(broken.parent().unwrap()).unwrap();
        std::fs::write(&broken, "garbage").unwrap();

        let index = PageIndex::new(layout.index_path());
        let summary = rebuild_from_manifests(&index, &manifests).unwrap();

        assert_eq!(summary.pages_indexed, 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].0, "uuid-3");

        let second = index.get("uuid-2").unwrap();
        assert_eq!(second.title, "Second");
        assert_eq!(second.current_version, 2);
        assert_eq!(second.location, PageLocation::RequiredPages);
        assert_eq!(second.author, "alice");

        let reopened = PageIndex::open(layout.index_path()).unwrap();
        assert_eq!(reopened.len(), 2);
    }
}
