//! Manifest Manager
//!
//! Creates, appends to and reads `manifest.json`. Every write replaces the
//! whole file through temp + fsync + rename. Callers serialize writers per
//! page; the manager itself only enforces ordering.

use std::fs;
use std::io::ErrorKind;

use crate::errors::{VaultError, VaultResult};
use crate::fsutil;
use crate::observability::{emit, Event, Severity};
use crate::store::{PageLocation, StoreLayout};
use crate::version::VersionMetadata;

use super::PageManifest;

#[derive(Debug, Clone)]
pub struct ManifestManager {
    layout: StoreLayout,
}

impl ManifestManager {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Create the manifest for a new page.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the page already has a manifest
    /// - `OutOfOrder` if `first` is not version 1
    pub fn create_manifest(
        &self,
        page_id: &str,
        location: PageLocation,
        page_name: &str,
        first: VersionMetadata,
    ) -> VaultResult<PageManifest> {
        let path = self.layout.manifest_path(page_id, location)?;
        if path.exists() {
            return Err(VaultError::AlreadyExists(path.display().to_string()));
        }
        if first.version != 1 {
            return Err(VaultError::OutOfOrder {
                page_id: page_id.to_string(),
                expected: 1,
                actual: first.version,
            });
        }

        let manifest = PageManifest::new(page_id, page_name, first);
        fsutil::write_atomic(&path, manifest.to_json()?.as_bytes())?;

        emit(
            Severity::Trace,
            Event::ManifestCreated,
            &[("page_id", page_id), ("location", location.as_str())],
        );

        Ok(manifest)
    }

    /// Append a version and bump `currentVersion`.
    ///
    /// A `page_name` is recorded in the same rewrite, so a retitled save
    /// commits name and version together.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the page has no manifest
    /// - `OutOfOrder` unless `metadata.version == currentVersion + 1`
    pub fn append_version(
        &self,
        page_id: &str,
        location: PageLocation,
        metadata: VersionMetadata,
        page_name: Option<&str>,
    ) -> VaultResult<PageManifest> {
        let mut manifest = self.read_manifest(page_id, location)?;

        let expected = manifest.current_version + 1;
        if metadata.version != expected {
            return Err(VaultError::OutOfOrder {
                page_id: page_id.to_string(),
                expected,
                actual: metadata.version,
            });
        }

        manifest.current_version = metadata.version;
        manifest.versions.push(metadata);
        if let Some(name) = page_name {
            manifest.page_name = name.to_string();
        }

        self.write_manifest(location, &manifest)?;

        let version_str = manifest.current_version.to_string();
        emit(
            Severity::Trace,
            Event::ManifestAppended,
            &[("page_id", page_id), ("version", &version_str)],
        );

        Ok(manifest)
    }

    /// Read a page manifest.
    ///
    /// # Errors
    ///
    /// - `NotFound` if absent
    /// - `Corrupt` if the file does not parse
    pub fn read_manifest(&self, page_id: &str, location: PageLocation) -> VaultResult<PageManifest> {
        let path = self.layout.manifest_path(page_id, location)?;
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(VaultError::NotFound(page_id.to_string()));
            }
            Err(e) => return Err(VaultError::io(&path, e)),
        };

        PageManifest::from_json(&json, &path.display().to_string())
    }

    pub fn exists(&self, page_id: &str, location: PageLocation) -> bool {
        self.layout
            .manifest_path(page_id, location)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Page ids with a manifest under a location, sorted.
    pub fn list_pages(&self, location: PageLocation) -> VaultResult<Vec<String>> {
        let root = self.layout.versions_root(location);
        let entries = match fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(VaultError::io(&root, e)),
        };

        let mut pages = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| VaultError::io(&root, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if fsutil::is_temp_name(&name) {
                continue;
            }
            if self.exists(&name, location) {
                pages.push(name);
            }
        }
        pages.sort();
        Ok(pages)
    }

    fn write_manifest(&self, location: PageLocation, manifest: &PageManifest) -> VaultResult<()> {
        let path = self.layout.manifest_path(&manifest.page_id, location)?;
        fsutil::write_atomic(&path, manifest.to_json()?.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::ChangeType;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ManifestManager) {
        let temp_dir = TempDir::new().unwrap();
        let manager = ManifestManager::new(StoreLayout::rooted(temp_dir.path()));
        (temp_dir, manager)
    }

    fn meta(version: u64) -> VersionMetadata {
        VersionMetadata::for_content(version, "x", "system", ChangeType::Created, "")
    }

    #[test]
    fn test_create_and_read() {
        let (temp_dir, manager) = setup();

        manager
            .create_manifest("uuid-1", PageLocation::Pages, "Test", meta(1))
            .unwrap();

        assert!(temp_dir
            .path()
            .join("versions/uuid-1/manifest.json")
            .is_file());
        let manifest = manager.read_manifest("uuid-1", PageLocation::Pages).unwrap();
        assert_eq!(manifest.page_id, "uuid-1");
        assert_eq!(manifest.page_name, "Test");
        assert_eq!(manifest.current_version, 1);
    }

    #[test]
    fn test_create_twice_fails() {
        let (_temp_dir, manager) = setup();
        manager
            .create_manifest("uuid-1", PageLocation::Pages, "Test", meta(1))
            .unwrap();

        let result = manager.create_manifest("uuid-1", PageLocation::Pages, "Test", meta(1));
        assert!(matches!(result, Err(VaultError::AlreadyExists(_))));
    }

    #[test]
    fn test_create_requires_version_one() {
        let (_temp_dir, manager) = setup();
        let result = manager.create_manifest("uuid-1", PageLocation::Pages, "Test", meta(2));
        assert!(matches!(
            result,
            Err(VaultError::OutOfOrder {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_append_bumps_current() {
        let (_temp_dir, manager) = setup();
        manager
            .create_manifest("uuid-1", PageLocation::Pages, "Test", meta(1))
            .unwrap();

        let manifest = manager
            .append_version("uuid-1", PageLocation::Pages, meta(2), None)
            .unwrap();
        assert_eq!(manifest.current_version, 2);

        let reread = manager.read_manifest("uuid-1", PageLocation::Pages).unwrap();
        assert_eq!(reread.versions.len(), 2);
        assert!(reread.check_sequence().is_ok());
    }

    #[test]
    fn test_append_out_of_order_rejected() {
        let (_temp_dir, manager) = setup();
        manager
            .create_manifest("uuid-1", PageLocation::Pages, "Test", meta(1))
            .unwrap();

        for bad in [1, 3, 0] {
            let result = manager.append_version("uuid-1", PageLocation::Pages, meta(bad), None);
            assert!(
                matches!(result, Err(VaultError::OutOfOrder { expected: 2, .. })),
                "v{} should be rejected",
                bad
            );
        }

        let manifest = manager.read_manifest("uuid-1", PageLocation::Pages).unwrap();
        assert_eq!(manifest.current_version, 1);
    }

    #[test]
    fn test_append_missing_manifest() {
        let (_temp_dir, manager) = setup();
        let result = manager.append_version("uuid-1", PageLocation::Pages, meta(1), None);
        assert!(matches!(result, Err(VaultError::NotFound(_))));
    }

    #[test]
    fn test_read_missing_and_corrupt() {
        let (temp_dir, manager) = setup();
        assert!(matches!(
            manager.read_manifest("uuid-1", PageLocation::Pages),
            Err(VaultError::NotFound(_))
        ));

        let dir = temp_dir.path().join("versions/uuid-1");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("manifest.json"), "{\"pageId\":").unwrap();
        assert!(matches!(
            manager.read_manifest("uuid-1", PageLocation::Pages),
            Err(VaultError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_append_with_new_name() {
        let (_temp_dir, manager) = setup();
        manager
            .create_manifest("uuid-1", PageLocation::Pages, "Old", meta(1))
            .unwrap();

        manager
            .append_version("uuid-1", PageLocation::Pages, meta(2), Some("New"))
            .unwrap();

        let manifest = manager.read_manifest("uuid-1", PageLocation::Pages).unwrap();
        assert_eq!(manifest.page_name, "New");
        assert_eq!(manifest.current_version, 2);
    }

    #[test]
    fn test_rejected_append_keeps_old_name() {
        let (_temp_dir, manager) = setup();
        manager
            .create_manifest("uuid-1", PageLocation::Pages, "Old", meta(1))
            .unwrap();

        let result = manager.append_version("uuid-1", PageLocation::Pages, meta(3), Some("New"));
        assert!(result.is_err());

        let manifest = manager.read_manifest("uuid-1", PageLocation::Pages).unwrap();
        assert_eq!(manifest.page_name, "Old");
    }

    #[test]
    fn test_list_pages_skips_dirs_without_manifest() {
        let (temp_dir, manager) = setup();
        manager
            .create_manifest("uuid-b", PageLocation::Pages, "B", meta(1))
            .unwrap();
        manager
            .create_manifest("uuid-a", PageLocation::Pages, "A", meta(1))
            .unwrap();
        fs::create_dir_all(temp_dir.path().join("versions/orphan/v1")).unwrap();

        assert_eq!(
            manager.list_pages(PageLocation::Pages).unwrap(),
            vec!["uuid-a", "uuid-b"]
        );
        assert!(manager
            .list_pages(PageLocation::RequiredPages)
            .unwrap()
            .is_empty());
    }
}
