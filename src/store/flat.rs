//! Flat-file page store
//!
//! The pre-versioning layout: one `<name>.md` file per page directly inside
//! each location directory. This store can only enumerate and read pages;
//! it has no history.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{VaultError, VaultResult};
use crate::history::{RestoreRequest, VersionComparison, VersionContent};
use crate::version::VersionMetadata;

use super::frontmatter;
use super::layout::{PageLocation, StoreLayout};
use super::{LegacyDiscovery, LegacyPage, LegacyPageSource, PageVersioning, SkipKind, SkippedFile};

/// Extension of legacy page files
pub const PAGE_EXTENSION: &str = "md";

/// Legacy one-file-per-page store
#[derive(Debug, Clone)]
pub struct FlatFileStore {
    layout: StoreLayout,
}

impl FlatFileStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Page files of one location, sorted by file name.
    pub fn list_page_files(&self, location: PageLocation) -> VaultResult<Vec<PathBuf>> {
        let dir = self.layout.location_dir(location);
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(VaultError::io(dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| VaultError::io(dir, e))?;
            let path = entry.path();
            let is_page = path.extension().and_then(|ext| ext.to_str()) == Some(PAGE_EXTENSION);
            if is_page && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read and parse one page file.
    pub fn read_page(&self, path: &Path, location: PageLocation) -> Result<LegacyPage, SkippedFile> {
        let skipped = |kind, reason: String| SkippedFile {
            path: path.to_path_buf(),
            location,
            kind,
            reason,
        };

        let raw = fs::read_to_string(path)
            .map_err(|e| skipped(SkipKind::Unreadable, format!("failed to read file: {}", e)))?;

        let (fields, body) = frontmatter::parse(&raw).map_err(|e| {
            skipped(SkipKind::Unreadable, format!("invalid frontmatter: {}", e))
        })?;

        let Some(uuid) = fields.uuid else {
            return Err(skipped(SkipKind::MissingMetadata, "missing uuid".to_string()));
        };
        let Some(title) = fields.title else {
            return Err(skipped(SkipKind::MissingMetadata, "missing title".to_string()));
        };

        Ok(LegacyPage {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            uuid,
            title,
            author: fields.author,
            last_modified: fields.last_modified,
            content: body.to_string(),
            location,
        })
    }
}

impl LegacyPageSource for FlatFileStore {
    fn discover(&self) -> VaultResult<LegacyDiscovery> {
        let mut discovery = LegacyDiscovery::default();
        let mut scanned: Vec<&Path> = Vec::with_capacity(2);

        for location in PageLocation::ALL {
            let dir = self.layout.location_dir(location);
            if scanned.contains(&dir) {
                continue;
            }
            scanned.push(dir);

            for path in self.list_page_files(location)? {
                match self.read_page(&path, location) {
                    Ok(page) => discovery.pages.push(page),
                    Err(skipped) => discovery.skipped.push(skipped),
                }
            }
        }

        Ok(discovery)
    }
}

impl PageVersioning for FlatFileStore {
    fn version_history(&self, _: &str, _: Option<usize>) -> VaultResult<Vec<VersionMetadata>> {
        Err(unsupported())
    }

    fn version(&self, _: &str, _: u64) -> VaultResult<VersionContent> {
        Err(unsupported())
    }

    fn compare(&self, _: &str, _: u64, _: u64) -> VaultResult<VersionComparison> {
        Err(unsupported())
    }

    fn restore(&self, _: &str, _: u64, _: &RestoreRequest) -> VaultResult<u64> {
        Err(unsupported())
    }
}

fn unsupported() -> VaultError {
    VaultError::Unsupported("flat-file store keeps no version history".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_page(dir: &Path, name: &str, text: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn test_discover_sorted_md_files_in_both_locations() {
        let temp_dir = TempDir::new().unwrap();
        let layout = StoreLayout::rooted(temp_dir.path());
        let root = temp_dir.path();

        write_page(root, "b.md", "---\nuuid: uuid-b\ntitle: B\n---\nbee");
        write_page(root, "a.md", "---\nuuid: uuid-a\ntitle: A\n---\nay");
        write_page(root, "notes.txt", "---\nuuid: x\ntitle: X\n---\n");
        write_page(
            &root.join("required-pages"),
            "sys.md",
            "---\nuuid: uuid-sys\ntitle: System\nauthor: admin\n---\nsys",
        );

        let discovery = FlatFileStore::new(layout).discover().unwrap();

        let uuids: Vec<&str> = discovery.pages.iter().map(|p| p.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["uuid-a", "uuid-b", "uuid-sys"]);
        assert_eq!(discovery.pages[2].location, PageLocation::RequiredPages);
        assert_eq!(discovery.pages[2].author.as_deref(), Some("admin"));
        assert_eq!(discovery.pages[0].content, "ay");
        assert_eq!(discovery.pages[0].file_name, "a.md");
        assert!(discovery.skipped.is_empty());
    }

    #[test]
    fn test_pages_without_metadata_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_page(root, "no-uuid.md", "---\ntitle: Orphan\n---\nbody");
        write_page(root, "no-header.md", "plain body");
        write_page(root, "bad-yaml.md", "---\nuuid: [oops\n---\nbody");

        let discovery = FlatFileStore::new(StoreLayout::rooted(root))
            .discover()
            .unwrap();

        assert!(discovery.pages.is_empty());
        assert_eq!(discovery.skipped.len(), 3);

        let kinds: Vec<SkipKind> = discovery.skipped.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SkipKind::Unreadable,
                SkipKind::MissingMetadata,
                SkipKind::MissingMetadata
            ]
        );
    }

    #[test]
    fn test_missing_directories_discover_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let layout = StoreLayout::rooted(temp_dir.path().join("absent"));

        let discovery = FlatFileStore::new(layout).discover().unwrap();
        assert!(discovery.pages.is_empty());
        assert!(discovery.skipped.is_empty());
    }

    #[test]
    fn test_versioning_is_unsupported() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(StoreLayout::rooted(temp_dir.path()));

        let err = store.version_history("uuid-1", None).unwrap_err();
        assert!(err.is_unsupported());
        assert!(!err.is_not_found());
        assert!(store
            .restore("uuid-1", 1, &RestoreRequest::new("a"))
            .unwrap_err()
            .is_unsupported());
    }
}
