//! Page index: UUID → page summary
//!
//! Held in memory behind an `RwLock` and persisted to `page-index.json`
//! after every structural change. Saves are serialized by a separate mutex
//! and written atomically, so concurrent writers never interleave bytes and
//! the file on disk is always a complete snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::errors::{VaultError, VaultResult};
use crate::fsutil;
use crate::observability::{emit, Event, Severity};
use crate::store::PageLocation;
use crate::version::now_rfc3339;

/// Format version written to `page-index.json`
pub const INDEX_FORMAT_VERSION: &str = "1.0.0";

/// Summary of one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageIndexEntry {
    pub uuid: String,
    pub title: String,
    pub current_version: u64,
    pub location: PageLocation,
    pub last_modified: String,
    #[serde(alias = "editor", default)]
    pub author: String,
    pub has_versions: bool,
}

/// On-disk form of the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageIndexFile {
    pub version: String,
    pub last_updated: String,
    pub page_count: usize,
    pub pages: BTreeMap<String, PageIndexEntry>,
}

impl Default for PageIndexFile {
    fn default() -> Self {
        Self {
            version: INDEX_FORMAT_VERSION.to_string(),
            last_updated: now_rfc3339(),
            page_count: 0,
            pages: BTreeMap::new(),
        }
    }
}

impl PageIndexFile {
    /// Read and parse an index file.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file does not exist
    /// - `Corrupt` if it does not parse
    pub fn load(path: &Path) -> VaultResult<Self> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(VaultError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(VaultError::io(path, e)),
        };

        serde_json::from_str(&json)
            .map_err(|e| VaultError::corrupt(path, format!("invalid page index: {}", e)))
    }
}

/// Shared, persistent page index
#[derive(Debug)]
pub struct PageIndex {
    path: PathBuf,
    state: RwLock<BTreeMap<String, PageIndexEntry>>,
    save_lock: Mutex<()>,
}

impl PageIndex {
    /// Empty index that will persist to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(BTreeMap::new()),
            save_lock: Mutex::new(()),
        }
    }

    /// Load the index at `path`, starting empty if the file does not exist.
    ///
    /// A file that exists but does not parse is an error, never silently
    /// replaced.
    pub fn open(path: impl Into<PathBuf>) -> VaultResult<Self> {
        let index = Self::new(path);
        match PageIndexFile::load(&index.path) {
            Ok(file) => {
                *index.write_state() = file.pages;
            }
            Err(VaultError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace every entry and persist.
    pub fn rebuild(&self, entries: Vec<PageIndexEntry>) -> VaultResult<()> {
        {
            let mut state = self.write_state();
            state.clear();
            for entry in entries {
                state.insert(entry.uuid.clone(), entry);
            }
        }
        self.save()
    }

    /// Insert or replace one entry and persist.
    pub fn upsert(&self, entry: PageIndexEntry) -> VaultResult<()> {
        self.write_state().insert(entry.uuid.clone(), entry);
        self.save()
    }

    /// Remove one entry and persist. Returns the removed entry.
    pub fn remove(&self, uuid: &str) -> VaultResult<Option<PageIndexEntry>> {
        let removed = self.write_state().remove(uuid);
        if removed.is_some() {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn get(&self, uuid: &str) -> Option<PageIndexEntry> {
        self.read_state().get(uuid).cloned()
    }

    /// Find a page by title: exact match first, then case-insensitive.
    ///
    /// Ties are broken by UUID order.
    pub fn lookup_title(&self, title: &str) -> Option<PageIndexEntry> {
        let state = self.read_state();
        state
            .values()
            .find(|entry| entry.title == title)
            .or_else(|| {
                let wanted = title.to_lowercase();
                state
                    .values()
                    .find(|entry| entry.title.to_lowercase() == wanted)
            })
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.read_state().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().is_empty()
    }

    /// Persist the current state atomically.
    pub fn save(&self) -> VaultResult<()> {
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Snapshot under the save lock so the newest state is what lands last
        let pages = self.read_state().clone();
        let file = PageIndexFile {
            version: INDEX_FORMAT_VERSION.to_string(),
            last_updated: now_rfc3339(),
            page_count: pages.len(),
            pages,
        };

        let json = serde_json::to_string_pretty(&file).map_err(|e| {
            VaultError::corrupt(&self.path, format!("failed to serialize page index: {}", e))
        })?;
        fsutil::write_atomic(&self.path, json.as_bytes())?;

        let count = file.page_count.to_string();
        emit(Severity::Trace, Event::IndexSaved, &[("page_count", &count)]);

        Ok(())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, PageIndexEntry>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, PageIndexEntry>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn entry(uuid: &str, title: &str) -> PageIndexEntry {
        PageIndexEntry {
            uuid: uuid.to_string(),
            title: title.to_string(),
            current_version: 1,
            location: PageLocation::Pages,
            last_modified: "2024-01-01T00:00:00.000Z".to_string(),
            author: "system".to_string(),
            has_versions: true,
        }
    }

    #[test]
    fn test_open_missing_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let index = PageIndex::open(temp_dir.path().join("page-index.json")).unwrap();
        assert!(index.is_empty());
        assert!(!index.path().exists());
    }

    #[test]
    fn test_open_corrupt_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page-index.json");
        fs::write(&path, "{ nope").unwrap();

        assert!(matches!(
            PageIndex::open(&path),
            Err(VaultError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_rebuild_writes_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page-index.json");
        let index = PageIndex::new(&path);

        index
            .rebuild(vec![entry("uuid-1", "Test"), entry("uuid-2", "Other")])
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["version"], "1.0.0");
        assert_eq!(json["pageCount"], 2);
        assert!(json["lastUpdated"].is_string());
        let page = &json["pages"]["uuid-1"];
        assert_eq!(page["uuid"], "uuid-1");
        assert_eq!(page["title"], "Test");
        assert_eq!(page["currentVersion"], 1);
        assert_eq!(page["location"], "pages");
        assert_eq!(page["hasVersions"], true);
    }

    #[test]
    fn test_rebuild_replaces_everything() {
        let temp_dir = TempDir::new().unwrap();
        let index = PageIndex::new(temp_dir.path().join("page-index.json"));
        index.upsert(entry("uuid-old", "Old")).unwrap();

        index.rebuild(vec![entry("uuid-1", "Test")]).unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.get("uuid-old").is_none());
    }

    #[test]
    fn test_upsert_remove_persist() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page-index.json");
        let index = PageIndex::new(&path);

        index.upsert(entry("uuid-1", "Test")).unwrap();
        let mut updated = entry("uuid-1", "Test");
        updated.current_version = 2;
        index.upsert(updated).unwrap();
        index.upsert(entry("uuid-2", "Other")).unwrap();

        let removed = index.remove("uuid-2").unwrap();
        assert_eq!(removed.unwrap().title, "Other");
        assert!(index.remove("uuid-2").unwrap().is_none());

        let reopened = PageIndex::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get("uuid-1").unwrap().current_version, 2);
    }

    #[test]
    fn test_lookup_title_prefers_exact_match() {
        let temp_dir = TempDir::new().unwrap();
        let index = PageIndex::new(temp_dir.path().join("page-index.json"));
        index.upsert(entry("uuid-a", "main page")).unwrap();
        index.upsert(entry("uuid-b", "Main Page")).unwrap();

        assert_eq!(index.lookup_title("Main Page").unwrap().uuid, "uuid-b");
        assert_eq!(index.lookup_title("main page").unwrap().uuid, "uuid-a");
        assert_eq!(index.lookup_title("MAIN PAGE").unwrap().uuid, "uuid-a");
        assert!(index.lookup_title("Missing").is_none());
    }

    #[test]
    fn test_legacy_editor_field_accepted() {
        let json = r#"{
            "uuid": "uuid-1",
            "title": "Test",
            "currentVersion": 3,
            "location": "required-pages",
            "lastModified": "2024-01-01T00:00:00.000Z",
            "editor": "alice",
            "hasVersions": true
        }"#;
        let parsed: PageIndexEntry = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.author, "alice");
        assert_eq!(parsed.location, PageLocation::RequiredPages);
    }

    #[test]
    fn test_concurrent_upserts_all_persist() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page-index.json");
        let index = Arc::new(PageIndex::new(&path));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    index
                        .upsert(entry(&format!("uuid-{}", i), &format!("Page {}", i)))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = PageIndex::open(&path).unwrap();
        assert_eq!(reopened.len(), 8);

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| fsutil::is_temp_name(name))
            .collect();
        assert!(leftovers.is_empty());
    }
}
