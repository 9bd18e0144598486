//! Version History Provider
//!
//! Query and command surface over versioned pages:
//! - history listing (newest first)
//! - content of any version, reconstructed and hash-verified
//! - line diff between two versions
//! - restore as a new version
//! - the runtime save path shared with restore
//!
//! Writes to one page are serialized by a per-page lock; the manifest
//! append is the commit point. A version directory written without a
//! matching manifest entry is an orphan and is discarded by the next writer.
//!
//! Pages are addressed by UUID or by title.

mod cache;
mod locks;
mod types;

pub use cache::ReconstructionCache;
pub use types::{
    ResolvedPage, RestoreRequest, SaveOutcome, SaveRequest, StorageInfo, VersionComparison,
    VersionContent,
};

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::config::{VaultConfig, VersioningConfig};
use crate::delta::{apply_chain, compare_lines, create_delta, diff_stats, LineDelta};
use crate::errors::{VaultError, VaultResult};
use crate::hash;
use crate::index::{self, PageIndex, RebuildSummary};
use crate::manifest::{ManifestManager, PageManifest};
use crate::observability::{emit, Event, Severity};
use crate::store::{validate_page_id, PageVersioning, StoreLayout};
use crate::version::{ChangeType, VersionMetadata, VersionPayload, VersionStore};

use locks::{acquire, PageLocks};

/// Versioned page storage
#[derive(Debug)]
pub struct VersionHistoryProvider {
    versioning: VersioningConfig,
    layout: StoreLayout,
    records: VersionStore,
    manifests: ManifestManager,
    index: Arc<PageIndex>,
    cache: ReconstructionCache,
    locks: PageLocks,
    /// Serializes saves that allocate a new page id from a title
    creation: Mutex<()>,
}

/// Content and attribution of a version about to be appended
struct PendingVersion<'a> {
    page_name: &'a str,
    content: &'a str,
    author: &'a str,
    comment: &'a str,
    change_type: ChangeType,
}

impl VersionHistoryProvider {
    /// Open the provider, loading the page index from disk.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `config` fails validation.
    pub fn open(config: &VaultConfig) -> VaultResult<Self> {
        let index = PageIndex::open(config.layout().index_path())?;
        Self::with_index(config, Arc::new(index))
    }

    /// Build a provider around an already loaded index.
    pub fn with_index(config: &VaultConfig, index: Arc<PageIndex>) -> VaultResult<Self> {
        config.validate()?;
        let layout = config.layout();
        Ok(Self {
            versioning: config.versioning.clone(),
            records: VersionStore::new(layout.clone()),
            manifests: ManifestManager::new(layout.clone()),
            layout,
            index,
            cache: ReconstructionCache::new(config.versioning.cache_size),
            locks: PageLocks::new(),
            creation: Mutex::new(()),
        })
    }

    pub fn index(&self) -> &Arc<PageIndex> {
        &self.index
    }

    pub fn cache(&self) -> &ReconstructionCache {
        &self.cache
    }

    /// Resolve a UUID or title to a page.
    ///
    /// Order: index UUID, manifest on disk, exact title, case-insensitive title.
    pub fn resolve(&self, identifier: &str) -> VaultResult<ResolvedPage> {
        if let Some(entry) = self.index.get(identifier) {
            return Ok(ResolvedPage {
                page_id: entry.uuid,
                location: entry.location,
            });
        }

        if let Some(location) = self.layout.locate_page(identifier) {
            return Ok(ResolvedPage {
                page_id: identifier.to_string(),
                location,
            });
        }

        if let Some(entry) = self.index.lookup_title(identifier) {
            return Ok(ResolvedPage {
                page_id: entry.uuid,
                location: entry.location,
            });
        }

        Err(VaultError::NotFound(identifier.to_string()))
    }

    /// Version summaries, newest first, optionally truncated to `limit`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the page has no manifest.
    pub fn get_version_history(
        &self,
        identifier: &str,
        limit: Option<usize>,
    ) -> VaultResult<Vec<VersionMetadata>> {
        let (_, manifest) = self.load(identifier)?;

        let newest_first = manifest.versions.into_iter().rev();
        Ok(match limit {
            Some(limit) => newest_first.take(limit).collect(),
            None => newest_first.collect(),
        })
    }

    /// Full content and metadata of one version.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the page is unknown
    /// - `VersionNotFound` if the version is out of range
    /// - `IntegrityMismatch` if the reconstruction fails verification
    pub fn get_version(&self, identifier: &str, version: u64) -> VaultResult<VersionContent> {
        let (page, manifest) = self.load(identifier)?;
        let metadata = manifest.require(version)?.clone();
        let content = self.reconstruct(&page, &manifest, version, true)?;

        Ok(VersionContent {
            page_id: page.page_id,
            version,
            content,
            metadata,
        })
    }

    /// Line diff from `v1` to `v2`. Either order is allowed.
    pub fn compare_versions(
        &self,
        identifier: &str,
        v1: u64,
        v2: u64,
    ) -> VaultResult<VersionComparison> {
        let (page, manifest) = self.load(identifier)?;
        let version1 = manifest.require(v1)?.clone();
        let version2 = manifest.require(v2)?.clone();

        let old = self.reconstruct(&page, &manifest, v1, true)?;
        let new = self.reconstruct(&page, &manifest, v2, true)?;

        let diff = compare_lines(&old, &new);
        let stats = diff_stats(&diff);

        Ok(VersionComparison {
            page_id: page.page_id,
            version1,
            version2,
            diff,
            stats,
        })
    }

    /// Append a new version whose content equals `target`'s.
    ///
    /// The target and every other version stay untouched; the returned
    /// number is always `currentVersion + 1`.
    pub fn restore_version(
        &self,
        identifier: &str,
        target: u64,
        request: &RestoreRequest,
    ) -> VaultResult<u64> {
        let page = self.resolve(identifier)?;
        let handle = self.locks.handle(&page.page_id);
        let _guard = acquire(&handle);

        let manifest = self.manifests.read_manifest(&page.page_id, page.location)?;
        manifest.require(target)?;
        let content = self.reconstruct(&page, &manifest, target, true)?;

        let default_comment = format!("Restored from v{}", target);
        let comment = request.comment.as_deref().unwrap_or(&default_comment);
        let page_name = manifest.page_name.clone();

        let manifest = self.append_locked(
            &page,
            manifest,
            PendingVersion {
                page_name: &page_name,
                content: &content,
                author: &request.author,
                comment,
                change_type: ChangeType::Restored,
            },
        )?;

        let target_str = target.to_string();
        let new_str = manifest.current_version.to_string();
        emit(
            Severity::Info,
            Event::VersionRestored,
            &[
                ("page_id", &page.page_id),
                ("restored_from", &target_str),
                ("version", &new_str),
            ],
        );

        Ok(manifest.current_version)
    }

    /// Save page content as a new version.
    ///
    /// With `page_id == None` the page is found by title, or created with a
    /// fresh UUID. A new page gets v1 and a manifest; an existing page gets
    /// `currentVersion + 1`, stored as a delta or a checkpoint per
    /// configuration. The page index entry is refreshed afterwards.
    pub fn save_version(
        &self,
        page_id: Option<&str>,
        page_name: &str,
        content: &str,
        request: &SaveRequest,
    ) -> VaultResult<SaveOutcome> {
        let _creation = page_id.is_none().then(|| acquire(&self.creation));

        let page_id = match page_id {
            Some(id) => {
                validate_page_id(id)?;
                id.to_string()
            }
            None => match self.index.lookup_title(page_name) {
                Some(entry) => entry.uuid,
                None => Uuid::new_v4().to_string(),
            },
        };

        let handle = self.locks.handle(&page_id);
        let _guard = acquire(&handle);

        // Located under the lock: a concurrent first save may have just
        // created the manifest in the other location.
        let location = self
            .layout
            .locate_page(&page_id)
            .or_else(|| self.index.get(&page_id).map(|entry| entry.location))
            .unwrap_or(request.location);
        let page = ResolvedPage { page_id, location };

        let pending = PendingVersion {
            page_name,
            content,
            author: &request.author,
            comment: &request.comment,
            change_type: request.change_type,
        };

        let (manifest, created) = if self.manifests.exists(&page.page_id, page.location) {
            let manifest = self.manifests.read_manifest(&page.page_id, page.location)?;
            (self.append_locked(&page, manifest, pending)?, false)
        } else {
            (self.create_locked(&page, pending)?, true)
        };

        Ok(SaveOutcome {
            page_id: page.page_id,
            version: manifest.current_version,
            created,
        })
    }

    /// Storage accounting for a page.
    pub fn storage_info(&self, identifier: &str) -> VaultResult<StorageInfo> {
        let (page, manifest) = self.load(identifier)?;

        let mut info = StorageInfo {
            page_id: page.page_id.clone(),
            total_versions: manifest.versions.len() as u64,
            logical_size: 0,
            stored_size: 0,
            space_savings: 0.0,
            delta_versions: 0,
            compressed_versions: 0,
            checkpoint_versions: 0,
            oldest_version: manifest.versions.first().map(|m| m.date_created.clone()),
            newest_version: manifest.versions.last().map(|m| m.date_created.clone()),
        };

        for meta in &manifest.versions {
            info.logical_size += meta.content_size;
            info.stored_size += match meta.stored_size {
                Some(size) => size,
                None => self.measure_payload(&page, meta.version)?,
            };
            if meta.is_delta {
                info.delta_versions += 1;
            }
            if meta.compressed {
                info.compressed_versions += 1;
            }
            if meta.is_checkpoint {
                info.checkpoint_versions += 1;
            }
        }

        if info.logical_size > 0 && info.stored_size < info.logical_size {
            let saved = (info.logical_size - info.stored_size) as f64;
            let percent = saved / info.logical_size as f64 * 100.0;
            info.space_savings = (percent * 100.0).round() / 100.0;
        }

        Ok(info)
    }

    /// Reconstruct and hash-check every version of a page, bypassing the cache.
    ///
    /// Returns the number of versions verified.
    pub fn verify_page(&self, identifier: &str) -> VaultResult<u64> {
        let (page, manifest) = self.load(identifier)?;
        manifest.check_sequence().map_err(|reason| VaultError::Corrupt {
            path: page.page_id.clone(),
            reason,
        })?;

        for meta in &manifest.versions {
            self.reconstruct(&page, &manifest, meta.version, false)?;
        }
        Ok(manifest.versions.len() as u64)
    }

    /// Rebuild the page index from the manifests on disk.
    pub fn rebuild_index(&self) -> VaultResult<RebuildSummary> {
        index::rebuild_from_manifests(&self.index, &self.manifests)
    }

    fn load(&self, identifier: &str) -> VaultResult<(ResolvedPage, PageManifest)> {
        let page = self.resolve(identifier)?;
        let manifest = self.manifests.read_manifest(&page.page_id, page.location)?;
        Ok((page, manifest))
    }

    /// Write v1 and the manifest of a new page. Caller holds the page lock.
    fn create_locked(
        &self,
        page: &ResolvedPage,
        pending: PendingVersion<'_>,
    ) -> VaultResult<PageManifest> {
        self.discard_orphan(page, 1)?;

        let metadata = VersionMetadata::for_content(
            1,
            pending.content,
            pending.author,
            ChangeType::Created,
            pending.comment,
        )
        .compressed(self.versioning.compress());

        let payload = VersionPayload::Full(pending.content.to_string());
        let metadata =
            self.records
                .write_version(&page.page_id, page.location, &payload, metadata)?;

        let manifest = match self.manifests.create_manifest(
            &page.page_id,
            page.location,
            pending.page_name,
            metadata,
        ) {
            Ok(manifest) => manifest,
            Err(e) => {
                let _ = self
                    .records
                    .discard_uncommitted(&page.page_id, page.location, 1);
                return Err(e);
            }
        };

        self.after_commit(page, &manifest, pending.content);
        Ok(manifest)
    }

    /// Append the next version of an existing page. Caller holds the page lock.
    fn append_locked(
        &self,
        page: &ResolvedPage,
        manifest: PageManifest,
        pending: PendingVersion<'_>,
    ) -> VaultResult<PageManifest> {
        let current = manifest.current_version;
        let next = current + 1;
        self.discard_orphan(page, next)?;

        let metadata = VersionMetadata::for_content(
            next,
            pending.content,
            pending.author,
            pending.change_type,
            pending.comment,
        )
        .compressed(self.versioning.compress());

        let (payload, metadata) = if self.versioning.is_full_snapshot(next) {
            let metadata = if self.versioning.delta_storage {
                metadata.as_checkpoint()
            } else {
                metadata
            };
            (VersionPayload::Full(pending.content.to_string()), metadata)
        } else {
            let previous = self.reconstruct(page, &manifest, current, true)?;
            let delta = create_delta(current, &previous, pending.content);
            (VersionPayload::Delta(delta), metadata.as_delta(current))
        };

        let metadata =
            self.records
                .write_version(&page.page_id, page.location, &payload, metadata)?;
        let checkpoint = metadata.is_checkpoint;

        let renamed = (manifest.page_name != pending.page_name).then_some(pending.page_name);
        let manifest = match self
            .manifests
            .append_version(&page.page_id, page.location, metadata, renamed)
        {
            Ok(manifest) => manifest,
            Err(e) => {
                let _ = self
                    .records
                    .discard_uncommitted(&page.page_id, page.location, next);
                return Err(e);
            }
        };

        if checkpoint {
            let next_str = next.to_string();
            emit(
                Severity::Trace,
                Event::CheckpointWritten,
                &[("page_id", &page.page_id), ("version", &next_str)],
            );
        }

        self.after_commit(page, &manifest, pending.content);
        Ok(manifest)
    }

    /// Cache the new content and refresh the index entry.
    ///
    /// The manifest is already committed here, so an index failure is
    /// logged rather than returned; `rebuild_index` repairs it.
    fn after_commit(&self, page: &ResolvedPage, manifest: &PageManifest, content: &str) {
        self.cache
            .insert(&page.page_id, manifest.current_version, content);

        let version_str = manifest.current_version.to_string();
        emit(
            Severity::Info,
            Event::VersionWritten,
            &[("page_id", &page.page_id), ("version", &version_str)],
        );

        let entry = index::entry_from_manifest(manifest, page.location);
        if let Err(e) = self.index.upsert(entry) {
            let reason = e.to_string();
            emit(
                Severity::Error,
                Event::IndexEntrySkipped,
                &[("page_id", &page.page_id), ("reason", &reason)],
            );
        }
    }

    /// Remove a version directory the manifest does not list.
    fn discard_orphan(&self, page: &ResolvedPage, version: u64) -> VaultResult<()> {
        if self
            .records
            .version_exists(&page.page_id, page.location, version)?
        {
            let version_str = version.to_string();
            emit(
                Severity::Warn,
                Event::OrphanDiscarded,
                &[("page_id", &page.page_id), ("version", &version_str)],
            );
            self.records
                .discard_uncommitted(&page.page_id, page.location, version)?;
        }
        Ok(())
    }

    /// Rebuild the full content of `target`.
    ///
    /// Walks back through delta bases to the nearest full snapshot (or a
    /// cached version), applies the deltas forward, and verifies the result
    /// against the manifest hash.
    fn reconstruct(
        &self,
        page: &ResolvedPage,
        manifest: &PageManifest,
        target: u64,
        use_cache: bool,
    ) -> VaultResult<String> {
        if use_cache {
            if let Some(content) = self.cache.get(&page.page_id, target) {
                return Ok(content);
            }
        }

        let target_meta = manifest.require(target)?;

        // Delta versions from target down to (excluding) the base
        let mut chain: Vec<&VersionMetadata> = Vec::new();
        let mut base_content: Option<String> = None;
        let mut cursor = target_meta;
        while cursor.is_delta {
            chain.push(cursor);
            let base = match cursor.base_version {
                Some(base) if base < cursor.version => base,
                _ => {
                    return Err(VaultError::Corrupt {
                        path: format!("{}/v{}", page.page_id, cursor.version),
                        reason: "delta version without a valid base".to_string(),
                    })
                }
            };

            if use_cache {
                if let Some(content) = self.cache.get(&page.page_id, base) {
                    base_content = Some(content);
                    break;
                }
            }
            cursor = manifest.require(base)?;
        }

        let base_content = match base_content {
            Some(content) => content,
            None => self.read_full(page, cursor.version)?,
        };

        let mut deltas: Vec<LineDelta> = Vec::with_capacity(chain.len());
        for meta in chain.iter().rev() {
            deltas.push(self.read_delta(page, meta)?);
        }

        let content = apply_chain(&base_content, &deltas).map_err(|e| VaultError::Corrupt {
            path: format!("{}/v{}", page.page_id, target),
            reason: e.to_string(),
        })?;

        let actual = hash::content_hash(content.as_bytes());
        if !actual.eq_ignore_ascii_case(&target_meta.content_hash) {
            let version_str = target.to_string();
            emit(
                Severity::Error,
                Event::IntegrityMismatch,
                &[
                    ("page_id", &page.page_id),
                    ("version", &version_str),
                    ("expected", &target_meta.content_hash),
                    ("actual", &actual),
                ],
            );
            return Err(VaultError::IntegrityMismatch {
                page_id: page.page_id.clone(),
                version: target,
                expected: target_meta.content_hash.clone(),
                actual,
            });
        }

        if use_cache {
            self.cache.insert(&page.page_id, target, &content);
        }
        Ok(content)
    }

    fn read_full(&self, page: &ResolvedPage, version: u64) -> VaultResult<String> {
        match self.read_record(page, version)? {
            VersionPayload::Full(content) => Ok(content),
            VersionPayload::Delta(_) => Err(VaultError::Corrupt {
                path: format!("{}/v{}", page.page_id, version),
                reason: "manifest lists a full version but the record is a delta".to_string(),
            }),
        }
    }

    fn read_delta(&self, page: &ResolvedPage, meta: &VersionMetadata) -> VaultResult<LineDelta> {
        match self.read_record(page, meta.version)? {
            VersionPayload::Delta(delta) if Some(delta.base_version) == meta.base_version => {
                Ok(delta)
            }
            _ => Err(VaultError::Corrupt {
                path: format!("{}/v{}", page.page_id, meta.version),
                reason: "record does not match the manifest delta entry".to_string(),
            }),
        }
    }

    fn read_record(&self, page: &ResolvedPage, version: u64) -> VaultResult<VersionPayload> {
        match self
            .records
            .read_version(&page.page_id, page.location, version)
        {
            Ok(stored) => Ok(stored.payload),
            // Listed in the manifest but gone from disk
            Err(VaultError::NotFound(what)) => Err(VaultError::Corrupt {
                path: what,
                reason: "version record missing".to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    fn measure_payload(&self, page: &ResolvedPage, version: u64) -> VaultResult<u64> {
        match self
            .records
            .payload_path(&page.page_id, page.location, version)?
        {
            Some(path) => std::fs::metadata(&path)
                .map(|m| m.len())
                .map_err(|e| VaultError::io(&path, e)),
            None => Ok(0),
        }
    }
}

impl PageVersioning for VersionHistoryProvider {
    fn version_history(
        &self,
        identifier: &str,
        limit: Option<usize>,
    ) -> VaultResult<Vec<VersionMetadata>> {
        self.get_version_history(identifier, limit)
    }

    fn version(&self, identifier: &str, version: u64) -> VaultResult<VersionContent> {
        self.get_version(identifier, version)
    }

    fn compare(&self, identifier: &str, v1: u64, v2: u64) -> VaultResult<VersionComparison> {
        self.compare_versions(identifier, v1, v2)
    }

    fn restore(&self, identifier: &str, version: u64, request: &RestoreRequest) -> VaultResult<u64> {
        self.restore_version(identifier, version, request)
    }
}
