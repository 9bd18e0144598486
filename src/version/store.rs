//! Version record store
//!
//! A version is a directory `v<N>` holding one payload file and `meta.json`.
//! The directory is assembled under a temp name and published with a single
//! rename, so readers see either the complete record or nothing.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{VaultError, VaultResult};
use crate::fsutil;
use crate::observability::{emit, Event, Severity};
use crate::store::{PageLocation, StoreLayout};

use super::codec::{self, PAYLOAD_FILES};
use super::record::{StoredVersion, VersionMetadata, VersionPayload};

/// Per-version metadata sidecar
pub const META_FILE: &str = "meta.json";

/// Reads and writes individual version directories.
#[derive(Debug, Clone)]
pub struct VersionStore {
    layout: StoreLayout,
}

impl VersionStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Write a version record.
    ///
    /// Encoding follows the metadata: `compressed` selects gzip, and the
    /// payload kind must agree with `is_delta`. Returns the metadata as
    /// written, with `stored_size` filled in.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if `v<N>` is already present
    /// - `InvalidArgument` for version 0 or a payload/metadata mismatch
    /// - `Io` on disk failure; no partial directory is left behind
    pub fn write_version(
        &self,
        page_id: &str,
        location: PageLocation,
        payload: &VersionPayload,
        metadata: VersionMetadata,
    ) -> VaultResult<VersionMetadata> {
        let version = metadata.version;
        if version == 0 {
            return Err(VaultError::InvalidArgument(
                "version numbers start at 1".to_string(),
            ));
        }
        if payload.is_delta() != metadata.is_delta {
            return Err(VaultError::InvalidArgument(format!(
                "payload kind does not match metadata for {} v{}",
                page_id, version
            )));
        }

        let target = self.layout.version_dir(page_id, location, version)?;
        if target.exists() {
            return Err(VaultError::AlreadyExists(target.display().to_string()));
        }

        let page_dir = self.layout.page_dir(page_id, location)?;
        fsutil::ensure_dir(&page_dir)?;

        let bytes = codec::encode_payload(payload, metadata.compressed)
            .map_err(|e| VaultError::io(&target, e))?;

        let mut metadata = metadata;
        metadata.stored_size = Some(bytes.len() as u64);

        let meta_json = serde_json::to_vec_pretty(&metadata).map_err(|e| {
            VaultError::corrupt(&target, format!("failed to serialize metadata: {}", e))
        })?;

        let staging = fsutil::temp_path_for(&target);
        fs::create_dir(&staging).map_err(|e| VaultError::io(&staging, e))?;

        let payload_name = codec::payload_file_name(metadata.is_delta, metadata.compressed);
        let staged = fsutil::write_file_synced(&staging.join(&payload_name), &bytes)
            .and_then(|_| fsutil::write_file_synced(&staging.join(META_FILE), &meta_json));
        if let Err(e) = staged {
            fsutil::remove_dir_quietly(&staging);
            return Err(e);
        }

        fsutil::commit_dir(&staging, &target)?;

        let version_str = version.to_string();
        let stored_str = bytes.len().to_string();
        emit(
            Severity::Trace,
            Event::VersionWritten,
            &[
                ("page_id", page_id),
                ("version", &version_str),
                ("payload", &payload_name),
                ("stored_bytes", &stored_str),
            ],
        );

        Ok(metadata)
    }

    /// Read a version record.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the version directory or its payload file is absent
    /// - `Corrupt` if the payload or `meta.json` cannot be parsed, or the
    ///   sidecar disagrees with the payload file
    pub fn read_version(
        &self,
        page_id: &str,
        location: PageLocation,
        version: u64,
    ) -> VaultResult<StoredVersion> {
        let dir = self.existing_version_dir(page_id, location, version)?;
        let (payload_path, is_delta, compressed) = find_payload(&dir)
            .ok_or_else(|| VaultError::NotFound(format!("{} v{} content", page_id, version)))?;

        let metadata = read_metadata_file(&dir.join(META_FILE))?;
        if metadata.is_delta != is_delta || metadata.compressed != compressed {
            return Err(VaultError::corrupt(
                &payload_path,
                "payload file does not match meta.json encoding flags",
            ));
        }

        let bytes = fs::read(&payload_path).map_err(|e| VaultError::io(&payload_path, e))?;
        let payload = codec::decode_payload(bytes, is_delta, compressed)
            .map_err(|e| VaultError::corrupt(&payload_path, e.to_string()))?;

        Ok(StoredVersion { payload, metadata })
    }

    /// Read only the `meta.json` sidecar of a version.
    pub fn read_metadata(
        &self,
        page_id: &str,
        location: PageLocation,
        version: u64,
    ) -> VaultResult<VersionMetadata> {
        let dir = self.existing_version_dir(page_id, location, version)?;
        read_metadata_file(&dir.join(META_FILE))
    }

    /// Path of the payload file of a version, if any.
    pub fn payload_path(
        &self,
        page_id: &str,
        location: PageLocation,
        version: u64,
    ) -> VaultResult<Option<PathBuf>> {
        let dir = self.layout.version_dir(page_id, location, version)?;
        Ok(find_payload(&dir).map(|(path, _, _)| path))
    }

    pub fn version_exists(
        &self,
        page_id: &str,
        location: PageLocation,
        version: u64,
    ) -> VaultResult<bool> {
        Ok(self.layout.version_dir(page_id, location, version)?.is_dir())
    }

    /// Remove a version directory that no manifest references.
    ///
    /// Only used to discard a record whose manifest append never happened.
    pub fn discard_uncommitted(
        &self,
        page_id: &str,
        location: PageLocation,
        version: u64,
    ) -> VaultResult<()> {
        let dir = self.layout.version_dir(page_id, location, version)?;
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| VaultError::io(&dir, e))?;
        }
        Ok(())
    }

    fn existing_version_dir(
        &self,
        page_id: &str,
        location: PageLocation,
        version: u64,
    ) -> VaultResult<PathBuf> {
        let dir = self.layout.version_dir(page_id, location, version)?;
        if !dir.is_dir() {
            return Err(VaultError::NotFound(format!("{} v{}", page_id, version)));
        }
        Ok(dir)
    }
}

/// Locate the payload file inside a version directory
fn find_payload(dir: &Path) -> Option<(PathBuf, bool, bool)> {
    PAYLOAD_FILES.iter().find_map(|(name, is_delta, compressed)| {
        let path = dir.join(name);
        path.is_file().then_some((path, *is_delta, *compressed))
    })
}

fn read_metadata_file(path: &Path) -> VaultResult<VersionMetadata> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VaultError::corrupt(path, "meta.json is missing"));
        }
        Err(e) => return Err(VaultError::io(path, e)),
    };

    serde_json::from_str(&json)
        .map_err(|e| VaultError::corrupt(path, format!("invalid meta.json: {}", e)))
}
