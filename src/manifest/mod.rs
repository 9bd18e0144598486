//! Page manifests
//!
//! `manifest.json` is the authoritative per-page descriptor and the commit
//! point of every write: a version directory that no manifest lists does
//! not exist as far as readers are concerned.
//!
//! Format:
//! ```json
//! {
//!   "pageId": "550e8400-e29b-41d4-a716-446655440000",
//!   "pageName": "Main",
//!   "currentVersion": 2,
//!   "versions": [
//!     { "version": 1, "dateCreated": "...", "author": "system", "changeType": "created", ... },
//!     { "version": 2, "dateCreated": "...", "author": "alice", "changeType": "updated", ... }
//!   ]
//! }
//! ```

mod manager;

pub use manager::ManifestManager;

use serde::{Deserialize, Serialize};

use crate::errors::{VaultError, VaultResult};
use crate::version::VersionMetadata;

/// Per-page version manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageManifest {
    pub page_id: String,

    pub page_name: String,

    /// Highest version number present
    pub current_version: u64,

    /// Version summaries in ascending order
    pub versions: Vec<VersionMetadata>,
}

impl PageManifest {
    /// Creates a manifest holding its first version.
    pub fn new(
        page_id: impl Into<String>,
        page_name: impl Into<String>,
        first: VersionMetadata,
    ) -> Self {
        Self {
            page_id: page_id.into(),
            page_name: page_name.into(),
            current_version: first.version,
            versions: vec![first],
        }
    }

    /// Serializes the manifest to pretty-printed JSON.
    pub fn to_json(&self) -> VaultResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            VaultError::Corrupt {
                path: self.page_id.clone(),
                reason: format!("failed to serialize manifest: {}", e),
            }
        })
    }

    /// Deserializes a manifest from JSON.
    ///
    /// `origin` names the source in the error message.
    pub fn from_json(json: &str, origin: &str) -> VaultResult<Self> {
        serde_json::from_str(json).map_err(|e| VaultError::Corrupt {
            path: origin.to_string(),
            reason: format!("failed to parse manifest: {}", e),
        })
    }

    /// Metadata of one version
    pub fn get(&self, version: u64) -> Option<&VersionMetadata> {
        // Versions are contiguous from 1, so the position is known
        let idx = usize::try_from(version.checked_sub(1)?).ok()?;
        self.versions
            .get(idx)
            .filter(|meta| meta.version == version)
            .or_else(|| self.versions.iter().find(|meta| meta.version == version))
    }

    /// Metadata of the current version
    pub fn latest(&self) -> Option<&VersionMetadata> {
        self.get(self.current_version)
    }

    /// Look up a version or fail with `VersionNotFound`
    pub fn require(&self, version: u64) -> VaultResult<&VersionMetadata> {
        self.get(version).ok_or_else(|| VaultError::VersionNotFound {
            page_id: self.page_id.clone(),
            version,
            current: self.current_version,
        })
    }

    /// Check that versions run `1, 2, ..., currentVersion` with no gaps.
    ///
    /// Returns a description of the first violation.
    pub fn check_sequence(&self) -> Result<(), String> {
        if self.versions.is_empty() {
            return Err("manifest lists no versions".to_string());
        }

        for (idx, meta) in self.versions.iter().enumerate() {
            let expected = idx as u64 + 1;
            if meta.version != expected {
                return Err(format!(
                    "version sequence broken at position {}: expected v{}, found v{}",
                    idx + 1,
                    expected,
                    meta.version
                ));
            }
        }

        let highest = self.versions.len() as u64;
        if self.current_version != highest {
            return Err(format!(
                "currentVersion {} does not match highest version {}",
                self.current_version, highest
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::ChangeType;

    fn meta(version: u64) -> VersionMetadata {
        VersionMetadata::for_content(version, "x", "system", ChangeType::Created, "")
    }

    #[test]
    fn test_manifest_json_shape() {
        let manifest = PageManifest::new("uuid-1", "Test", meta(1));
        let json: serde_json::Value =
            serde_json::from_str(&manifest.to_json().unwrap()).unwrap();

        assert_eq!(json["pageId"], "uuid-1");
        assert_eq!(json["pageName"], "Test");
        assert_eq!(json["currentVersion"], 1);
        assert_eq!(json["versions"].as_array().unwrap().len(), 1);
        assert_eq!(json["versions"][0]["version"], 1);
    }

    #[test]
    fn test_manifest_parses_back() {
        let manifest = PageManifest::new("uuid-1", "Test", meta(1));
        let parsed = PageManifest::from_json(&manifest.to_json().unwrap(), "test").unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_from_json_invalid() {
        let result = PageManifest::from_json("not json", "versions/uuid-1/manifest.json");
        match result {
            Err(VaultError::Corrupt { path, .. }) => {
                assert_eq!(path, "versions/uuid-1/manifest.json")
            }
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_get_and_require() {
        let mut manifest = PageManifest::new("uuid-1", "Test", meta(1));
        manifest.versions.push(meta(2));
        manifest.current_version = 2;

        assert_eq!(manifest.get(2).unwrap().version, 2);
        assert_eq!(manifest.latest().unwrap().version, 2);
        assert!(manifest.get(0).is_none());
        assert!(manifest.get(3).is_none());

        match manifest.require(7) {
            Err(VaultError::VersionNotFound {
                version, current, ..
            }) => {
                assert_eq!(version, 7);
                assert_eq!(current, 2);
            }
            other => panic!("expected VersionNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_check_sequence() {
        let mut manifest = PageManifest::new("uuid-1", "Test", meta(1));
        assert!(manifest.check_sequence().is_ok());

        manifest.versions.push(meta(3));
        manifest.current_version = 3;
        assert!(manifest.check_sequence().is_err());

        manifest.versions[1] = meta(2);
        assert!(manifest.check_sequence().is_err()); // current still 3

        manifest.current_version = 2;
        assert!(manifest.check_sequence().is_ok());

        manifest.versions.clear();
        assert!(manifest.check_sequence().is_err());
    }
}
