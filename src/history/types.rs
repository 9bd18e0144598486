//! Request and response values of the history API

use serde::{Deserialize, Serialize};

use crate::delta::{DiffLine, DiffStats};
use crate::store::PageLocation;
use crate::version::{ChangeType, VersionMetadata};

/// Full content of one version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionContent {
    pub page_id: String,
    pub version: u64,
    pub content: String,
    pub metadata: VersionMetadata,
}

/// Line diff between two versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionComparison {
    pub page_id: String,
    pub version1: VersionMetadata,
    pub version2: VersionMetadata,
    pub diff: Vec<DiffLine>,
    pub stats: DiffStats,
}

/// Who restores, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreRequest {
    pub author: String,
    /// Defaults to "Restored from v<N>"
    pub comment: Option<String>,
}

impl RestoreRequest {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Attributes of a runtime save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub author: String,
    pub comment: String,
    /// Applies to versions after the first; v1 is always `created`
    pub change_type: ChangeType,
    /// Location of a new page; existing pages keep theirs
    pub location: PageLocation,
}

impl SaveRequest {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            comment: String::new(),
            change_type: ChangeType::Updated,
            location: PageLocation::Pages,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn in_location(mut self, location: PageLocation) -> Self {
        self.location = location;
        self
    }
}

/// Result of a save or restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub page_id: String,
    pub version: u64,
    /// The save created the page
    pub created: bool,
}

/// Storage accounting for one page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub page_id: String,
    pub total_versions: u64,
    /// Bytes of full content summed over all versions
    pub logical_size: u64,
    /// Bytes actually on disk for payload files
    pub stored_size: u64,
    /// Percentage saved by deltas and compression, 0-100
    pub space_savings: f64,
    pub delta_versions: u64,
    pub compressed_versions: u64,
    pub checkpoint_versions: u64,
    pub oldest_version: Option<String>,
    pub newest_version: Option<String>,
}

/// A page resolved from a UUID or a title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPage {
    pub page_id: String,
    pub location: PageLocation,
}
