//! Page storage backends and the capabilities they expose
//!
//! Collaborators depend on traits, never on a concrete backend:
//! - [`LegacyPageSource`] enumerates pages of the pre-versioning store and
//!   feeds migration.
//! - [`PageVersioning`] serves history, diff and restore. A backend without
//!   history answers every call with `Unsupported`, which callers render
//!   differently from a missing page.

mod flat;
mod frontmatter;
mod layout;

pub use flat::{FlatFileStore, PAGE_EXTENSION};
pub use frontmatter::Frontmatter;
pub use layout::{
    validate_page_id, version_dir_name, PageLocation, StoreLayout, INDEX_FILE, MANIFEST_FILE,
    VERSIONS_DIR,
};

use std::path::PathBuf;

use serde::Serialize;

use crate::errors::VaultResult;
use crate::history::{RestoreRequest, VersionComparison, VersionContent};
use crate::version::VersionMetadata;

/// A page read from the legacy store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyPage {
    /// Source file
    pub path: PathBuf,
    pub file_name: String,
    pub uuid: String,
    pub title: String,
    pub author: Option<String>,
    pub last_modified: Option<String>,
    /// Body without frontmatter
    pub content: String,
    pub location: PageLocation,
}

/// Why a legacy file was left out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipKind {
    /// No uuid or title in the header; reported as a warning
    MissingMetadata,
    /// Could not be read or parsed; reported as an error
    Unreadable,
}

/// A legacy file that discovery did not turn into a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub location: PageLocation,
    pub kind: SkipKind,
    pub reason: String,
}

/// Result of scanning a legacy store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyDiscovery {
    pub pages: Vec<LegacyPage>,
    pub skipped: Vec<SkippedFile>,
}

/// Source of pages for migration
pub trait LegacyPageSource: Sync {
    /// Enumerate every page in deterministic order.
    ///
    /// A single bad file lands in `skipped`; only a failure to scan a
    /// directory is an error.
    fn discover(&self) -> VaultResult<LegacyDiscovery>;
}

/// Version history capability
pub trait PageVersioning {
    /// Version summaries, newest first
    fn version_history(
        &self,
        identifier: &str,
        limit: Option<usize>,
    ) -> VaultResult<Vec<VersionMetadata>>;

    fn version(&self, identifier: &str, version: u64) -> VaultResult<VersionContent>;

    fn compare(&self, identifier: &str, v1: u64, v2: u64) -> VaultResult<VersionComparison>;

    /// Restore `version` as a new version; returns the new version number
    fn restore(&self, identifier: &str, version: u64, request: &RestoreRequest)
        -> VaultResult<u64>;
}
