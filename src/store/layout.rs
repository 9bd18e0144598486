//! On-disk layout
//!
//! ```text
//! <pages_dir>/versions/<uuid>/manifest.json
//! <pages_dir>/versions/<uuid>/v<N>/content.md | content.diff[.gz]
//! <pages_dir>/versions/<uuid>/v<N>/meta.json
//! <required_pages_dir>/versions/<uuid>/...
//! <data_dir>/page-index.json
//! ```
//!
//! Every path the vault touches is derived here.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{VaultError, VaultResult};

/// Directory holding per-page version trees inside a location
pub const VERSIONS_DIR: &str = "versions";

/// Per-page manifest file name
pub const MANIFEST_FILE: &str = "manifest.json";

/// Page index file name
pub const INDEX_FILE: &str = "page-index.json";

/// Storage location class of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PageLocation {
    /// Regular pages
    #[default]
    #[serde(rename = "pages")]
    Pages,
    /// Protected pages shipped with the installation
    #[serde(rename = "required-pages")]
    RequiredPages,
}

impl PageLocation {
    /// Both locations, in discovery order
    pub const ALL: [PageLocation; 2] = [PageLocation::Pages, PageLocation::RequiredPages];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageLocation::Pages => "pages",
            PageLocation::RequiredPages => "required-pages",
        }
    }

    /// Parse the serialized form
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pages" => Some(PageLocation::Pages),
            "required-pages" => Some(PageLocation::RequiredPages),
            _ => None,
        }
    }
}

impl fmt::Display for PageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved directory layout of a vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pages_dir: PathBuf,
    required_pages_dir: PathBuf,
    data_dir: PathBuf,
}

impl StoreLayout {
    pub fn new(
        pages_dir: impl Into<PathBuf>,
        required_pages_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pages_dir: pages_dir.into(),
            required_pages_dir: required_pages_dir.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Layout rooted in one directory: regular pages and the index live at
    /// `<root>`, required pages under `<root>/required-pages`.
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(root, root.join("required-pages"), root)
    }

    /// Legacy page directory of a location
    pub fn location_dir(&self, location: PageLocation) -> &Path {
        match location {
            PageLocation::Pages => &self.pages_dir,
            PageLocation::RequiredPages => &self.required_pages_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// `<location>/versions`
    pub fn versions_root(&self, location: PageLocation) -> PathBuf {
        self.location_dir(location).join(VERSIONS_DIR)
    }

    /// Distinct version roots, deduplicated when both locations share a directory
    pub fn versions_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = Vec::with_capacity(2);
        for location in PageLocation::ALL {
            let root = self.versions_root(location);
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        roots
    }

    /// `<location>/versions/<page_id>`
    pub fn page_dir(&self, page_id: &str, location: PageLocation) -> VaultResult<PathBuf> {
        validate_page_id(page_id)?;
        Ok(self.versions_root(location).join(page_id))
    }

    /// `<location>/versions/<page_id>/manifest.json`
    pub fn manifest_path(&self, page_id: &str, location: PageLocation) -> VaultResult<PathBuf> {
        Ok(self.page_dir(page_id, location)?.join(MANIFEST_FILE))
    }

    /// `<location>/versions/<page_id>/v<version>`
    pub fn version_dir(
        &self,
        page_id: &str,
        location: PageLocation,
        version: u64,
    ) -> VaultResult<PathBuf> {
        Ok(self
            .page_dir(page_id, location)?
            .join(version_dir_name(version)))
    }

    /// `<data_dir>/page-index.json`
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE)
    }

    /// Find the location holding a manifest for `page_id`.
    ///
    /// Regular pages are checked first.
    pub fn locate_page(&self, page_id: &str) -> Option<PageLocation> {
        PageLocation::ALL.into_iter().find(|location| {
            self.manifest_path(page_id, *location)
                .map(|path| path.is_file())
                .unwrap_or(false)
        })
    }
}

/// Directory name of a version: `v<N>`
pub fn version_dir_name(version: u64) -> String {
    format!("v{}", version)
}

/// Page ids become directory names, so anything that could escape the
/// versions root is rejected.
pub fn validate_page_id(page_id: &str) -> VaultResult<()> {
    let invalid = page_id.is_empty()
        || page_id.starts_with('.')
        || page_id.contains(['/', '\\', '\0'])
        || page_id.chars().any(char::is_control);

    if invalid {
        return Err(VaultError::InvalidArgument(format!(
            "invalid page id: {:?}",
            page_id
        )));
    }
    Ok(())
}
