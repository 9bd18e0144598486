//! Version metadata and payloads
//!
//! The same [`VersionMetadata`] shape is written to `meta.json` inside the
//! version directory and appended to the page manifest.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::delta::LineDelta;
use crate::hash;

/// Why a version was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Created,
    Updated,
    Restored,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Created => "created",
            ChangeType::Updated => "updated",
            ChangeType::Restored => "restored",
        }
    }
}

/// Metadata of one immutable version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMetadata {
    /// Version number, starting at 1
    pub version: u64,

    /// RFC 3339 creation timestamp
    pub date_created: String,

    pub author: String,

    pub change_type: ChangeType,

    #[serde(default)]
    pub comment: String,

    /// SHA-256 of the full logical content
    pub content_hash: String,

    /// Byte length of the full logical content
    pub content_size: u64,

    /// Payload is gzip-compressed on disk
    #[serde(default)]
    pub compressed: bool,

    /// Payload is a delta against `base_version`
    #[serde(default)]
    pub is_delta: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<u64>,

    /// Full snapshot written on the checkpoint interval
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_checkpoint: bool,

    /// Bytes the payload occupies on disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_size: Option<u64>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl VersionMetadata {
    /// Metadata for a full-content version, stamped now.
    ///
    /// Hash and size are computed from `content`.
    pub fn for_content(
        version: u64,
        content: &str,
        author: impl Into<String>,
        change_type: ChangeType,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            version,
            date_created: now_rfc3339(),
            author: author.into(),
            change_type,
            comment: comment.into(),
            content_hash: hash::content_hash(content.as_bytes()),
            content_size: content.len() as u64,
            compressed: false,
            is_delta: false,
            base_version: None,
            is_checkpoint: false,
            stored_size: None,
        }
    }

    /// Override the creation timestamp
    pub fn with_date_created(mut self, date_created: impl Into<String>) -> Self {
        self.date_created = date_created.into();
        self
    }

    /// Mark the version as a delta against `base_version`
    pub fn as_delta(mut self, base_version: u64) -> Self {
        self.is_delta = true;
        self.base_version = Some(base_version);
        self.is_checkpoint = false;
        self
    }

    /// Mark the version as a full checkpoint
    pub fn as_checkpoint(mut self) -> Self {
        self.is_delta = false;
        self.base_version = None;
        self.is_checkpoint = true;
        self
    }

    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }
}

/// Stored form of a version's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionPayload {
    /// Full content, written as `content.md`
    Full(String),
    /// Line delta, written as `content.diff`
    Delta(LineDelta),
}

impl VersionPayload {
    pub fn is_delta(&self) -> bool {
        matches!(self, VersionPayload::Delta(_))
    }
}

/// A version read back from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVersion {
    pub payload: VersionPayload,
    pub metadata: VersionMetadata,
}

/// Current UTC time in RFC 3339 with millisecond precision
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VersionMetadata {
        VersionMetadata::for_content(1, "Hello", "system", ChangeType::Created, "Initial version")
            .with_date_created("2024-01-01T00:00:00.000Z")
    }

    #[test]
    fn test_metadata_json_field_names() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(json["version"], 1);
        assert_eq!(json["dateCreated"], "2024-01-01T00:00:00.000Z");
        assert_eq!(json["changeType"], "created");
        assert_eq!(
            json["contentHash"],
            "185f8db32271fe25f561a6fc938b2e264306ec304eda518007d1764826381969"
        );
        assert_eq!(json["contentSize"], 5);
        assert_eq!(json["isDelta"], false);
        assert_eq!(json["compressed"], false);
        // Optional fields stay out of full versions
        assert!(json.get("baseVersion").is_none());
        assert!(json.get("isCheckpoint").is_none());
        assert!(json.get("storedSize").is_none());
    }

    #[test]
    fn test_delta_metadata_fields() {
        let meta = VersionMetadata::for_content(
            2,
            "Hello\nWorld",
            "alice",
            ChangeType::Updated,
            "",
        )
        .as_delta(1);

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["isDelta"], true);
        assert_eq!(json["baseVersion"], 1);
        assert_eq!(json["contentSize"], 11);
    }

    #[test]
    fn test_metadata_parses_minimal_legacy_entry() {
        // Entries written without the optional encoding fields
        let json = r#"{
            "version": 1,
            "dateCreated": "2023-05-01T10:00:00.000Z",
            "author": "system",
            "changeType": "created",
            "contentHash": "abc",
            "contentSize": 3
        }"#;

        let meta: VersionMetadata = serde_json::from_str(json).unwrap();
        assert!(!meta.is_delta);
        assert!(!meta.compressed);
        assert_eq!(meta.comment, "");
        assert_eq!(meta.base_version, None);
    }

    #[test]
    fn test_change_type_strings() {
        assert_eq!(ChangeType::Restored.as_str(), "restored");
        let parsed: ChangeType = serde_json::from_str("\"updated\"").unwrap();
        assert_eq!(parsed, ChangeType::Updated);
    }

    #[test]
    fn test_checkpoint_clears_delta() {
        let meta = sample().as_delta(1).as_checkpoint();
        assert!(meta.is_checkpoint);
        assert!(!meta.is_delta);
        assert_eq!(meta.base_version, None);
    }
}
