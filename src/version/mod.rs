//! Version Record Store
//!
//! One immutable directory per version:
//!
//! ```text
//! versions/<uuid>/v<N>/content.md      full content (or content.md.gz)
//! versions/<uuid>/v<N>/content.diff    line delta   (or content.diff.gz)
//! versions/<uuid>/v<N>/meta.json       VersionMetadata
//! ```
//!
//! Records are never modified after the rename that publishes them.

mod codec;
mod record;
mod store;

pub use codec::{gunzip, gzip, payload_file_name, CodecError};
pub use record::{now_rfc3339, ChangeType, StoredVersion, VersionMetadata, VersionPayload};
pub use store::{VersionStore, META_FILE};
