//! Payload encoding: gzip on top of the raw bytes when compression is on.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

use crate::delta::LineDelta;

use super::record::VersionPayload;

/// File name of a full-content payload
pub const CONTENT_FILE: &str = "content.md";
/// File name of a delta payload
pub const DELTA_FILE: &str = "content.diff";
/// Suffix appended to compressed payloads
pub const GZIP_SUFFIX: &str = ".gz";

/// Payload file names a version directory may hold, with their
/// (is_delta, compressed) flags
pub const PAYLOAD_FILES: [(&str, bool, bool); 4] = [
    ("content.md", false, false),
    ("content.md.gz", false, true),
    ("content.diff", true, false),
    ("content.diff.gz", true, true),
];

/// File name for a payload kind
pub fn payload_file_name(is_delta: bool, compressed: bool) -> String {
    let base = if is_delta { DELTA_FILE } else { CONTENT_FILE };
    if compressed {
        format!("{}{}", base, GZIP_SUFFIX)
    } else {
        base.to_string()
    }
}

/// Errors surfaced while decoding a payload file
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("gzip decode failed: {0}")]
    Gzip(#[source] std::io::Error),

    #[error("content is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("delta is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Gzip-compress bytes
pub fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompress gzip bytes
pub fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Serialize a payload into the bytes written to disk.
pub fn encode_payload(payload: &VersionPayload, compressed: bool) -> std::io::Result<Vec<u8>> {
    let raw = match payload {
        VersionPayload::Full(content) => content.as_bytes().to_vec(),
        VersionPayload::Delta(delta) => serde_json::to_vec(delta)?,
    };

    if compressed {
        gzip(&raw)
    } else {
        Ok(raw)
    }
}

/// Parse payload bytes read from disk.
pub fn decode_payload(
    bytes: Vec<u8>,
    is_delta: bool,
    compressed: bool,
) -> Result<VersionPayload, CodecError> {
    let raw = if compressed {
        gunzip(&bytes).map_err(CodecError::Gzip)?
    } else {
        bytes
    };

    if is_delta {
        let delta: LineDelta = serde_json::from_slice(&raw).map_err(CodecError::Json)?;
        Ok(VersionPayload::Delta(delta))
    } else {
        let content = String::from_utf8(raw).map_err(CodecError::Utf8)?;
        Ok(VersionPayload::Full(content))
    }
}
