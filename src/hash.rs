//! Content hashing
//!
//! SHA-256 over raw bytes, rendered as 64 lowercase hex characters. No text
//! normalization happens here: the same bytes hash the same on every
//! platform and locale.
//!
//! Used to stamp every new version and to verify reconstructed content.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::errors::{VaultError, VaultResult};

/// Length of a formatted content hash
pub const HASH_HEX_LEN: usize = 64;

/// Computes the content hash of the provided bytes.
///
/// This function is deterministic: the same input always produces the same output.
pub fn content_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    to_hex(&digest)
}

/// Computes the content hash of an entire file.
///
/// Reads the file in chunks so large pages are never held twice in memory.
pub fn file_hash(path: &Path) -> VaultResult<String> {
    let file = File::open(path).map_err(|e| VaultError::io(path, e))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| VaultError::io(path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(to_hex(&hasher.finalize()))
}

/// Returns true if `data` hashes to `expected`.
///
/// Comparison is case-insensitive on the hex digits.
pub fn verify(data: &[u8], expected: &str) -> bool {
    content_hash(data).eq_ignore_ascii_case(expected)
}

/// Checks that a string looks like a formatted content hash.
pub fn is_well_formed(hash: &str) -> bool {
    hash.len() == HASH_HEX_LEN && hash.chars().all(|c| c.is_ascii_hexdigit())
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}
