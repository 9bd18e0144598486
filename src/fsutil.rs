//! Durable file primitives
//!
//! Atomicity is achieved via:
//! 1. Write to a uniquely named temp file next to the target
//! 2. fsync temp file (durability)
//! 3. Rename temp to final (atomic on POSIX)
//! 4. fsync the parent directory so the rename itself is durable
//!
//! A crash at any point leaves either the old file or the new file under the
//! real name, never a partial one. Leftover temp files carry a `.tmp-` marker
//! and are ignored by every reader.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::errors::{VaultError, VaultResult};

/// Marker embedded in every temp file and directory name
pub const TEMP_MARKER: &str = ".tmp-";

/// Build a temp sibling path for `target`.
pub fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_name = format!(".{}{}{}", name, TEMP_MARKER, Uuid::new_v4().simple());
    match target.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    }
}

/// Returns true for names produced by [`temp_path_for`].
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.contains(TEMP_MARKER)
}

/// Write `data` to `path` and fsync it. Not atomic on its own; used for
/// files inside a directory that is itself committed by rename.
pub fn write_file_synced(path: &Path, data: &[u8]) -> VaultResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| VaultError::io(path, e))?;

    file.write_all(data).map_err(|e| VaultError::io(path, e))?;
    file.sync_all().map_err(|e| VaultError::io(path, e))
}

/// Atomically replace `path` with `data`.
pub fn write_atomic(path: &Path, data: &[u8]) -> VaultResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| VaultError::io(parent, e))?;
    }

    let temp_path = temp_path_for(path);
    if let Err(e) = write_file_synced(&temp_path, data) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(VaultError::io(path, e));
    }

    if let Some(parent) = path.parent() {
        fsync_dir(parent)?;
    }

    Ok(())
}

/// Atomically publish a fully written temp directory under `target`.
///
/// Fails with `AlreadyExists` if `target` is present; the temp directory is
/// removed in every failure case.
pub fn commit_dir(temp_dir: &Path, target: &Path) -> VaultResult<()> {
    if target.exists() {
        remove_dir_quietly(temp_dir);
        return Err(VaultError::AlreadyExists(target.display().to_string()));
    }

    if let Err(e) = fsync_dir(temp_dir) {
        remove_dir_quietly(temp_dir);
        return Err(e);
    }

    if let Err(e) = fs::rename(temp_dir, target) {
        remove_dir_quietly(temp_dir);
        // rename(2) onto a non-empty directory fails instead of replacing it
        if target.exists() {
            return Err(VaultError::AlreadyExists(target.display().to_string()));
        }
        return Err(VaultError::io(target, e));
    }

    if let Some(parent) = target.parent() {
        fsync_dir(parent)?;
    }

    Ok(())
}

/// fsync a directory to ensure durability.
///
/// On Unix this opens the directory and calls fsync on it. Other platforms
/// cannot open directories as files, so this is a no-op there.
pub fn fsync_dir(path: &Path) -> VaultResult<()> {
    #[cfg(unix)]
    {
        let dir = File::open(path).map_err(|e| VaultError::io(path, e))?;
        dir.sync_all().map_err(|e| VaultError::io(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

/// Ensure a directory exists.
pub fn ensure_dir(path: &Path) -> VaultResult<()> {
    fs::create_dir_all(path).map_err(|e| VaultError::io(path, e))
}

/// Best-effort removal on an error path.
pub fn remove_dir_quietly(path: &Path) {
    if path.exists() {
        let _ = fs::remove_dir_all(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn visible_entries(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_write_atomic_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("manifest.json");

        write_atomic(&path, b"{\"a\":1}").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"{\"a\":1}");
    }

    #[test]
    fn test_write_atomic_replaces_and_leaves_no_temp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page-index.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert_eq!(visible_entries(temp_dir.path()), vec!["page-index.json"]);
    }

    #[test]
    fn test_temp_names_are_unique_and_recognised() {
        let target = Path::new("/x/manifest.json");
        let a = temp_path_for(target);
        let b = temp_path_for(target);
        assert_ne!(a, b);
        assert_eq!(a.parent(), target.parent());
        assert!(is_temp_name(&a.file_name().unwrap().to_string_lossy()));
        assert!(!is_temp_name("manifest.json"));
        assert!(!is_temp_name("v1"));
    }

    #[test]
    fn test_commit_dir_publishes_contents() {
        let temp_dir = TempDir::new().unwrap();
        let staging = temp_path_for(&temp_dir.path().join("v1"));
        fs::create_dir_all(&staging).unwrap();
        write_file_synced(&staging.join("content.md"), b"Hello").unwrap();

        let target = temp_dir.path().join("v1");
        commit_dir(&staging, &target).unwrap();

        assert_eq!(fs::read(target.join("content.md")).unwrap(), b"Hello");
        assert!(!staging.exists());
    }

    #[test]
    fn test_commit_dir_refuses_existing_target() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("v1");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("content.md"), b"original").unwrap();

        let staging = temp_path_for(&target);
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("content.md"), b"replacement").unwrap();

        let result = commit_dir(&staging, &target);

        assert!(matches!(result, Err(VaultError::AlreadyExists(_))));
        assert_eq!(fs::read(target.join("content.md")).unwrap(), b"original");
        assert!(!staging.exists());
    }
}
