//! All-or-nothing file placement
//!
//! Content is staged in a temporary file inside the output directory and
//! renamed over the final path, so readers never see a half-written output.

use crate::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, warn};

fn parent_directory(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Write `bytes` to a synced temporary file next to `path`
fn stage(path: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let target = path.display().to_string();
    let mut staged = NamedTempFile::new_in(parent_directory(path))
        .map_err(|e| Error::write_failed(&target, "cannot create temporary file", Some(e)))?;
    staged
        .write_all(bytes)
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| Error::write_failed(&target, "cannot write temporary file", Some(e)))?;
    Ok(staged)
}

/// Move an existing output out of the way so it can be restored
fn set_aside(path: &Path) -> Result<Option<TempPath>> {
    if !path.is_file() {
        return Ok(None);
    }
    let target = path.display().to_string();
    let backup = NamedTempFile::new_in(parent_directory(path))
        .map_err(|e| Error::write_failed(&target, "cannot reserve backup file", Some(e)))?
        .into_temp_path();
    std::fs::rename(path, &backup)
        .map_err(|e| Error::write_failed(&target, "cannot move previous output aside", Some(e)))?;
    Ok(Some(backup))
}

/// Put a placed file back the way it was found
fn restore(path: &Path, backup: Option<TempPath>) {
    match backup {
        Some(backup) => {
            if let Err(e) = backup.persist(path) {
                warn!("Could not restore {}: {}", path.display(), e.error);
            }
        }
        None => remove_outputs(&[path.to_path_buf()]),
    }
}

/// Write `bytes` to `path` through a temporary file in the same directory
pub fn persist_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let staged = stage(path, bytes)?;
    staged.persist(path).map_err(|e| {
        Error::write_failed(
            path.display().to_string(),
            "cannot move file into place",
            Some(e.error),
        )
    })?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Persist a set of files together.
///
/// Every file is staged before any target is touched. If placing one fails,
/// the files already placed are removed and any outputs they replaced are
/// put back.
pub fn persist_all(files: &[(PathBuf, Vec<u8>)]) -> Result<Vec<PathBuf>> {
    let staged = files
        .iter()
        .map(|(path, bytes)| stage(path, bytes).map(|file| (path, file)))
        .collect::<Result<Vec<_>>>()?;

    let mut placed: Vec<(PathBuf, Option<TempPath>)> = Vec::with_capacity(staged.len());
    for (path, file) in staged {
        let outcome = set_aside(path).and_then(|backup| match file.persist(path) {
            Ok(_) => Ok(backup),
            Err(e) => {
                if let Some(backup) = backup {
                    restore(path, Some(backup));
                }
                Err(Error::write_failed(
                    path.display().to_string(),
                    "cannot move file into place",
                    Some(e.error),
                ))
            }
        });
        match outcome {
            Ok(backup) => placed.push((path.clone(), backup)),
            Err(error) => {
                for (path, backup) in placed.into_iter().rev() {
                    restore(&path, backup);
                }
                return Err(error);
            }
        }
    }

    for (path, _) in &placed {
        debug!("Placed {}", path.display());
    }
    // Dropping the backups deletes the replaced outputs
    Ok(placed.into_iter().map(|(path, _)| path).collect())
}

/// Best-effort removal of outputs, used when a file is abandoned
pub fn remove_outputs(paths: &[PathBuf]) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_persist_bytes_places_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        persist_bytes(&path, b"a,b\n").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"a,b\n");
        // No staging files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_persist_bytes_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let error = persist_bytes(&path, b"x").unwrap_err();
        assert_eq!(error.failure_kind(), Some(crate::FailureKind::WriteFailed));
        assert!(!path.exists());
    }

    #[test]
    fn test_persist_all_rolls_back() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("data.csv");
        let blocked = dir.path().join("data.json");
        std::fs::create_dir(&blocked).unwrap();

        let result = persist_all(&[(first.clone(), b"1".to_vec()), (blocked, b"{}".to_vec())]);

        assert!(result.is_err());
        assert!(!first.exists());
    }

    #[test]
    fn test_persist_all_failure_keeps_previous_outputs() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("x.csv");
        std::fs::write(&data, b"previous run").unwrap();
        let blocked = dir.path().join("x.json");
        std::fs::create_dir(&blocked).unwrap();

        let result = persist_all(&[
            (data.clone(), b"new run".to_vec()),
            (blocked, b"{}".to_vec()),
        ]);

        assert!(result.is_err());
        assert_eq!(std::fs::read(&data).unwrap(), b"previous run");
        // Only the original file and the blocking directory remain
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_persist_all_replaces_previous_outputs() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("x.csv");
        let companion = dir.path().join("x.json");
        std::fs::write(&data, b"previous run").unwrap();

        let placed = persist_all(&[
            (data.clone(), b"new run".to_vec()),
            (companion.clone(), b"{}".to_vec()),
        ])
        .unwrap();

        assert_eq!(placed, vec![data.clone(), companion]);
        assert_eq!(std::fs::read(&data).unwrap(), b"new run");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
