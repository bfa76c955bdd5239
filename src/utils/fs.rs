//! Atomic file writes and cross-process file locks.
//!
//! The persistent registry hive is rewritten on every mutating operation, so
//! a crash mid-write must never leave a truncated file behind, and two
//! processes must not interleave their read-modify-write cycles.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};

/// Create a directory and all of its parents if it does not exist yet.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// Content goes to a temporary file in the target's directory, is synced to
/// disk, and then renamed over the target. Readers observe either the old
/// or the new content, never a partial write. Parent directories are
/// created as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(&parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;

    temp.write_all(content)
        .with_context(|| format!("Failed to write to temp file: {}", temp.path().display()))?;
    temp.as_file().sync_all().context("Failed to sync file to disk")?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Exclusive advisory lock on a file, released on drop.
///
/// Acquisition polls `try_lock_exclusive` with exponential backoff
/// (10ms doubling up to 500ms) until the timeout elapses.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire an exclusive lock on `path`, creating the file if needed.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            ensure_dir(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        let start = Instant::now();
        let mut delay = Duration::from_millis(STARTING_BACKOFF_DELAY_MS);
        let max_delay = Duration::from_millis(MAX_BACKOFF_DELAY_MS);

        loop {
            match file.try_lock_exclusive() {
                Ok(true) => {
                    debug!(
                        lock = %path.display(),
                        wait_ms = start.elapsed().as_millis(),
                        "File lock acquired"
                    );
                    return Ok(Self {
                        _file: file,
                        path: path.to_path_buf(),
                    });
                }
                Ok(false) | Err(_) => {
                    let remaining = timeout.saturating_sub(start.elapsed());
                    if remaining.is_zero() {
                        return Err(anyhow::anyhow!(
                            "Timeout acquiring lock '{}' after {:?}",
                            path.display(),
                            timeout
                        ));
                    }
                    std::thread::sleep(delay.min(remaining));
                    delay = (delay * 2).min(max_delay);
                }
            }
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Closing the file releases the lock
        debug!(lock = %self.path.display(), "File lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp = tempdir().unwrap();
        let file_path = temp.path().join("subdir").join("hive.json");

        atomic_write(&file_path, b"{}").unwrap();

        assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "{}");
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp = tempdir().unwrap();
        let file_path = temp.path().join("hive.json");

        atomic_write(&file_path, b"first").unwrap();
        atomic_write(&file_path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "second");
        // no temp files left behind
        let entries = std::fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_file_lock_is_exclusive() {
        let temp = tempdir().unwrap();
        let lock_path = temp.path().join("hive.lock");

        let lock = FileLock::acquire(&lock_path, Duration::from_secs(1)).unwrap();
        assert!(lock.path().exists());

        let second = FileLock::acquire(&lock_path, Duration::from_millis(50));
        assert!(second.is_err());

        drop(lock);
        assert!(FileLock::acquire(&lock_path, Duration::from_secs(1)).is_ok());
    }
}
