//! Persistent registry backend stored in a JSON hive file.
//!
//! Every operation locks `<hive>.lock`, loads the hive, applies itself and,
//! for mutations that succeed, writes the hive back through an atomic
//! replace. A process killed mid-operation therefore leaves either the
//! previous or the next state on disk. Multi-step sequences issued by the
//! dependency store are not transactional; only single operations are.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tree::{Hives, KeyNode};
use super::{KeyInfo, RegValue, RegistryBackend, RegistryRoot};
use crate::constants::default_lock_timeout;
use crate::core::{DutilError, Result};
use crate::utils::{FileLock, atomic_write};

const HIVE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct HiveFile {
    version: u32,
    #[serde(flatten)]
    hives: Hives,
}

/// Registry backend persisted to a single JSON file.
#[derive(Debug, Clone)]
pub struct FileHive {
    path: PathBuf,
    lock_timeout: Duration,
}

impl FileHive {
    /// Use the hive file at `path`. The file is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: default_lock_timeout(),
        }
    }

    /// Override how long an operation waits for the hive lock.
    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Location of the hive file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn hive_error(&self, reason: impl std::fmt::Display) -> DutilError {
        DutilError::HiveError {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Load the hive contents without locking. A missing or empty file is an empty hive.
    pub fn load(&self) -> Result<Hives> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Hives::default()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Hives::default());
        }

        let file: HiveFile = serde_json::from_str(&content).map_err(|e| self.hive_error(e))?;
        if file.version > HIVE_FORMAT_VERSION {
            return Err(self.hive_error(format!(
                "hive format version {} is newer than supported version {HIVE_FORMAT_VERSION}",
                file.version
            )));
        }
        Ok(file.hives)
    }

    fn save(&self, hives: Hives) -> Result<()> {
        let file = HiveFile {
            version: HIVE_FORMAT_VERSION,
            hives,
        };
        let json = serde_json::to_vec_pretty(&file).map_err(|e| self.hive_error(e))?;
        atomic_write(&self.path, &json).map_err(|e| self.hive_error(format!("{e:#}")))
    }

    fn locked<T>(&self, mutate: bool, op: impl FnOnce(&mut Hives) -> Result<T>) -> Result<T> {
        let _lock = FileLock::acquire(&self.lock_path(), self.lock_timeout)
            .map_err(|e| self.hive_error(format!("{e:#}")))?;

        let mut hives = self.load()?;
        let out = op(&mut hives)?;
        if mutate {
            self.save(hives)?;
            debug!(hive = %self.path.display(), "Hive saved");
        }
        Ok(out)
    }

    fn read_root<T>(
        &self,
        root: RegistryRoot,
        op: impl FnOnce(&KeyNode) -> Result<T>,
    ) -> Result<T> {
        self.locked(false, |hives| op(hives.root(root)))
    }

    fn write_root<T>(
        &self,
        root: RegistryRoot,
        op: impl FnOnce(&mut KeyNode) -> Result<T>,
    ) -> Result<T> {
        self.locked(true, |hives| op(hives.root_mut(root)))
    }
}

impl RegistryBackend for FileHive {
    fn key_exists(&self, root: RegistryRoot, path: &str) -> Result<bool> {
        self.read_root(root, |node| Ok(node.find(path).is_some()))
    }

    fn create_key(&self, root: RegistryRoot, path: &str) -> Result<bool> {
        self.write_root(root, |node| Ok(node.create(path)))
    }

    fn delete_key(&self, root: RegistryRoot, path: &str, recursive: bool) -> Result<()> {
        self.write_root(root, |node| node.delete(path, recursive))
    }

    fn read_value(&self, root: RegistryRoot, path: &str, name: &str) -> Result<RegValue> {
        self.read_root(root, |node| node.read_value(path, name))
    }

    fn write_value(
        &self,
        root: RegistryRoot,
        path: &str,
        name: &str,
        value: RegValue,
    ) -> Result<()> {
        self.write_root(root, |node| node.write_value(path, name, value))
    }

    fn delete_value(&self, root: RegistryRoot, path: &str, name: &str) -> Result<()> {
        self.write_root(root, |node| node.delete_value(path, name))
    }

    fn enum_subkey(&self, root: RegistryRoot, path: &str, index: usize) -> Result<Option<String>> {
        self.read_root(root, |node| node.enum_subkey(path, index))
    }

    fn query_info(&self, root: RegistryRoot, path: &str) -> Result<KeyInfo> {
        self.read_root(root, |node| node.query_info(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_hive() {
        let temp = TempDir::new().unwrap();
        let hive = FileHive::new(temp.path().join("registry.json"));
        assert!(!hive.key_exists(RegistryRoot::LocalMachine, "Anything").unwrap());
        assert!(!hive.path().exists(), "reads must not create the hive");
    }

    #[test]
    fn test_state_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("registry.json");

        let first = FileHive::new(&path);
        first.create_key(RegistryRoot::LocalMachine, r"Software\P").unwrap();
        first
            .write_value(
                RegistryRoot::LocalMachine,
                r"Software\P",
                "Version",
                RegValue::String("1.0".into()),
            )
            .unwrap();
        drop(first);

        let second = FileHive::new(&path);
        assert_eq!(
            second.read_value(RegistryRoot::LocalMachine, r"software\p", "version").unwrap(),
            RegValue::String("1.0".into())
        );
    }

    #[test]
    fn test_failed_mutation_leaves_file_untouched() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("registry.json");
        let hive = FileHive::new(&path);
        hive.create_key(RegistryRoot::CurrentUser, "Keep").unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let err = hive.delete_key(RegistryRoot::CurrentUser, r"Missing\Child", true).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_corrupt_file_is_hive_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("registry.json");
        std::fs::write(&path, "{ not json").unwrap();

        let hive = FileHive::new(&path);
        let err = hive.key_exists(RegistryRoot::LocalMachine, "X").unwrap_err();
        assert!(matches!(err, DutilError::HiveError { .. }));
    }

    #[test]
    fn test_newer_format_version_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("registry.json");
        std::fs::write(&path, r#"{ "version": 99 }"#).unwrap();

        let err = FileHive::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_lock_timeout_surfaces_as_hive_error() {
        let temp = TempDir::new().unwrap();
        let hive = FileHive::new(temp.path().join("registry.json"))
            .with_lock_timeout(Duration::from_millis(50));
        let _held = FileLock::acquire(&hive.lock_path(), Duration::from_secs(1)).unwrap();

        let err = hive.create_key(RegistryRoot::LocalMachine, "X").unwrap_err();
        assert!(matches!(err, DutilError::HiveError { .. }));
    }
}
