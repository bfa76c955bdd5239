//! Process-local registry backend.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::tree::{Hives, KeyNode};
use super::{KeyInfo, RegValue, RegistryBackend, RegistryRoot};
use crate::core::{DutilError, Result};

/// Registry held entirely in memory behind a read-write lock.
///
/// State lives as long as the value; nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    hives: RwLock<Hives>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with `hives`.
    #[must_use]
    pub fn from_hives(hives: Hives) -> Self {
        Self {
            hives: RwLock::new(hives),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Result<Hives> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Hives>> {
        self.hives.read().map_err(|_| DutilError::Other {
            message: "memory registry lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Hives>> {
        self.hives.write().map_err(|_| DutilError::Other {
            message: "memory registry lock poisoned".to_string(),
        })
    }

    fn with_root<T>(
        &self,
        root: RegistryRoot,
        op: impl FnOnce(&KeyNode) -> Result<T>,
    ) -> Result<T> {
        op(self.read()?.root(root))
    }

    fn with_root_mut<T>(
        &self,
        root: RegistryRoot,
        op: impl FnOnce(&mut KeyNode) -> Result<T>,
    ) -> Result<T> {
        op(self.write()?.root_mut(root))
    }
}

impl RegistryBackend for MemoryRegistry {
    fn key_exists(&self, root: RegistryRoot, path: &str) -> Result<bool> {
        self.with_root(root, |node| Ok(node.find(path).is_some()))
    }

    fn create_key(&self, root: RegistryRoot, path: &str) -> Result<bool> {
        self.with_root_mut(root, |node| Ok(node.create(path)))
    }

    fn delete_key(&self, root: RegistryRoot, path: &str, recursive: bool) -> Result<()> {
        self.with_root_mut(root, |node| node.delete(path, recursive))
    }

    fn read_value(&self, root: RegistryRoot, path: &str, name: &str) -> Result<RegValue> {
        self.with_root(root, |node| node.read_value(path, name))
    }

    fn write_value(
        &self,
        root: RegistryRoot,
        path: &str,
        name: &str,
        value: RegValue,
    ) -> Result<()> {
        self.with_root_mut(root, |node| node.write_value(path, name, value))
    }

    fn delete_value(&self, root: RegistryRoot, path: &str, name: &str) -> Result<()> {
        self.with_root_mut(root, |node| node.delete_value(path, name))
    }

    fn enum_subkey(&self, root: RegistryRoot, path: &str, index: usize) -> Result<Option<String>> {
        self.with_root(root, |node| node.enum_subkey(path, index))
    }

    fn query_info(&self, root: RegistryRoot, path: &str) -> Result<KeyInfo> {
        self.with_root(root, |node| node.query_info(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumeration_ends_with_none() {
        let registry = MemoryRegistry::new();
        let root = RegistryRoot::LocalMachine;
        registry.create_key(root, r"P\Dependents\b").unwrap();
        registry.create_key(root, r"P\Dependents\A").unwrap();

        let mut names = Vec::new();
        let mut index = 0;
        while let Some(name) = registry.enum_subkey(root, r"P\Dependents", index).unwrap() {
            names.push(name);
            index += 1;
        }
        assert_eq!(names, vec!["A", "b"]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = MemoryRegistry::new();
        registry.create_key(RegistryRoot::CurrentUser, "X").unwrap();
        let snapshot = registry.snapshot().unwrap();
        registry.delete_key(RegistryRoot::CurrentUser, "X", true).unwrap();

        assert!(snapshot.current_user.find("X").is_some());
        assert!(!registry.key_exists(RegistryRoot::CurrentUser, "X").unwrap());
    }
}
