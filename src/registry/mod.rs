//! Registry abstraction consumed by the dependency store.
//!
//! The dependency store persists everything in a hierarchical key/value
//! registry. This module defines the narrow contract it needs
//! ([`RegistryBackend`]), an RAII key handle with typed accessors
//! ([`RegKey`]), and two backends:
//!
//! - [`MemoryRegistry`] - process-local tree, used by tests and dry runs
//! - [`FileHive`] - JSON hive file locked and rewritten atomically per operation,
//!   so registrations survive process exits and crashes
//!
//! # Semantics shared by all backends
//!
//! - Paths are backslash-separated and relative to a [`RegistryRoot`].
//! - Key and value names compare case-insensitively and keep their spelling.
//! - Every "key or value does not exist" condition is reported as
//!   [`DutilError::NotFound`]; other failures pass through unchanged.
//! - A non-recursive delete of a key that still has sub-keys fails with
//!   [`DutilError::InvalidArgument`].
//!
//! # Examples
//!
//! ```rust
//! use dutil::registry::{MemoryRegistry, RegKey, RegistryRoot};
//!
//! # fn example() -> dutil::core::Result<()> {
//! let registry = MemoryRegistry::new();
//! let (key, created) = RegKey::create(&registry, RegistryRoot::CurrentUser, r"Software\Example")?;
//! assert!(created);
//! key.write_string("Version", Some("1.0.0.0"))?;
//! assert_eq!(key.read_version("Version")?.to_string(), "1.0.0.0");
//! # Ok(())
//! # }
//! ```

mod hive;
mod memory;
pub mod tree;

pub use hive::FileHive;
pub use memory::MemoryRegistry;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

use crate::core::{DutilError, Result};
use crate::version::FourPartVersion;

/// Top-level hive a path is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryRoot {
    /// Per-machine registrations (HKLM)
    LocalMachine,
    /// Per-user registrations (HKCU)
    CurrentUser,
}

impl fmt::Display for RegistryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalMachine => f.write_str("HKLM"),
            Self::CurrentUser => f.write_str("HKCU"),
        }
    }
}

/// Typed registry value data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RegValue {
    /// REG_SZ
    String(String),
    /// REG_DWORD
    Dword(u32),
    /// REG_QWORD
    Qword(u64),
}

/// Counts returned by [`RegistryBackend::query_info`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyInfo {
    /// Number of immediate sub-keys
    pub subkeys: usize,
    /// Number of values, including the default value if set
    pub values: usize,
}

/// Operations the dependency store needs from a registry.
///
/// Implementations must be usable through a shared reference; backends
/// synchronise internally. Each call is atomic on its own, but no
/// guarantee spans several calls.
pub trait RegistryBackend: fmt::Debug {
    /// Whether the key at `path` exists.
    fn key_exists(&self, root: RegistryRoot, path: &str) -> Result<bool>;

    /// Create the key at `path` and any missing parents. Returns whether the key was created.
    fn create_key(&self, root: RegistryRoot, path: &str) -> Result<bool>;

    /// Delete the key at `path`, with its whole subtree when `recursive`.
    fn delete_key(&self, root: RegistryRoot, path: &str, recursive: bool) -> Result<()>;

    /// Read value `name` of the key at `path`.
    fn read_value(&self, root: RegistryRoot, path: &str, name: &str) -> Result<RegValue>;

    /// Write value `name` of the existing key at `path`.
    fn write_value(&self, root: RegistryRoot, path: &str, name: &str, value: RegValue)
    -> Result<()>;

    /// Delete value `name` of the key at `path`.
    fn delete_value(&self, root: RegistryRoot, path: &str, name: &str) -> Result<()>;

    /// Name of the `index`-th sub-key, or `None` when there are no more items.
    fn enum_subkey(&self, root: RegistryRoot, path: &str, index: usize) -> Result<Option<String>>;

    /// Sub-key and value counts of the key at `path`.
    fn query_info(&self, root: RegistryRoot, path: &str) -> Result<KeyInfo>;
}

/// Join registry path segments with backslashes, skipping empty segments.
#[must_use]
pub fn join_path(parts: &[&str]) -> String {
    parts.iter().filter(|part| !part.is_empty()).copied().collect::<Vec<_>>().join("\\")
}

/// An open registry key.
///
/// Obtained through [`RegKey::open`] or [`RegKey::create`]; the key is
/// released when the handle is dropped.
pub struct RegKey<'r> {
    backend: &'r dyn RegistryBackend,
    root: RegistryRoot,
    path: String,
}

impl fmt::Debug for RegKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegKey({}\\{})", self.root, self.path)
    }
}

impl<'r> RegKey<'r> {
    /// Open an existing key.
    ///
    /// # Errors
    ///
    /// [`DutilError::NotFound`] if the key does not exist.
    pub fn open(
        backend: &'r dyn RegistryBackend,
        root: RegistryRoot,
        path: impl Into<String>,
    ) -> Result<Self> {
        let path = path.into();
        if !backend.key_exists(root, &path)? {
            return Err(DutilError::not_found(format!("registry key '{root}\\{path}'")));
        }
        trace!(%root, path = %path, "Opened registry key");
        Ok(Self {
            backend,
            root,
            path,
        })
    }

    /// Open a key, creating it and its parents if needed. The flag reports creation.
    pub fn create(
        backend: &'r dyn RegistryBackend,
        root: RegistryRoot,
        path: impl Into<String>,
    ) -> Result<(Self, bool)> {
        let path = path.into();
        let created = backend.create_key(root, &path)?;
        trace!(%root, path = %path, created, "Created registry key");
        Ok((
            Self {
                backend,
                root,
                path,
            },
            created,
        ))
    }

    /// Path of this key relative to its root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Root this key lives under.
    #[must_use]
    pub const fn root(&self) -> RegistryRoot {
        self.root
    }

    /// Path of the child `name` of this key.
    #[must_use]
    pub fn subkey_path(&self, name: &str) -> String {
        join_path(&[&self.path, name])
    }

    /// Read a string value.
    ///
    /// # Errors
    ///
    /// [`DutilError::NotFound`] if absent, [`DutilError::InvalidArgument`]
    /// if the value is not a string.
    pub fn read_string(&self, name: &str) -> Result<String> {
        match self.backend.read_value(self.root, &self.path, name)? {
            RegValue::String(text) => Ok(text),
            other => Err(DutilError::invalid_argument(format!(
                "registry value '{}\\{name}' is {other:?}, expected a string",
                self.path
            ))),
        }
    }

    /// Read a DWORD value.
    pub fn read_number(&self, name: &str) -> Result<u32> {
        match self.backend.read_value(self.root, &self.path, name)? {
            RegValue::Dword(number) => Ok(number),
            other => Err(DutilError::invalid_argument(format!(
                "registry value '{}\\{name}' is {other:?}, expected a DWORD",
                self.path
            ))),
        }
    }

    /// Read a string value and parse it as a four-part version.
    pub fn read_version(&self, name: &str) -> Result<FourPartVersion> {
        FourPartVersion::parse(&self.read_string(name)?)
    }

    /// Write a string value. `None` or an empty string deletes the value;
    /// deleting an absent value is not an error.
    pub fn write_string(&self, name: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(text) if !text.is_empty() => self.backend.write_value(
                self.root,
                &self.path,
                name,
                RegValue::String(text.to_string()),
            ),
            _ => match self.backend.delete_value(self.root, &self.path, name) {
                Err(e) if e.is_not_found() => Ok(()),
                other => other,
            },
        }
    }

    /// Write a DWORD value.
    pub fn write_number(&self, name: &str, value: u32) -> Result<()> {
        self.backend.write_value(self.root, &self.path, name, RegValue::Dword(value))
    }

    /// Name of the `index`-th sub-key, or `None` when there are no more items.
    pub fn enum_subkey(&self, index: usize) -> Result<Option<String>> {
        self.backend.enum_subkey(self.root, &self.path, index)
    }

    /// Sub-key and value counts of this key.
    pub fn query_info(&self) -> Result<KeyInfo> {
        self.backend.query_info(self.root, &self.path)
    }

    /// Open the child `name` of this key.
    pub fn open_subkey(&self, name: &str) -> Result<RegKey<'r>> {
        RegKey::open(self.backend, self.root, self.subkey_path(name))
    }
}

impl Drop for RegKey<'_> {
    fn drop(&mut self) {
        trace!(root = %self.root, path = %self.path, "Closed registry key");
    }
}
