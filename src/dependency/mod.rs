//! Registry-backed dependency reference counting.
//!
//! A *provider* publishes a dependency under
//! `Software\Classes\Installer\Dependencies\<ProviderKey>` with its id
//! (default value), `Version`, `DisplayName` and optional `Attributes`.
//! Packages that rely on a provider register themselves as *dependents*
//! under the provider's `Dependents` sub-key, optionally constraining the
//! acceptable provider version range.
//!
//! ```text
//! <root>\Software\Classes\Installer\Dependencies\<ProviderKey>
//!     (Default)   = <Id>
//!     Version     = <major.minor.build.revision>
//!     DisplayName = <string>
//!     Attributes  = <DWORD, absent when 0>
//!     \Dependents
//!         \<DependentProviderKey>
//!             MinVersion = <version>
//!             MaxVersion = <version>
//!             Attributes = <DWORD>
//! ```
//!
//! # Soft failures
//!
//! [`DependencyStore::check_dependency`] reports a missing, orphaned or
//! out-of-range provider by appending a [`Dependency`] record and returning
//! [`DutilError::NotFound`]. Callers sweeping several providers keep going on
//! `NotFound` and abort on anything else:
//!
//! ```rust
//! use dutil::dependency::{DependencyAttributes, DependencyList, DependencyStore};
//! use dutil::dict::{DictFlags, StringDict};
//! use dutil::registry::{MemoryRegistry, RegistryRoot};
//! use dutil::version::FourPartVersion;
//!
//! # fn example() -> dutil::core::Result<()> {
//! let registry = MemoryRegistry::new();
//! let store = DependencyStore::new(&registry, RegistryRoot::LocalMachine);
//! store.register_dependency("ProviderA", "2.5.0.0", "Package A", None, DependencyAttributes::empty())?;
//!
//! let mut seen = StringDict::create_string_list(4, DictFlags::CASE_INSENSITIVE)?;
//! let mut missing = DependencyList::new();
//! let min = Some(FourPartVersion::parse("2.0")?);
//! for key in ["ProviderA", "ProviderB"] {
//!     match store.check_dependency(key, min, None, DependencyAttributes::empty(), &mut seen, &mut missing) {
//!         Ok(()) => {}
//!         Err(e) if e.is_not_found() => continue,
//!         Err(e) => return Err(e),
//!     }
//! }
//! assert_eq!(missing.len(), 1);
//! assert_eq!(missing[0].key, "ProviderB");
//! # Ok(())
//! # }
//! ```
//!
//! # Consistency
//!
//! Each registry operation is atomic on its own; multi-step sequences such
//! as [`DependencyStore::unregister_dependent`] are not. Cleanup re-checks
//! emptiness right before every non-recursive delete so a dependent
//! registered concurrently is never removed with its parent.

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use tracing::{debug, info, warn};

use crate::constants::{
    ATTRIBUTES_VALUE, DEPENDENCY_REGISTRY_ROOT, DEPENDENTS_KEY, DISPLAY_NAME_VALUE, ID_VALUE,
    MAX_VERSION_VALUE, MIN_VERSION_VALUE, VERSION_VALUE,
};
use crate::core::{DutilError, Result};
use crate::dict::StringDict;
use crate::registry::{RegKey, RegistryBackend, RegistryRoot, join_path};
use crate::version::FourPartVersion;

bitflags::bitflags! {
    /// Attribute bits stored in the `Attributes` DWORD of providers and dependents.
    ///
    /// Unknown bits are preserved so provider attributes round-trip unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DependencyAttributes: u32 {
        /// A provider version equal to the minimum satisfies the check.
        const MIN_VERSION_INCLUSIVE = 0x100;
        /// A provider version equal to the maximum satisfies the check.
        const MAX_VERSION_INCLUSIVE = 0x200;
    }
}

/// One entry of a dependency check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Provider key of the missing provider or of the dependent
    pub key: String,
    /// Display name, when one could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Dependency {
    /// Create a record.
    pub fn new(key: impl Into<String>, name: Option<String>) -> Self {
        Self {
            key: key.into(),
            name,
        }
    }
}

/// Records accumulated by one or more checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyList(Vec<Dependency>);

impl DependencyList {
    /// Create an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a record.
    pub fn push(&mut self, dependency: Dependency) {
        self.0.push(dependency);
    }

    /// Append `{key, name}` unless `dedup` already holds `key`, then remember `key` in `dedup`.
    ///
    /// Returns whether a record was appended.
    pub fn push_unique(
        &mut self,
        dedup: &mut StringDict,
        key: &str,
        name: Option<String>,
    ) -> Result<bool> {
        if dedup.contains(key) {
            return Ok(false);
        }
        self.0.try_reserve(1).map_err(|_| DutilError::OutOfMemory)?;
        dedup.add_key(key)?;
        self.0.push(Dependency::new(key, name));
        Ok(true)
    }

    /// Take the records.
    #[must_use]
    pub fn into_vec(self) -> Vec<Dependency> {
        self.0
    }
}

impl Deref for DependencyList {
    type Target = [Dependency];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Dependency>> for DependencyList {
    fn from(items: Vec<Dependency>) -> Self {
        Self(items)
    }
}

impl<'a> IntoIterator for &'a DependencyList {
    type Item = &'a Dependency;
    type IntoIter = std::slice::Iter<'a, Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Registration metadata of a provider. Absent values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider id (the key's default value)
    pub id: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Registered version
    pub version: Option<FourPartVersion>,
}

/// Treat a `NotFound` outcome as `None`.
fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Treat a `NotFound` outcome as success.
fn ignore_not_found(result: Result<()>) -> Result<()> {
    optional(result).map(|_| ())
}

fn validate_key(what: &str, key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(DutilError::invalid_argument(format!("{what} must not be empty")));
    }
    if key.contains('\\') {
        return Err(DutilError::invalid_argument(format!(
            "{what} '{key}' must not contain a backslash"
        )));
    }
    Ok(())
}

fn validate_version(text: Option<&str>) -> Result<()> {
    match text {
        Some(text) if !text.is_empty() => FourPartVersion::parse(text).map(|_| ()),
        _ => Ok(()),
    }
}

/// Dependency registrations under one registry root.
#[derive(Debug, Clone, Copy)]
pub struct DependencyStore<'r> {
    registry: &'r dyn RegistryBackend,
    root: RegistryRoot,
}

impl<'r> DependencyStore<'r> {
    /// Operate on the registrations stored under `root` in `registry`.
    pub fn new(registry: &'r dyn RegistryBackend, root: RegistryRoot) -> Self {
        Self {
            registry,
            root,
        }
    }

    /// The root this store reads and writes.
    #[must_use]
    pub const fn root(&self) -> RegistryRoot {
        self.root
    }

    fn provider_path(provider_key: &str) -> String {
        join_path(&[DEPENDENCY_REGISTRY_ROOT, provider_key])
    }

    fn dependents_path(provider_key: &str) -> String {
        join_path(&[DEPENDENCY_REGISTRY_ROOT, provider_key, DEPENDENTS_KEY])
    }

    fn dependent_path(provider_key: &str, dependent_key: &str) -> String {
        join_path(&[DEPENDENCY_REGISTRY_ROOT, provider_key, DEPENDENTS_KEY, dependent_key])
    }

    fn open(&self, path: String) -> Result<RegKey<'r>> {
        let key = RegKey::open(self.registry, self.root, path)?;
        debug!(root = %self.root, path = key.path(), "Opened key");
        Ok(key)
    }

    fn create(&self, path: String) -> Result<RegKey<'r>> {
        let (key, created) = RegKey::create(self.registry, self.root, path)?;
        debug!(root = %self.root, path = key.path(), created, "Created or opened key");
        Ok(key)
    }

    fn delete(&self, path: &str, recursive: bool) -> Result<()> {
        self.registry.delete_key(self.root, path, recursive)?;
        debug!(root = %self.root, path, recursive, "Deleted key");
        Ok(())
    }

    // Best-effort: a dependent without a readable provider registration stays unnamed.
    fn dependent_name(&self, dependent_key: &str) -> Option<String> {
        let name = self
            .open(Self::provider_path(dependent_key))
            .and_then(|key| key.read_string(DISPLAY_NAME_VALUE));
        match name {
            Ok(name) => Some(name),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                warn!(dependent = dependent_key, error = %e, "Cannot read dependent display name");
                None
            }
        }
    }

    /// Read the registration metadata of `provider_key`.
    ///
    /// Individual values may be absent; each absent value is `None`.
    ///
    /// # Errors
    ///
    /// [`DutilError::NotFound`] if the provider key does not exist.
    pub fn get_provider_information(&self, provider_key: &str) -> Result<ProviderInfo> {
        validate_key("provider key", provider_key)?;
        let key = self.open(Self::provider_path(provider_key))?;

        Ok(ProviderInfo {
            id: optional(key.read_string(ID_VALUE))?,
            name: optional(key.read_string(DISPLAY_NAME_VALUE))?,
            version: optional(key.read_version(VERSION_VALUE))?,
        })
    }

    /// Whether a key for `provider_key` exists. Orphaned keys count as existing.
    pub fn provider_exists(&self, provider_key: &str) -> Result<bool> {
        validate_key("provider key", provider_key)?;
        self.registry.key_exists(self.root, &Self::provider_path(provider_key))
    }

    /// Check that `provider_key` is registered with a version inside the given bounds.
    ///
    /// A missing or orphaned provider (no `Version` value) is appended to
    /// `results` without a name; a provider outside the bounds is appended
    /// with its display name. `dedup` suppresses keys already reported in
    /// this pass. Bounds are exclusive unless the matching bit of
    /// `attributes` is set.
    ///
    /// # Errors
    ///
    /// [`DutilError::NotFound`] whenever a record was (or would have been)
    /// appended. Other errors are registry or allocation faults.
    pub fn check_dependency(
        &self,
        provider_key: &str,
        min_version: Option<FourPartVersion>,
        max_version: Option<FourPartVersion>,
        attributes: DependencyAttributes,
        dedup: &mut StringDict,
        results: &mut DependencyList,
    ) -> Result<()> {
        validate_key("provider key", provider_key)?;

        let Some(key) = optional(self.open(Self::provider_path(provider_key)))? else {
            debug!(provider = provider_key, "Dependency is not registered");
            results.push_unique(dedup, provider_key, None)?;
            return Err(DutilError::not_found(format!("dependency '{provider_key}'")));
        };

        let Some(version) = optional(key.read_version(VERSION_VALUE))? else {
            debug!(provider = provider_key, "Dependency is orphaned");
            results.push_unique(dedup, provider_key, None)?;
            return Err(DutilError::not_found(format!("dependency '{provider_key}' version")));
        };

        let too_old = min_version.is_some_and(|min| {
            if attributes.contains(DependencyAttributes::MIN_VERSION_INCLUSIVE) {
                version < min
            } else {
                version <= min
            }
        });
        let too_new = max_version.is_some_and(|max| {
            if attributes.contains(DependencyAttributes::MAX_VERSION_INCLUSIVE) {
                version > max
            } else {
                version >= max
            }
        });

        if too_old || too_new {
            debug!(
                provider = provider_key,
                %version,
                min = ?min_version.map(|v| v.to_string()),
                max = ?max_version.map(|v| v.to_string()),
                "Dependency version is out of range"
            );
            let name = optional(key.read_string(DISPLAY_NAME_VALUE))?;
            results.push_unique(dedup, provider_key, name)?;
            return Err(DutilError::not_found(format!(
                "dependency '{provider_key}' version {version} in the required range"
            )));
        }

        Ok(())
    }

    /// Append every dependent of `provider_key` not in `ignore` to `results`.
    ///
    /// Names come from each dependent's own provider registration when one
    /// exists. A name that cannot be read only leaves that record unnamed.
    ///
    /// # Errors
    ///
    /// [`DutilError::CorruptStore`] if the provider key itself is missing.
    pub fn check_dependents(
        &self,
        provider_key: &str,
        ignore: Option<&StringDict>,
        results: &mut DependencyList,
    ) -> Result<()> {
        validate_key("provider key", provider_key)?;

        match self.registry.key_exists(self.root, &Self::provider_path(provider_key)) {
            Ok(true) => {}
            Ok(false) => {
                return Err(DutilError::CorruptStore {
                    key: provider_key.to_string(),
                    reason: "the provider key does not exist".to_string(),
                });
            }
            Err(e) => return Err(e),
        }

        let Some(dependents) = optional(self.open(Self::dependents_path(provider_key)))? else {
            return Ok(());
        };

        let mut index = 0;
        while let Some(dependent_key) = dependents.enum_subkey(index)? {
            index += 1;
            if ignore.is_some_and(|ignore| ignore.contains(&dependent_key)) {
                debug!(provider = provider_key, dependent = %dependent_key, "Ignoring dependent");
                continue;
            }

            let name = self.dependent_name(&dependent_key);
            results.push(Dependency::new(dependent_key, name));
        }

        Ok(())
    }

    /// Register `provider_key`, creating its key if needed.
    ///
    /// `Version` and `DisplayName` are always (over)written, the id only when
    /// given and `Attributes` only when non-empty.
    pub fn register_dependency(
        &self,
        provider_key: &str,
        version: &str,
        display_name: &str,
        id: Option<&str>,
        attributes: DependencyAttributes,
    ) -> Result<()> {
        validate_key("provider key", provider_key)?;
        FourPartVersion::parse(version)?;

        let key = self.create(Self::provider_path(provider_key))?;
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            key.write_string(ID_VALUE, Some(id))?;
        }
        key.write_string(VERSION_VALUE, Some(version))?;
        key.write_string(DISPLAY_NAME_VALUE, Some(display_name))?;
        if !attributes.is_empty() {
            key.write_number(ATTRIBUTES_VALUE, attributes.bits())?;
        }

        info!(
            root = %self.root,
            provider = provider_key,
            version,
            "Registered dependency provider"
        );
        Ok(())
    }

    /// Whether `dependent_key` is registered against `provider_key`.
    pub fn dependent_exists(&self, provider_key: &str, dependent_key: &str) -> Result<bool> {
        validate_key("provider key", provider_key)?;
        validate_key("dependent key", dependent_key)?;
        self.registry.key_exists(self.root, &Self::dependent_path(provider_key, dependent_key))
    }

    /// Register `dependent_key` as a dependent of `provider_key`.
    ///
    /// Creates the provider key when missing. `None` or empty bounds clear
    /// any previously stored bound; `Attributes` is written only when non-empty.
    pub fn register_dependent(
        &self,
        provider_key: &str,
        dependent_key: &str,
        min_version: Option<&str>,
        max_version: Option<&str>,
        attributes: DependencyAttributes,
    ) -> Result<()> {
        validate_key("provider key", provider_key)?;
        validate_key("dependent key", dependent_key)?;
        validate_version(min_version)?;
        validate_version(max_version)?;

        self.create(Self::provider_path(provider_key))?;
        let key = self.create(Self::dependent_path(provider_key, dependent_key))?;
        key.write_string(MIN_VERSION_VALUE, min_version)?;
        key.write_string(MAX_VERSION_VALUE, max_version)?;
        if !attributes.is_empty() {
            key.write_number(ATTRIBUTES_VALUE, attributes.bits())?;
        }

        info!(
            root = %self.root,
            provider = provider_key,
            dependent = dependent_key,
            "Registered dependent"
        );
        Ok(())
    }

    /// Delete `provider_key` with everything under it. An absent provider is not an error.
    pub fn unregister_dependency(&self, provider_key: &str) -> Result<()> {
        validate_key("provider key", provider_key)?;
        ignore_not_found(self.delete(&Self::provider_path(provider_key), true))?;
        info!(root = %self.root, provider = provider_key, "Unregistered dependency provider");
        Ok(())
    }

    /// Remove `dependent_key` from `provider_key`'s dependents and clean up.
    ///
    /// Missing registry state at any stage counts as already removed. Once
    /// the last dependent is gone the `Dependents` key is deleted, and the
    /// provider key follows when it holds neither values nor sub-keys.
    pub fn unregister_dependent(&self, provider_key: &str, dependent_key: &str) -> Result<()> {
        validate_key("provider key", provider_key)?;
        validate_key("dependent key", dependent_key)?;

        if !self.registry.key_exists(self.root, DEPENDENCY_REGISTRY_ROOT)? {
            debug!(root = %self.root, "Dependency registry root is absent");
            return Ok(());
        }

        let provider_path = Self::provider_path(provider_key);
        if !self.registry.key_exists(self.root, &provider_path)? {
            debug!(provider = provider_key, "Provider is absent");
            return Ok(());
        }

        let dependents_path = Self::dependents_path(provider_key);
        {
            let Some(dependents) = optional(self.open(dependents_path.clone()))? else {
                debug!(provider = provider_key, "Provider has no dependents");
                return Ok(());
            };
            ignore_not_found(self.delete(&dependents.subkey_path(dependent_key), true))?;
            info!(
                root = %self.root,
                provider = provider_key,
                dependent = dependent_key,
                "Unregistered dependent"
            );

            // None means a concurrent uninstall already removed the Dependents key
            if optional(dependents.query_info())?.is_some_and(|info| info.subkeys > 0) {
                return Ok(());
            }
        }

        // Re-check with the handle released; a dependent may have been added meanwhile.
        if let Some(info) = optional(self.registry.query_info(self.root, &dependents_path))?
            && info.subkeys == 0
        {
            ignore_not_found(self.delete(&dependents_path, false))?;
        }

        let Some(info) = optional(self.registry.query_info(self.root, &provider_path))? else {
            return Ok(());
        };
        if info.subkeys == 0 && info.values == 0 {
            ignore_not_found(self.delete(&provider_path, false))?;
            info!(root = %self.root, provider = provider_key, "Removed empty provider key");
        }

        Ok(())
    }
}
