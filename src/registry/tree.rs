//! In-memory key tree shared by the registry backends.
//!
//! Key and value names are case-insensitive and case-preserving, as in the
//! Windows registry: maps are keyed by the name upper-cased one character at a time and each entry
//! remembers the spelling it was created with. Sub-keys enumerate in the
//! order of their folded names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{KeyInfo, RegValue, RegistryRoot};
use crate::core::{DutilError, Result};
use crate::dict::fold_name as fold;

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('\\').filter(|part| !part.is_empty())
}

/// A named value stored under a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedValue {
    /// Name as written (empty for the default value)
    pub name: String,
    /// The stored data
    pub value: RegValue,
}

/// One registry key with its values and sub-keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyNode {
    /// Name as created
    #[serde(default)]
    pub name: String,
    /// Values keyed by folded name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, NamedValue>,
    /// Sub-keys keyed by folded name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subkeys: BTreeMap<String, KeyNode>,
}

impl KeyNode {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Find the key at `path` below this node. The empty path is the node itself.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&Self> {
        components(path).try_fold(self, |node, part| node.subkeys.get(&fold(part)))
    }

    fn find_mut(&mut self, path: &str) -> Option<&mut Self> {
        components(path).try_fold(self, |node, part| node.subkeys.get_mut(&fold(part)))
    }

    fn require(&self, path: &str) -> Result<&Self> {
        self.find(path).ok_or_else(|| DutilError::not_found(format!("registry key '{path}'")))
    }

    fn require_mut(&mut self, path: &str) -> Result<&mut Self> {
        self.find_mut(path).ok_or_else(|| DutilError::not_found(format!("registry key '{path}'")))
    }

    /// Create every missing key along `path`. Returns whether the final key was created.
    pub fn create(&mut self, path: &str) -> bool {
        let mut node = self;
        let mut created = false;
        for part in components(path) {
            created = !node.subkeys.contains_key(&fold(part));
            node = node.subkeys.entry(fold(part)).or_insert_with(|| Self::named(part));
        }
        created
    }

    /// Delete the key at `path`. Non-recursive deletes refuse keys that still have sub-keys.
    pub fn delete(&mut self, path: &str, recursive: bool) -> Result<()> {
        let parts: Vec<&str> = components(path).collect();
        let Some((leaf, parents)) = parts.split_last() else {
            return Err(DutilError::invalid_argument("cannot delete a registry root"));
        };

        let parent = parents
            .iter()
            .try_fold(&mut *self, |node, part| node.subkeys.get_mut(&fold(part)))
            .ok_or_else(|| DutilError::not_found(format!("registry key '{path}'")))?;

        let folded = fold(leaf);
        match parent.subkeys.get(&folded).map(|child| child.subkeys.len()) {
            None => Err(DutilError::not_found(format!("registry key '{path}'"))),
            Some(children) if !recursive && children > 0 => Err(DutilError::invalid_argument(
                format!("registry key '{path}' still has {children} sub-keys"),
            )),
            Some(_) => {
                parent.subkeys.remove(&folded);
                Ok(())
            }
        }
    }

    /// Read value `name` of the key at `path`.
    pub fn read_value(&self, path: &str, name: &str) -> Result<RegValue> {
        self.require(path)?
            .values
            .get(&fold(name))
            .map(|named| named.value.clone())
            .ok_or_else(|| DutilError::not_found(format!("registry value '{path}\\{name}'")))
    }

    /// Write value `name` of the existing key at `path`, replacing any previous data.
    pub fn write_value(&mut self, path: &str, name: &str, value: RegValue) -> Result<()> {
        let node = self.require_mut(path)?;
        node.values.insert(
            fold(name),
            NamedValue {
                name: name.to_string(),
                value,
            },
        );
        Ok(())
    }

    /// Delete value `name` of the key at `path`.
    pub fn delete_value(&mut self, path: &str, name: &str) -> Result<()> {
        self.require_mut(path)?
            .values
            .remove(&fold(name))
            .map(|_| ())
            .ok_or_else(|| DutilError::not_found(format!("registry value '{path}\\{name}'")))
    }

    /// Name of the `index`-th sub-key of the key at `path`, or `None` past the end.
    pub fn enum_subkey(&self, path: &str, index: usize) -> Result<Option<String>> {
        Ok(self.require(path)?.subkeys.values().nth(index).map(|child| child.name.clone()))
    }

    /// Sub-key and value counts of the key at `path`.
    pub fn query_info(&self, path: &str) -> Result<KeyInfo> {
        let node = self.require(path)?;
        Ok(KeyInfo {
            subkeys: node.subkeys.len(),
            values: node.values.len(),
        })
    }
}

/// The two hive roots a dependency store may live under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hives {
    /// HKEY_LOCAL_MACHINE
    #[serde(default)]
    pub local_machine: KeyNode,
    /// HKEY_CURRENT_USER
    #[serde(default)]
    pub current_user: KeyNode,
}

impl Hives {
    /// Root node for `root`.
    #[must_use]
    pub const fn root(&self, root: RegistryRoot) -> &KeyNode {
        match root {
            RegistryRoot::LocalMachine => &self.local_machine,
            RegistryRoot::CurrentUser => &self.current_user,
        }
    }

    /// Mutable root node for `root`.
    pub const fn root_mut(&mut self, root: RegistryRoot) -> &mut KeyNode {
        match root {
            RegistryRoot::LocalMachine => &mut self.local_machine,
            RegistryRoot::CurrentUser => &mut self.current_user,
        }
    }
}
