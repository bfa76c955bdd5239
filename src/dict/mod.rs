//! Open-addressing string dictionary.
//!
//! [`StringDict`] is a hash set keyed by strings, compared either exactly or
//! case-insensitively. It runs in one of two modes:
//!
//! - **String list** ([`StringDict::create_string_list`]): the dictionary
//!   owns a copy of every key and stores no value. Used as a membership set,
//!   for example to avoid reporting the same provider twice in one
//!   dependency sweep.
//! - **Embedded key** ([`StringDict::create_embedded`]): values are structs
//!   owned by the caller in a slice or `Vec`, and the key is a field inside
//!   each value, located by an accessor function. The dictionary stores
//!   stable 1-based indices into the caller's array, so the array may be
//!   reallocated between calls without invalidating the table.
//!
//! # Hashing and probing
//!
//! For every UTF-16 code unit `c` of the key (upper-cased first when the
//! dictionary is case-insensitive) the hash accumulates
//! `result = !(c * 509) + result * 65599` in wrapping 32-bit arithmetic,
//! and the start bucket is `result % bucket_count`. Collisions probe
//! linearly forward with wraparound. Insertion takes the first empty slot;
//! lookup compares actual keys and stops at the first empty slot or after a
//! full lap.
//!
//! # Growth
//!
//! Bucket counts come from [`DICT_BUCKET_SIZES`]. Before each insertion, if
//! `len + 1 >= bucket_count / 8` the table is rehashed into the next prime.
//! Running out of primes is not fatal: insertion continues by probing and
//! only fails with [`DutilError::DatabaseFull`] once every slot is taken.
//!
//! # Examples
//!
//! ```rust
//! use dutil::dict::{DictFlags, StringDict};
//!
//! # fn example() -> dutil::core::Result<()> {
//! let mut seen = StringDict::create_string_list(4, DictFlags::CASE_INSENSITIVE)?;
//! seen.add_key("ProviderA")?;
//! assert!(seen.contains("PROVIDERA"));
//! assert!(!seen.contains("ProviderB"));
//!
//! struct Package {
//!     id: String,
//!     size: u64,
//! }
//!
//! fn package_id(package: &Package) -> &str {
//!     &package.id
//! }
//!
//! let mut packages = vec![Package { id: "core".into(), size: 10 }];
//! let mut by_id = StringDict::create_embedded(1, package_id, DictFlags::empty())?;
//! by_id.add_value(&packages, 0)?;
//!
//! // the backing Vec may move; lookups resolve against the current slice
//! packages.reserve(1024);
//! assert_eq!(by_id.get_value(&packages, "core")?.size, 10);
//! # Ok(())
//! # }
//! ```

use std::num::NonZeroUsize;

use tracing::{debug, warn};

use crate::constants::{DICT_BUCKET_SIZES, DICT_LOAD_FACTOR};
use crate::core::{DutilError, Result};

bitflags::bitflags! {
    /// Behaviour switches for a [`StringDict`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DictFlags: u32 {
        /// Compare and hash keys after invariant upper-casing.
        const CASE_INSENSITIVE = 0x1;
    }
}

/// Storage mode of a [`StringDict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictMode {
    /// Values live in a caller-owned array; keys are read from the values.
    EmbeddedKey,
    /// The dictionary owns copies of its keys and stores no values.
    StringList,
}

enum Storage<T> {
    EmbeddedKey {
        key_of: fn(&T) -> &str,
    },
    StringList {
        keys: Vec<String>,
    },
}

/// Convert an index into the caller's array to the relocatable offset
/// stored in the table. Offsets are 1-based so an empty slot never
/// collides with the first element.
#[must_use]
pub const fn translate_value_to_offset(index: usize) -> NonZeroUsize {
    NonZeroUsize::MIN.saturating_add(index)
}

/// Inverse of [`translate_value_to_offset`].
#[must_use]
pub const fn translate_offset_to_value(offset: NonZeroUsize) -> usize {
    offset.get() - 1
}

/// Bucket index for `key` in a table of `bucket_count` buckets.
///
/// Case-insensitive dictionaries hash the upper-cased key, so
/// `string_hash(s) == string_hash(upper(s))` under
/// [`DictFlags::CASE_INSENSITIVE`].
///
/// # Panics
///
/// Panics if `bucket_count` is zero.
#[must_use]
pub fn string_hash(key: &str, flags: DictFlags, bucket_count: usize) -> usize {
    let fold_case = flags.contains(DictFlags::CASE_INSENSITIVE);
    let mut result: u32 = 0;
    let mut units = [0u16; 2];

    for c in key.chars() {
        let c = if fold_case { fold(c) } else { c };
        for &unit in c.encode_utf16(&mut units).iter() {
            result = (!u32::from(unit).wrapping_mul(509)).wrapping_add(result.wrapping_mul(65599));
        }
    }

    result as usize % bucket_count
}

// Upper-case mappings that expand to several characters keep the original.
pub(crate) fn fold(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Per-character simple upper-casing of `name`; never changes its length.
pub(crate) fn fold_name(name: &str) -> String {
    name.chars().map(fold).collect()
}

fn keys_equal(a: &str, b: &str, flags: DictFlags) -> bool {
    if flags.contains(DictFlags::CASE_INSENSITIVE) {
        a.chars().map(fold).eq(b.chars().map(fold))
    } else {
        a == b
    }
}

fn alloc_buckets(count: usize) -> Result<Vec<Option<NonZeroUsize>>> {
    let mut buckets = Vec::new();
    buckets.try_reserve_exact(count).map_err(|_| DutilError::OutOfMemory)?;
    buckets.resize(count, None);
    Ok(buckets)
}

// First empty bucket on the probe sequence starting at `start`.
fn probe_empty(buckets: &[Option<NonZeroUsize>], start: usize) -> Option<usize> {
    let count = buckets.len();
    let mut index = start;
    loop {
        if buckets[index].is_none() {
            return Some(index);
        }
        index = (index + 1) % count;
        if index == start {
            return None;
        }
    }
}

/// Open-addressing hash table keyed by strings.
///
/// `T` is the caller's value type in embedded-key mode; string-list
/// dictionaries use the default `()`. See the [module docs](self).
pub struct StringDict<T = ()> {
    storage: Storage<T>,
    flags: DictFlags,
    sizes: &'static [u32],
    size_index: usize,
    buckets: Vec<Option<NonZeroUsize>>,
    order: Vec<NonZeroUsize>,
}

impl<T> std::fmt::Debug for StringDict<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringDict")
            .field("mode", &self.mode())
            .field("flags", &self.flags)
            .field("len", &self.len())
            .field("bucket_count", &self.bucket_count())
            .finish()
    }
}

impl<T> StringDict<T> {
    /// Create an embedded-key dictionary.
    ///
    /// `key_of` extracts the key from a value. `expected_items` only picks
    /// the initial bucket count (the smallest table prime of at least eight
    /// times the hint); the dictionary grows past it as needed.
    ///
    /// # Errors
    ///
    /// [`DutilError::OutOfMemory`] if the bucket array cannot be allocated.
    pub fn create_embedded(
        expected_items: usize,
        key_of: fn(&T) -> &str,
        flags: DictFlags,
    ) -> Result<Self> {
        Self::with_bucket_sizes(
            expected_items,
            Storage::EmbeddedKey {
                key_of,
            },
            flags,
            DICT_BUCKET_SIZES,
        )
    }

    fn with_bucket_sizes(
        expected_items: usize,
        storage: Storage<T>,
        flags: DictFlags,
        sizes: &'static [u32],
    ) -> Result<Self> {
        let wanted = expected_items.saturating_mul(DICT_LOAD_FACTOR);
        let size_index = sizes
            .iter()
            .position(|&size| size as usize >= wanted)
            .unwrap_or(sizes.len().saturating_sub(1));
        let bucket_count = sizes
            .get(size_index)
            .copied()
            .ok_or_else(|| DutilError::invalid_argument("bucket size table is empty"))?;

        Ok(Self {
            storage,
            flags,
            sizes,
            size_index,
            buckets: alloc_buckets(bucket_count as usize)?,
            order: Vec::new(),
        })
    }

    /// Storage mode of this dictionary.
    #[must_use]
    pub const fn mode(&self) -> DictMode {
        match self.storage {
            Storage::EmbeddedKey {
                ..
            } => DictMode::EmbeddedKey,
            Storage::StringList {
                ..
            } => DictMode::StringList,
        }
    }

    /// Flags the dictionary was created with.
    #[must_use]
    pub const fn flags(&self) -> DictFlags {
        self.flags
    }

    /// Number of items added.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no items were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Current number of buckets. Always a prime from the size table.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Keys in insertion order. Empty for embedded-key dictionaries, whose
    /// keys live in the caller's values.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let keys: &[String] = match &self.storage {
            Storage::StringList {
                keys,
            } => keys,
            Storage::EmbeddedKey {
                ..
            } => &[],
        };
        keys.iter().map(String::as_str)
    }

    /// Copy `key` into a string-list dictionary.
    ///
    /// # Errors
    ///
    /// - [`DutilError::InvalidArgument`] on an embedded-key dictionary or if
    ///   the key is already present
    /// - [`DutilError::OutOfMemory`] if the copy or a growth step fails to allocate
    /// - [`DutilError::DatabaseFull`] if every slot is taken
    pub fn add_key(&mut self, key: &str) -> Result<()> {
        if self.mode() != DictMode::StringList {
            return Err(DutilError::invalid_argument(
                "add_key requires a string-list dictionary",
            ));
        }
        if self.key_exists(&[], key) {
            return Err(DutilError::invalid_argument(format!(
                "key '{key}' is already in the dictionary"
            )));
        }

        self.prepare_insert(&[])?;

        let mut owned = String::new();
        owned.try_reserve_exact(key.len()).map_err(|_| DutilError::OutOfMemory)?;
        owned.push_str(key);

        let Storage::StringList {
            keys,
        } = &mut self.storage
        else {
            return Err(DutilError::invalid_argument(
                "add_key requires a string-list dictionary",
            ));
        };
        keys.try_reserve(1).map_err(|_| DutilError::OutOfMemory)?;
        keys.push(owned);
        let slot = translate_value_to_offset(keys.len() - 1);

        if let Err(e) = self.insert_slot(slot, &[]) {
            if let Storage::StringList {
                keys,
            } = &mut self.storage
            {
                keys.pop();
            }
            return Err(e);
        }
        Ok(())
    }

    /// Add the value at `values[index]` to an embedded-key dictionary.
    ///
    /// Only the index is stored. Later calls must pass the same logical
    /// array (it may have been reallocated or grown in between).
    ///
    /// # Errors
    ///
    /// - [`DutilError::InvalidArgument`] on a string-list dictionary, for an
    ///   out-of-range index, or if the value's key is already present
    /// - [`DutilError::OutOfMemory`] if a growth step fails to allocate
    /// - [`DutilError::DatabaseFull`] if every slot is taken
    pub fn add_value(&mut self, values: &[T], index: usize) -> Result<()> {
        let key_of = match &self.storage {
            Storage::EmbeddedKey {
                key_of,
            } => *key_of,
            Storage::StringList {
                ..
            } => {
                return Err(DutilError::invalid_argument(
                    "add_value requires an embedded-key dictionary",
                ));
            }
        };
        let value = values.get(index).ok_or_else(|| {
            DutilError::invalid_argument(format!(
                "value index {index} is outside an array of {} items",
                values.len()
            ))
        })?;
        let key = key_of(value);
        if self.find_bucket(values, key)?.is_some() {
            return Err(DutilError::invalid_argument(format!(
                "key '{key}' is already in the dictionary"
            )));
        }

        self.prepare_insert(values)?;
        self.insert_slot(translate_value_to_offset(index), values)
    }

    /// Look up the value stored under `key` in an embedded-key dictionary.
    ///
    /// # Errors
    ///
    /// - [`DutilError::NotFound`] if the key is absent
    /// - [`DutilError::InvalidArgument`] on a string-list dictionary or if
    ///   `values` no longer covers a stored index
    pub fn get_value<'v>(&self, values: &'v [T], key: &str) -> Result<&'v T> {
        let index = self.get_index(values, key)?;
        values.get(index).ok_or_else(|| {
            DutilError::invalid_argument(format!("stale index {index} for key '{key}'"))
        })
    }

    /// Index into `values` of the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Same as [`get_value`](Self::get_value).
    pub fn get_index(&self, values: &[T], key: &str) -> Result<usize> {
        if self.mode() != DictMode::EmbeddedKey {
            return Err(DutilError::invalid_argument(
                "get_value requires an embedded-key dictionary",
            ));
        }
        match self.find_bucket(values, key)? {
            Some(bucket) => Ok(self.buckets[bucket].map_or(0, translate_offset_to_value)),
            None => Err(DutilError::not_found(format!("dictionary key '{key}'"))),
        }
    }

    /// Whether `key` is present. Works in both modes; string-list
    /// dictionaries ignore `values`.
    #[must_use]
    pub fn key_exists(&self, values: &[T], key: &str) -> bool {
        matches!(self.find_bucket(values, key), Ok(Some(_)))
    }

    fn key_at<'a>(&'a self, values: &'a [T], slot: NonZeroUsize) -> Result<&'a str> {
        let index = translate_offset_to_value(slot);
        match &self.storage {
            Storage::StringList {
                keys,
            } => keys.get(index).map(String::as_str),
            Storage::EmbeddedKey {
                key_of,
            } => values.get(index).map(|value| key_of(value)),
        }
        .ok_or_else(|| {
            DutilError::invalid_argument(format!(
                "dictionary refers to index {index} beyond the backing array"
            ))
        })
    }

    fn find_bucket(&self, values: &[T], key: &str) -> Result<Option<usize>> {
        let count = self.buckets.len();
        let start = string_hash(key, self.flags, count);
        let mut index = start;

        loop {
            match self.buckets[index] {
                None => return Ok(None),
                Some(slot) => {
                    if keys_equal(self.key_at(values, slot)?, key, self.flags) {
                        return Ok(Some(index));
                    }
                }
            }
            index = (index + 1) % count;
            if index == start {
                return Ok(None);
            }
        }
    }

    // Grows proactively; a table that cannot grow further keeps probing.
    fn prepare_insert(&mut self, values: &[T]) -> Result<()> {
        if self.order.len() + 1 >= self.bucket_count() / DICT_LOAD_FACTOR {
            match self.grow(values) {
                Ok(()) => {}
                Err(DutilError::DatabaseFull {
                    buckets,
                }) => {
                    warn!(buckets, len = self.len(), "Dictionary cannot grow further, probing");
                }
                Err(e) => return Err(e),
            }
        }
        self.order.try_reserve(1).map_err(|_| DutilError::OutOfMemory)
    }

    fn insert_slot(&mut self, slot: NonZeroUsize, values: &[T]) -> Result<()> {
        let start = string_hash(self.key_at(values, slot)?, self.flags, self.bucket_count());
        let bucket = probe_empty(&self.buckets, start).ok_or(DutilError::DatabaseFull {
            buckets: self.bucket_count(),
        })?;
        self.buckets[bucket] = Some(slot);
        self.order.push(slot);
        Ok(())
    }

    fn grow(&mut self, values: &[T]) -> Result<()> {
        let next = self.size_index + 1;
        let Some(&new_size) = self.sizes.get(next) else {
            return Err(DutilError::DatabaseFull {
                buckets: self.bucket_count(),
            });
        };
        let new_count = new_size as usize;
        let mut buckets = alloc_buckets(new_count)?;

        for &slot in &self.order {
            let start = string_hash(self.key_at(values, slot)?, self.flags, new_count);
            let bucket = probe_empty(&buckets, start).ok_or(DutilError::DatabaseFull {
                buckets: new_count,
            })?;
            buckets[bucket] = Some(slot);
        }

        debug!(from = self.bucket_count(), to = new_count, items = self.len(), "Dictionary grown");
        self.buckets = buckets;
        self.size_index = next;
        Ok(())
    }
}

impl StringDict<()> {
    /// Create an empty string-list dictionary.
    ///
    /// # Errors
    ///
    /// [`DutilError::OutOfMemory`] if the bucket array cannot be allocated.
    pub fn create_string_list(expected_items: usize, flags: DictFlags) -> Result<Self> {
        Self::with_bucket_sizes(
            expected_items,
            Storage::StringList {
                keys: Vec::new(),
            },
            flags,
            DICT_BUCKET_SIZES,
        )
    }

    /// Create a string-list dictionary holding `keys`. Duplicates (under
    /// the dictionary's comparison) are skipped silently.
    pub fn from_array<S: AsRef<str>>(keys: &[S], flags: DictFlags) -> Result<Self> {
        let mut dict = Self::create_string_list(keys.len(), flags)?;
        for key in keys {
            let key = key.as_ref();
            if !dict.contains(key) {
                dict.add_key(key)?;
            }
        }
        Ok(dict)
    }

    /// Whether `key` is in this string-list dictionary.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.key_exists(&[], key)
    }
}
