//! Global constants used throughout the dutil codebase.
//!
//! Registry layout names, dependency attribute bits, the dictionary prime
//! table and lock timing parameters live here so the persisted layout is
//! defined in exactly one place.

use std::time::Duration;

/// Registry path (relative to the hive root) under which every provider key lives.
pub const DEPENDENCY_REGISTRY_ROOT: &str = r"Software\Classes\Installer\Dependencies";

/// Sub-key of a provider key holding one child key per registered dependent.
pub const DEPENDENTS_KEY: &str = "Dependents";

/// Value name of the provider id. The empty name is the key's default value.
pub const ID_VALUE: &str = "";

/// Value name holding the provider's four-part version string.
pub const VERSION_VALUE: &str = "Version";

/// Value name holding the provider's display name.
pub const DISPLAY_NAME_VALUE: &str = "DisplayName";

/// Value name holding the attribute bitmask for providers and dependents.
pub const ATTRIBUTES_VALUE: &str = "Attributes";

/// Value name of a dependent's minimum acceptable provider version.
pub const MIN_VERSION_VALUE: &str = "MinVersion";

/// Value name of a dependent's maximum acceptable provider version.
pub const MAX_VERSION_VALUE: &str = "MaxVersion";

/// Ascending table of prime bucket counts used by the string dictionary.
///
/// A dictionary always holds one of these as its bucket count and grows by
/// moving to the next entry.
pub const DICT_BUCKET_SIZES: &[u32] = &[
    503, 2017, 7937, 32779, 131111, 524341, 2097709, 8390857, 33563437, 134253719, 537014927,
    2148059509,
];

/// Multiplier applied to the expected item count when sizing a new dictionary,
/// and the occupancy divisor that triggers growth.
pub const DICT_LOAD_FACTOR: usize = 8;

/// Default timeout for acquiring the hive file lock.
pub fn default_lock_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Maximum backoff delay while waiting for the hive lock (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting backoff delay while waiting for the hive lock (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "DUTIL_CONFIG";
