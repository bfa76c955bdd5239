//! Test utilities for dutil
//!
//! Shared by unit tests and, through the `test-utils` feature, by the
//! integration tests:
//! - [`init_test_logging`] - one-time tracing setup that respects `RUST_LOG`
//! - [`TestHive`] - a [`FileHive`] inside its own temporary directory
//! - [`seed_bundle`] - a small provider/dependent graph for scenario tests
//!
//! # Example
//!
//! ```rust,no_run
//! use dutil::registry::{MemoryRegistry, RegistryRoot};
//! use dutil::test_utils::{init_test_logging, seed_bundle};
//!
//! init_test_logging(None);
//! let registry = MemoryRegistry::new();
//! let store = seed_bundle(&registry, RegistryRoot::LocalMachine).unwrap();
//! assert!(store.dependent_exists("Runtime", "AppOne").unwrap());
//! ```

use std::path::Path;
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::core::Result;
use crate::dependency::{DependencyAttributes, DependencyStore};
use crate::registry::{FileHive, RegistryBackend, RegistryRoot};

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging
/// stays off.
///
/// ```bash
/// RUST_LOG=dutil=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A hive file in a temporary directory that is removed on drop.
pub struct TestHive {
    temp_dir: TempDir,
    /// The hive under test
    pub hive: FileHive,
}

impl TestHive {
    /// Create an empty hive at `<tmp>/registry.json`.
    ///
    /// # Panics
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let hive = FileHive::new(temp_dir.path().join("registry.json"));
        Self {
            temp_dir,
            hive,
        }
    }

    /// The temporary directory holding the hive.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Location of the hive file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.hive.path()
    }

    /// Store over this hive.
    #[must_use]
    pub fn store(&self, root: RegistryRoot) -> DependencyStore<'_> {
        DependencyStore::new(&self.hive, root)
    }
}

impl Default for TestHive {
    fn default() -> Self {
        Self::new()
    }
}

/// Register a small graph under `root`:
///
/// - `Runtime` 4.8 ("Shared Runtime") with dependents `AppOne` (min 4.0
///   inclusive) and `AppTwo` (max 5.0)
/// - `AppOne` 1.0 ("Application One"), itself a provider
/// - `Legacy`, an orphaned key holding only a dependent
pub fn seed_bundle(
    registry: &dyn RegistryBackend,
    root: RegistryRoot,
) -> Result<DependencyStore<'_>> {
    let store = DependencyStore::new(registry, root);
    let none = DependencyAttributes::empty();

    store.register_dependency("Runtime", "4.8", "Shared Runtime", Some("{RUNTIME}"), none)?;
    store.register_dependency("AppOne", "1.0", "Application One", None, none)?;
    store.register_dependent(
        "Runtime",
        "AppOne",
        Some("4.0"),
        None,
        DependencyAttributes::MIN_VERSION_INCLUSIVE,
    )?;
    store.register_dependent("Runtime", "AppTwo", None, Some("5.0"), none)?;
    store.register_dependent("Legacy", "AppTwo", None, None, none)?;

    Ok(store)
}
