//! Library lifecycle.
//!
//! [`LibraryContext`] replaces process-wide initialisation state: it owns the
//! registry backend, counts nested `initialize`/`uninitialize` calls and only
//! hands out [`DependencyStore`]s while initialised. Independent contexts can
//! coexist, which is what the tests rely on.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use super::{DutilError, Result};
use crate::dependency::DependencyStore;
use crate::registry::{RegistryBackend, RegistryRoot};

/// Reference-counted owner of a registry backend.
#[derive(Debug)]
pub struct LibraryContext {
    registry: Box<dyn RegistryBackend + Send + Sync>,
    init_count: AtomicUsize,
}

impl LibraryContext {
    /// Wrap `registry`. The context starts uninitialised.
    pub fn new(registry: impl RegistryBackend + Send + Sync + 'static) -> Self {
        Self {
            registry: Box::new(registry),
            init_count: AtomicUsize::new(0),
        }
    }

    /// Take a reference on the library. Returns the new count.
    pub fn initialize(&self) -> usize {
        let count = self.init_count.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(count, "Library initialized");
        count
    }

    /// Release a reference. Extra calls are ignored. Returns the remaining count.
    pub fn uninitialize(&self) -> usize {
        let previous = self
            .init_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .unwrap_or(0);
        let count = previous.saturating_sub(1);
        debug!(count, "Library uninitialized");
        count
    }

    /// Whether at least one `initialize` is outstanding.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.init_count.load(Ordering::Acquire) > 0
    }

    /// The backend this context owns.
    #[must_use]
    pub fn registry(&self) -> &dyn RegistryBackend {
        self.registry.as_ref()
    }

    /// A dependency store over `root`.
    ///
    /// # Errors
    ///
    /// [`DutilError::InvalidArgument`] if the context is not initialised.
    pub fn store(&self, root: RegistryRoot) -> Result<DependencyStore<'_>> {
        if !self.is_initialized() {
            return Err(DutilError::invalid_argument("library context is not initialized"));
        }
        Ok(DependencyStore::new(self.registry(), root))
    }
}
