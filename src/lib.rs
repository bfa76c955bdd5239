//! dutil - dependency registration for installers
//!
//! Installers use dutil to record which packages *provide* a shared
//! dependency and which packages *depend* on it, so that removing a package
//! still in use can be refused and the last dependent to leave cleans up
//! after itself. All state lives in a registry-shaped key/value store, never
//! in process memory, so it survives across installer runs and crashes.
//!
//! # Architecture Overview
//!
//! Leaves first:
//!
//! - [`dict`] - open-addressing string dictionary (membership sets and
//!   index-based maps over caller-owned arrays)
//! - [`version`] - four-part dotted versions packed into 64 bits
//! - [`registry`] - the registry contract, an RAII key handle and two
//!   backends (in-memory and a persistent JSON hive)
//! - [`dependency`] - the provider/dependent reference-counting protocol
//!
//! ## Supporting Modules
//! - [`core`] - error type, user-facing error rendering and [`core::LibraryContext`]
//! - [`config`] - `~/.dutil/config.toml`
//! - [`cli`] - the `dutil` command-line front end
//! - [`constants`] - registry layout names and tuning constants
//! - [`utils`] - atomic writes and file locking
//!
//! # Registry layout
//!
//! ```text
//! HKLM|HKCU\Software\Classes\Installer\Dependencies\<ProviderKey>
//!     (Default)   = <Id>
//!     Version     = <major.minor.build.revision>
//!     DisplayName = <string>
//!     Attributes  = <DWORD, absent when 0>
//!     \Dependents\<DependentProviderKey>
//!         MinVersion / MaxVersion / Attributes
//! ```
//!
//! # Example
//!
//! ```rust
//! use dutil::core::LibraryContext;
//! use dutil::dependency::{DependencyAttributes, DependencyList};
//! use dutil::registry::{MemoryRegistry, RegistryRoot};
//!
//! # fn example() -> dutil::core::Result<()> {
//! let context = LibraryContext::new(MemoryRegistry::new());
//! context.initialize();
//! let store = context.store(RegistryRoot::LocalMachine)?;
//!
//! store.register_dependency("ProviderA", "2.5.0.0", "Package A", None, DependencyAttributes::empty())?;
//! store.register_dependent("ProviderA", "ProviderB", Some("2.0.0.0"), None,
//!     DependencyAttributes::MIN_VERSION_INCLUSIVE)?;
//!
//! // ProviderA cannot be removed while ProviderB depends on it
//! let mut remaining = DependencyList::new();
//! store.check_dependents("ProviderA", None, &mut remaining)?;
//! assert_eq!(remaining.len(), 1);
//!
//! store.unregister_dependent("ProviderA", "ProviderB")?;
//! context.uninitialize();
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod dependency;
pub mod dict;
pub mod registry;
pub mod utils;
pub mod version;

// test_utils is available for unit tests and integration tests (via the test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
