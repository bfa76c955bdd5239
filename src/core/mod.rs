//! Core types shared by every dutil layer
//!
//! - [`error`] - [`DutilError`], the crate [`Result`] alias and user-facing
//!   [`ErrorContext`] rendering
//! - [`context`] - [`LibraryContext`], the explicit init/shutdown lifecycle that
//!   owns the registry backend and hands out dependency stores
//!
//! # Examples
//!
//! ```rust
//! use dutil::core::{DutilError, LibraryContext};
//! use dutil::registry::{MemoryRegistry, RegistryRoot};
//!
//! # fn example() -> dutil::core::Result<()> {
//! let context = LibraryContext::new(MemoryRegistry::new());
//! assert!(matches!(
//!     context.store(RegistryRoot::LocalMachine),
//!     Err(DutilError::InvalidArgument { .. })
//! ));
//!
//! context.initialize();
//! let store = context.store(RegistryRoot::LocalMachine)?;
//! assert!(!store.provider_exists("ProviderA")?);
//! context.uninitialize();
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;

pub use context::LibraryContext;
pub use error::{DutilError, ErrorContext, Result, user_friendly_error};
