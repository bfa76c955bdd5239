//! Error handling for dutil
//!
//! This module provides the error type shared by the dictionary, registry and
//! dependency layers, plus user-friendly reporting for the `dutil` binary.
//!
//! # Architecture
//!
//! - [`DutilError`] - Enumerated error types for all failure cases in dutil
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # The NotFound channel
//!
//! [`DutilError::NotFound`] is deliberately overloaded. The registry layer
//! normalizes every "key or value is absent" condition to it, and the
//! dependency checks use it to report a missing or version-mismatched
//! provider after appending a record to the caller's result list. Callers
//! sweeping many providers test [`DutilError::is_not_found`] and keep going;
//! every other variant is a genuine fault and should abort the sweep.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dutil::core::{DutilError, ErrorContext, user_friendly_error};
//!
//! let error = DutilError::CorruptStore {
//!     key: "ProviderA".to_string(),
//!     reason: "provider key is missing".to_string(),
//! };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Result type used by the library layers.
pub type Result<T> = std::result::Result<T, DutilError>;

/// The main error type for dutil operations
///
/// # Error Categories
///
/// ## Lookup
/// - [`NotFound`] - Registry key or value absent, or a dependency check failed
///
/// ## Caller mistakes
/// - [`InvalidArgument`] - Wrong dictionary mode, empty key, malformed handle use
/// - [`InvalidVersion`] - Version string is not a four-part dotted version
///
/// ## Capacity
/// - [`OutOfMemory`] - An allocation failed while growing or copying
/// - [`DatabaseFull`] - The string dictionary exhausted growth and probing
///
/// ## Storage
/// - [`CorruptStore`] - Registry state contradicts an operation's precondition
/// - [`HiveError`] - The persistent hive file could not be read, parsed or written
/// - [`IoError`] - Standard I/O errors from [`std::io::Error`]
/// - [`ConfigError`] - Configuration file issues
///
/// [`NotFound`]: DutilError::NotFound
/// [`InvalidArgument`]: DutilError::InvalidArgument
/// [`InvalidVersion`]: DutilError::InvalidVersion
/// [`OutOfMemory`]: DutilError::OutOfMemory
/// [`DatabaseFull`]: DutilError::DatabaseFull
/// [`CorruptStore`]: DutilError::CorruptStore
/// [`HiveError`]: DutilError::HiveError
/// [`IoError`]: DutilError::IoError
/// [`ConfigError`]: DutilError::ConfigError
#[derive(Error, Debug)]
pub enum DutilError {
    /// A registry key or value does not exist, or a dependency check failed.
    ///
    /// # Fields
    /// - `item`: What was looked up (a key path, a value name or a provider key)
    #[error("Not found: {item}")]
    NotFound {
        /// Description of the missing item
        item: String,
    },

    /// A required argument was missing or used in the wrong mode.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected
        reason: String,
    },

    /// An allocation failed.
    #[error("Out of memory")]
    OutOfMemory,

    /// The string dictionary can neither grow nor find a free slot.
    #[error("Dictionary is full ({buckets} buckets)")]
    DatabaseFull {
        /// Bucket count of the exhausted table
        buckets: usize,
    },

    /// The dependency registration state is inconsistent.
    ///
    /// Raised when checking dependents of a provider whose key is missing;
    /// such a provider should have been verified by an earlier dependency check.
    #[error("Dependency store is corrupt at '{key}': {reason}")]
    CorruptStore {
        /// Provider key at which the inconsistency was detected
        key: String,
        /// Description of the inconsistency
        reason: String,
    },

    /// A version string could not be parsed.
    #[error("Invalid version: {version}")]
    InvalidVersion {
        /// The rejected version text
        version: String,
    },

    /// The persistent hive file is unusable.
    #[error("Registry hive error at {path}: {reason}")]
    HiveError {
        /// Location of the hive file
        path: String,
        /// What went wrong
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl DutilError {
    /// Build a [`DutilError::NotFound`] for the given item.
    pub fn not_found(item: impl Into<String>) -> Self {
        Self::NotFound {
            item: item.into(),
        }
    }

    /// Build a [`DutilError::InvalidArgument`] with the given reason.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Whether this error is the soft "not found" outcome.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Clone for DutilError {
    fn clone(&self) -> Self {
        match self {
            Self::NotFound {
                item,
            } => Self::NotFound {
                item: item.clone(),
            },
            Self::InvalidArgument {
                reason,
            } => Self::InvalidArgument {
                reason: reason.clone(),
            },
            Self::OutOfMemory => Self::OutOfMemory,
            Self::DatabaseFull {
                buckets,
            } => Self::DatabaseFull {
                buckets: *buckets,
            },
            Self::CorruptStore {
                key,
                reason,
            } => Self::CorruptStore {
                key: key.clone(),
                reason: reason.clone(),
            },
            Self::InvalidVersion {
                version,
            } => Self::InvalidVersion {
                version: version.clone(),
            },
            Self::HiveError {
                path,
                reason,
            } => Self::HiveError {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // io::Error is not Clone; keep the kind and message
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// Pairs a [`DutilError`] with an optional suggestion and optional details,
/// rendered in colour by [`ErrorContext::display`].
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying dutil error
    pub error: DutilError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: DutilError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach additional details about the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colours.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for terminal output.
///
/// [`DutilError`]s anywhere in the chain get tailored suggestions; I/O
/// permission problems are mapped to an elevation hint; anything else is
/// reported with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(dutil_error) = error.chain().find_map(|e| e.downcast_ref::<DutilError>()) {
        let mut ctx = create_error_context(dutil_error.clone());
        if ctx.details.is_none() && error.chain().count() > 1 {
            ctx.details = Some(error.to_string());
        }
        return ctx;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(DutilError::IoError(std::io::Error::new(
            io_error.kind(),
            io_error.to_string(),
        )))
        .with_suggestion(
            "Per-machine registrations need elevated permissions; retry as Administrator or use --user",
        );
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(DutilError::Other {
        message,
    })
}

fn create_error_context(error: DutilError) -> ErrorContext {
    match &error {
        DutilError::NotFound {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Check the provider key spelling and whether it was registered per-user (--user) or per-machine",
        ),
        DutilError::CorruptStore {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Re-register the provider, or unregister its dependents explicitly")
            .with_details(
                "Dependents can only be listed for a provider whose registration still exists",
            ),
        DutilError::InvalidVersion {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Use a dotted version with up to four numeric parts, e.g. 1.2.3.4")
            .with_details("Each part must be between 0 and 65535"),
        DutilError::HiveError {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Check that the hive file is valid JSON and not held open by another process",
        ),
        DutilError::ConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the TOML syntax of the dutil configuration file"),
        DutilError::DatabaseFull {
            ..
        } => ErrorContext::new(error)
            .with_details("The dictionary reached its largest bucket table and every slot is used"),
        _ => ErrorContext::new(error),
    }
}
