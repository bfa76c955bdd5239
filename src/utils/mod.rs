//! File system helpers shared by the persistent hive and the configuration layer.
//!
//! # Modules
//!
//! - [`fs`] - Atomic writes and cross-process file locks

pub mod fs;

pub use fs::{FileLock, atomic_write, ensure_dir};
