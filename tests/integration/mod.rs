//! Integration test suite for dutil
//!
//! End-to-end scenarios against a persistent hive file, through both the
//! library API and the `dutil` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **lifecycle**: install/uninstall sequences over a `FileHive`
//! - **concurrency**: several threads and hive instances sharing one file
//! - **cli**: the `dutil` binary, exit codes and output formats

mod cli;
mod concurrency;
mod lifecycle;
