//! # Feature: Schema Migrations
//!
//! Applies versioned `*.sql` files from a directory exactly once each, in filename
//! order, and records every success in the `migrations` ledger table.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Refuse to run when zero-padding makes filename order disagree with id order
//! - 1.0.0: Initial release with apply, status and logged-only rollback

pub mod file;
pub mod runner;

pub use file::{extract_migration_id, MigrationFile, MigrationRecord};
pub use runner::{MigrationRunner, MigrationStatus};
