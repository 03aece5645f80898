//! # Core Module
//!
//! Core configuration shared by the tracker binaries.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial creation with config module

pub mod config;

// Re-export commonly used items
pub use config::{Config, DEFAULT_FALLBACK_TIMEZONE, DEFAULT_REMINDER_TIME};
