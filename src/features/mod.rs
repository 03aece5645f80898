//! # Features
//!
//! Feature modules and the version registry logged at startup.

pub mod migrations;
pub mod reminders;

pub use migrations::{MigrationRunner, MigrationStatus};
pub use reminders::{ReminderScheduler, TransactionReminderService};

/// A feature and its current version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub id: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub toggleable: bool,
}

pub fn get_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Keep in sync with the version headers of each feature module
pub fn get_features() -> Vec<Feature> {
    vec![
        Feature {
            id: "migrations",
            name: "Schema Migrations",
            version: "1.1.0",
            toggleable: false,
        },
        Feature {
            id: "reminders",
            name: "Daily Transaction Reminders",
            version: "1.2.0",
            toggleable: true,
        },
    ]
}
