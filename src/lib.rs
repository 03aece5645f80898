// Core layer - configuration
pub mod core;

// Features layer - migrations and reminders
pub mod features;

// Infrastructure
pub mod database;

// Re-export core config for convenience
pub use crate::core::Config;
pub use database::Database;

pub use features::{
    get_app_version, get_features,
    // Migrations
    MigrationRunner, MigrationStatus,
    // Reminders
    ReminderScheduler, TransactionReminderService,
};
