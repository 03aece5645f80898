//! # Finance Tracker
//!
//! Process entry point: applies pending migrations, then keeps the daily
//! reminder scheduler armed until Ctrl-C.
//!
//! Usage: `cargo run --bin tracker`

use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use finance_tracker::core::Config;
use finance_tracker::database::Database;
use finance_tracker::features::migrations::MigrationRunner;
use finance_tracker::features::reminders::{
    DailySchedule, LogNotificationSink, ReminderScheduler, TransactionReminderService,
};
use finance_tracker::features::{get_app_version, get_features};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Finance Tracker v{}...", get_app_version());
    for feature in get_features() {
        info!("  {} v{}", feature.name, feature.version);
    }

    let database = Database::new(&config.database_path).await?;

    // Schema must be current before anything reads from the store
    let runner = MigrationRunner::new(database.clone(), &config.migrations_dir);
    match runner.apply_pending().await {
        Ok(applied) => info!("Migrations complete ({applied} applied)"),
        Err(e) => {
            error!("❌ Migration failed: {e:#}");
            error!("Fix the failing migration and restart; nothing after it was applied.");
            return Err(e);
        }
    }

    let schedule = DailySchedule::from_config(&config)?;
    let service = TransactionReminderService::new(
        database.clone(),
        Arc::new(LogNotificationSink),
        schedule.clone(),
    );

    let mut scheduler = ReminderScheduler::new(Arc::new(service), schedule);
    if config.development {
        scheduler = scheduler.with_dev_trigger(config.dev_trigger_delay);
    }
    scheduler.start().await;

    info!("Finance Tracker running. Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    scheduler.stop().await;

    Ok(())
}
