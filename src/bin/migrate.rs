//! # Migration CLI
//!
//! Operator commands for the migrations ledger.
//!
//! Usage:
//! - `cargo run --bin migrate` or `migrate up` applies pending migrations
//! - `migrate status [--json]` prints total / executed / pending
//! - `migrate rollback [N]` lists the last N migrations that would be rolled back (default 1)

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use finance_tracker::core::Config;
use finance_tracker::database::Database;
use finance_tracker::features::migrations::MigrationRunner;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("up");

    let database = Database::new(&config.database_path).await?;
    let runner = MigrationRunner::new(database, &config.migrations_dir);

    match command {
        "up" => {
            let applied = runner.apply_pending().await?;
            println!("Applied {applied} migration(s)");
        }
        "status" => {
            let status = runner.status().await?;
            if args.iter().any(|a| a == "--json") {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Migrations in {}", runner.migrations_dir().display());
                println!("  Total:    {}", status.total);
                println!("  Executed: {}", status.executed);
                println!("  Pending:  {}", status.pending);
                for filename in &status.pending_files {
                    println!("    - {filename}");
                }
            }
        }
        "rollback" => {
            let steps = match args.get(1) {
                Some(raw) => raw
                    .parse::<usize>()
                    .with_context(|| format!("Invalid rollback count: {raw}"))?,
                None => 1,
            };
            let records = runner.rollback(steps).await?;
            if records.is_empty() {
                println!("Nothing to roll back");
            } else {
                println!("Rollback is not supported. These migrations would be rolled back:");
                for record in &records {
                    println!("  - {} (id {})", record.filename, record.id);
                }
                println!("The ledger was not changed.");
            }
        }
        other => {
            anyhow::bail!("Unknown command '{}'. Expected up, status or rollback", other);
        }
    }

    Ok(())
}
