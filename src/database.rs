//! # Database
//!
//! SQLite persistence shared by the migration applier and the reminder service.
//! A single connection sits behind an async mutex; clones share it.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.2.0: Added reminder_log queries so a user is reminded at most once per day
//! - 1.1.0: Added user and transaction queries for the daily reminder check
//! - 1.0.0: Initial release with the migration ledger

use crate::features::migrations::MigrationRecord;
use crate::features::reminders::ReminderCandidate;
use anyhow::{Context, Result};
use log::{debug, info};
use sqlite::{Connection, State};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Name of the ledger table recording applied migrations
pub const MIGRATIONS_TABLE: &str = "migrations";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub async fn new(database_path: &str) -> Result<Self> {
        let conn = Connection::open(database_path)
            .with_context(|| format!("Failed to open database at {database_path}"))?;
        conn.execute("PRAGMA foreign_keys = ON;")?;
        info!("Opened database at {database_path}");

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Private in-memory database, used by tests and dry runs
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open(":memory:")
            .context("Failed to open in-memory database")?;
        conn.execute("PRAGMA foreign_keys = ON;")?;

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute one or more `;`-separated statements as a single batch
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(sql)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Migration ledger
    // ---------------------------------------------------------------------

    pub async fn ensure_migrations_table(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(format!(
            "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                executed_at INTEGER NOT NULL
            );"
        ))
        .context("Failed to create migrations ledger table")?;
        Ok(())
    }

    pub async fn executed_migration_ids(&self) -> Result<HashSet<String>> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(format!("SELECT id FROM {MIGRATIONS_TABLE}"))?;

        let mut ids = HashSet::new();
        while let State::Row = statement.next()? {
            ids.insert(statement.read::<String, _>(0)?);
        }
        Ok(ids)
    }

    pub async fn record_migration(&self, id: &str, filename: &str, executed_at: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(format!(
            "INSERT INTO {MIGRATIONS_TABLE} (id, filename, executed_at) VALUES (?, ?, ?)"
        ))?;
        statement.bind((1, id))?;
        statement.bind((2, filename))?;
        statement.bind((3, executed_at))?;
        statement.next()?;

        debug!("Recorded migration {id} ({filename}) in ledger");
        Ok(())
    }

    /// Ledger rows ordered by id
    pub async fn list_migrations(&self) -> Result<Vec<MigrationRecord>> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(format!(
            "SELECT id, filename, executed_at FROM {MIGRATIONS_TABLE} ORDER BY id ASC"
        ))?;

        let mut records = Vec::new();
        while let State::Row = statement.next()? {
            records.push(MigrationRecord {
                id: statement.read::<String, _>(0)?,
                filename: statement.read::<String, _>(1)?,
                executed_at: statement.read::<i64, _>(2)?,
            });
        }
        Ok(records)
    }

    #[cfg(test)]
    pub(crate) async fn count_rows(&self, table: &str) -> Result<i64> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(format!("SELECT COUNT(*) FROM {table}"))?;
        statement.next()?;
        Ok(statement.read::<i64, _>(0)?)
    }

    #[cfg(test)]
    pub(crate) async fn query_strings(&self, sql: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(sql)?;
        let mut values = Vec::new();
        while let State::Row = statement.next()? {
            values.push(statement.read::<String, _>(0)?);
        }
        Ok(values)
    }

    // ---------------------------------------------------------------------
    // Users and transactions
    // ---------------------------------------------------------------------

    #[cfg(test)]
    pub(crate) async fn add_user(&self, name: &str, chat_id: Option<&str>) -> Result<i64> {
        let conn = self.conn.lock().await;
        {
            let mut statement = conn.prepare(
                "INSERT INTO users (name, chat_id, created_at) VALUES (?, ?, strftime('%s','now'))",
            )?;
            statement.bind((1, name))?;
            statement.bind((2, chat_id))?;
            statement.next()?;
        }
        last_insert_id(&conn)
    }

    #[cfg(test)]
    pub(crate) async fn set_reminders_enabled(&self, user_id: i64, enabled: bool) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare("UPDATE users SET reminders_enabled = ? WHERE id = ?")?;
        statement.bind((1, enabled as i64))?;
        statement.bind((2, user_id))?;
        statement.next()?;
        Ok(())
    }

    /// Record a transaction; `amount_cents` is signed by `kind` at read time, not here
    #[cfg(test)]
    pub(crate) async fn add_transaction(
        &self,
        user_id: i64,
        amount_cents: i64,
        kind: &str,
        category: Option<&str>,
        occurred_at: i64,
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        {
            let mut statement = conn.prepare(
                "INSERT INTO transactions (user_id, amount_cents, kind, category, occurred_at, created_at)
                 VALUES (?, ?, ?, ?, ?, strftime('%s','now'))",
            )?;
            statement.bind((1, user_id))?;
            statement.bind((2, amount_cents))?;
            statement.bind((3, kind))?;
            statement.bind((4, category))?;
            statement.bind((5, occurred_at))?;
            statement.next()?;
        }
        last_insert_id(&conn)
    }

    /// Users with a linked messaging chat who have not switched reminders off
    pub async fn reminder_candidates(&self) -> Result<Vec<ReminderCandidate>> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(
            "SELECT id, name, chat_id FROM users
             WHERE chat_id IS NOT NULL AND chat_id != '' AND reminders_enabled = 1
             ORDER BY id ASC",
        )?;

        let mut candidates = Vec::new();
        while let State::Row = statement.next()? {
            candidates.push(ReminderCandidate {
                user_id: statement.read::<i64, _>(0)?,
                name: statement.read::<String, _>(1)?,
                chat_id: statement.read::<String, _>(2)?,
            });
        }
        Ok(candidates)
    }

    /// Count a user's transactions with `start <= occurred_at < end` (unix seconds)
    pub async fn count_transactions_between(&self, user_id: i64, start: i64, end: i64) -> Result<i64> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(
            "SELECT COUNT(*) FROM transactions
             WHERE user_id = ? AND occurred_at >= ? AND occurred_at < ?",
        )?;
        statement.bind((1, user_id))?;
        statement.bind((2, start))?;
        statement.bind((3, end))?;
        statement.next()?;
        Ok(statement.read::<i64, _>(0)?)
    }

    // ---------------------------------------------------------------------
    // Reminder log
    // ---------------------------------------------------------------------

    pub async fn reminder_sent_on(&self, user_id: i64, local_date: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(
            "SELECT COUNT(*) FROM reminder_log WHERE user_id = ? AND reminder_date = ?",
        )?;
        statement.bind((1, user_id))?;
        statement.bind((2, local_date))?;
        statement.next()?;
        Ok(statement.read::<i64, _>(0)? > 0)
    }

    pub async fn record_reminder_sent(&self, user_id: i64, local_date: &str, sent_at: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(
            "INSERT OR IGNORE INTO reminder_log (user_id, reminder_date, sent_at) VALUES (?, ?, ?)",
        )?;
        statement.bind((1, user_id))?;
        statement.bind((2, local_date))?;
        statement.bind((3, sent_at))?;
        statement.next()?;
        Ok(())
    }
}

#[cfg(test)]
fn last_insert_id(conn: &Connection) -> Result<i64> {
    let mut statement = conn.prepare("SELECT last_insert_rowid()")?;
    statement.next()?;
    Ok(statement.read::<i64, _>(0)?)
}
