//! Migration runner
//!
//! Lists `*.sql` files, sorts them by filename (plain string order, so ids must be
//! zero-padded), and applies the ones whose id is missing from the ledger.
//! The first failing file stops the run; nothing after it is attempted.

use super::file::{MigrationFile, MigrationRecord};
use crate::database::Database;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Read-only snapshot of how far the store is migrated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub total: usize,
    pub executed: usize,
    pub pending: usize,
    pub pending_files: Vec<String>,
}

pub struct MigrationRunner {
    database: Database,
    migrations_dir: PathBuf,
}

impl MigrationRunner {
    pub fn new(database: Database, migrations_dir: impl Into<PathBuf>) -> Self {
        MigrationRunner {
            database,
            migrations_dir: migrations_dir.into(),
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// All migration files in the directory, in lexical filename order
    pub fn discover(&self) -> Result<Vec<MigrationFile>> {
        let entries = std::fs::read_dir(&self.migrations_dir).with_context(|| {
            format!(
                "Failed to read migrations directory {}",
                self.migrations_dir.display()
            )
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !MigrationFile::is_migration(&path) {
                continue;
            }
            match MigrationFile::from_path(&path) {
                Some(file) => files.push(file),
                None => warn!("Skipping migration with non UTF-8 name: {}", path.display()),
            }
        }

        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    /// Apply every pending migration in order. Returns how many were applied.
    pub async fn apply_pending(&self) -> Result<usize> {
        self.database.ensure_migrations_table().await?;

        let files = self.discover()?;
        check_ordering(&files)?;

        let executed = self.database.executed_migration_ids().await?;
        warn_unknown_ledger_ids(&files, &executed);

        let pending: Vec<&MigrationFile> = files
            .iter()
            .filter(|file| !executed.contains(&file.id))
            .collect();

        if pending.is_empty() {
            info!("Database schema is up to date ({} migrations)", files.len());
            return Ok(0);
        }

        info!("Applying {} pending migration(s)", pending.len());

        let mut applied = 0;
        for file in pending {
            let sql = file.load_sql()?;

            if sql.is_empty() {
                debug!("Migration {} has no statements", file.filename);
            } else {
                self.database
                    .execute_batch(&sql)
                    .await
                    .with_context(|| format!("Migration {} failed", file.filename))?;
            }

            self.database
                .record_migration(&file.id, &file.filename, chrono::Utc::now().timestamp())
                .await
                .with_context(|| format!("Failed to record migration {} in ledger", file.filename))?;

            info!("✅ Applied migration {}", file.filename);
            applied += 1;
        }

        info!("Applied {applied} migration(s)");
        Ok(applied)
    }

    /// Count total, executed and pending files. Never writes ledger rows.
    pub async fn status(&self) -> Result<MigrationStatus> {
        self.database.ensure_migrations_table().await?;

        let files = self.discover()?;
        let executed = self.database.executed_migration_ids().await?;

        let pending_files: Vec<String> = files
            .iter()
            .filter(|file| !executed.contains(&file.id))
            .map(|file| file.filename.clone())
            .collect();

        Ok(MigrationStatus {
            total: files.len(),
            executed: files.len() - pending_files.len(),
            pending: pending_files.len(),
            pending_files,
        })
    }

    pub async fn list_applied(&self) -> Result<Vec<MigrationRecord>> {
        self.database.ensure_migrations_table().await?;
        self.database.list_migrations().await
    }

    /// Report the last `steps` applied migrations, newest first.
    ///
    /// Rolling back is not supported: nothing is executed and the ledger is left as is.
    pub async fn rollback(&self, steps: usize) -> Result<Vec<MigrationRecord>> {
        let mut applied = self.list_applied().await?;
        applied.reverse();
        applied.truncate(steps);

        if applied.is_empty() {
            info!("No applied migrations to roll back");
            return Ok(applied);
        }

        warn!("Rollback is not supported; the following migrations would be rolled back:");
        for record in &applied {
            warn!("  ↩ {} ({})", record.filename, record.id);
        }

        Ok(applied)
    }
}

/// Reject directories where filename order would apply ids out of numeric order,
/// or where two files share an id.
fn check_ordering(files: &[MigrationFile]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for file in files {
        if !seen.insert(file.id.as_str()) {
            anyhow::bail!(
                "Duplicate migration id {} (file {})",
                file.id,
                file.filename
            );
        }
    }

    let mut previous: Option<(&MigrationFile, u64)> = None;
    for file in files {
        let Some(current) = file.numeric_id() else {
            continue;
        };
        if let Some((prev_file, prev)) = previous {
            if current < prev {
                anyhow::bail!(
                    "Migration {} sorts after {} but has a lower id; zero-pad migration ids to a fixed width",
                    file.filename,
                    prev_file.filename
                );
            }
            if current == prev {
                anyhow::bail!(
                    "Migrations {} and {} share numeric id {}; zero-pad migration ids to a fixed width",
                    prev_file.filename,
                    file.filename,
                    current
                );
            }
        }
        previous = Some((file, current));
    }

    Ok(())
}

fn warn_unknown_ledger_ids(files: &[MigrationFile], executed: &HashSet<String>) {
    let known: HashSet<&str> = files.iter().map(|f| f.id.as_str()).collect();
    for id in executed {
        if !known.contains(id.as_str()) {
            warn!("Ledger contains migration {id} which is not present in the migrations directory");
        }
    }
}
