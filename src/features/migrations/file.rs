//! Migration files and ledger records

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension marking a file as an executable migration
pub const MIGRATION_EXTENSION: &str = "sql";

/// One applied migration as stored in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: String,
    pub filename: String,
    /// Unix seconds
    pub executed_at: i64,
}

/// A migration file on disk. Never mutated once authored.
#[derive(Debug, Clone)]
pub struct MigrationFile {
    pub id: String,
    pub filename: String,
    pub path: PathBuf,
}

impl MigrationFile {
    pub fn from_path(path: &Path) -> Option<Self> {
        let filename = path.file_name()?.to_str()?.to_string();
        Some(MigrationFile {
            id: extract_migration_id(&filename),
            filename,
            path: path.to_path_buf(),
        })
    }

    pub fn is_migration(path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case(MIGRATION_EXTENSION))
                .unwrap_or(false)
    }

    /// Read the file and return the statements to execute as one batch
    pub fn load_sql(&self) -> Result<String> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read migration {}", self.path.display()))?;
        Ok(strip_comments(&raw))
    }

    /// Numeric value of the id, if it is a numeric prefix
    pub fn numeric_id(&self) -> Option<u64> {
        if self.id.chars().all(|c| c.is_ascii_digit()) {
            self.id.parse().ok()
        } else {
            None
        }
    }
}

/// Leading numeric prefix up to the first underscore, else the whole filename
///
/// `001_init.sql` -> `001`, `init.sql` -> `init.sql`, `v2_add.sql` -> `v2_add.sql`
pub fn extract_migration_id(filename: &str) -> String {
    match filename.split_once('_') {
        Some((prefix, _)) if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) => {
            prefix.to_string()
        }
        _ => filename.to_string(),
    }
}

/// Drop `--` comment lines and blank lines, keep everything else in order
pub fn strip_comments(sql: &str) -> String {
    sql.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with("--")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_migration_id() {
        assert_eq!(extract_migration_id("001_init.sql"), "001");
        assert_eq!(extract_migration_id("010_add_budget_table.sql"), "010");
        assert_eq!(extract_migration_id("20240101_seed.sql"), "20240101");
    }

    #[test]
    fn test_extract_migration_id_fallback() {
        assert_eq!(extract_migration_id("init.sql"), "init.sql");
        assert_eq!(extract_migration_id("v2_add.sql"), "v2_add.sql");
        assert_eq!(extract_migration_id("_leading.sql"), "_leading.sql");
        assert_eq!(extract_migration_id("001.sql"), "001.sql");
    }

    #[test]
    fn test_strip_comments() {
        let sql = "-- create users\n\nCREATE TABLE users (id INTEGER);\n   -- indented comment\nINSERT INTO users VALUES (1); -- trailing stays\n\n";
        assert_eq!(
            strip_comments(sql),
            "CREATE TABLE users (id INTEGER);\nINSERT INTO users VALUES (1); -- trailing stays"
        );
    }

    #[test]
    fn test_strip_comments_only_comments() {
        assert_eq!(strip_comments("-- nothing here\n\n--\n"), "");
    }

    #[test]
    fn test_numeric_id() {
        let file = MigrationFile::from_path(Path::new("/tmp/007_x.sql")).unwrap();
        assert_eq!(file.id, "007");
        assert_eq!(file.numeric_id(), Some(7));

        let file = MigrationFile::from_path(Path::new("/tmp/seed.sql")).unwrap();
        assert_eq!(file.numeric_id(), None);
    }
}
