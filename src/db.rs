//! SQLite connection pooling for the lecture database.
//!
//! WAL journaling so `lct serve` and CLI invocations can share the same
//! database file, and foreign keys on so chunk rows cannot outlive their
//! lecture.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::DbConfig;

/// Open the lecture database at `[db].path`, creating the file and any
/// missing parent directories on first use.
pub async fn connect(db: &DbConfig) -> Result<SqlitePool> {
    if let Some(parent) = db.path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db.path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database: {}", db.path.display()))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let db = DbConfig {
            path: tmp.path().join("nested").join("data").join("lectern.sqlite"),
        };

        let pool = connect(&db).await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();

        assert!(tmp.path().join("nested").join("data").exists());
        pool.close().await;
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let tmp = TempDir::new().unwrap();
        let db = DbConfig {
            path: tmp.path().join("lectern.sqlite"),
        };
        let pool = connect(&db).await.unwrap();
        crate::migrate::create_schema(&pool).await.unwrap();

        // A chunk without its lecture row must be rejected
        let result = sqlx::query(
            "INSERT INTO lecture_chunks (lecture_id, chunk_index, text) VALUES ('ghost', 0, 'x')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
        pool.close().await;
    }
}
