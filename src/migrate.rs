use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db).await?;

    create_schema(&pool).await?;
    seed_admin_user(&pool).await?;

    pool.close().await;
    Ok(())
}

pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            username TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'student',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subjects (
            name TEXT PRIMARY KEY
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lectures (
            lecture_id TEXT PRIMARY KEY,
            subject_name TEXT NOT NULL,
            title TEXT NOT NULL,
            original_filename TEXT NOT NULL,
            uploaded_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lecture_chunks (
            lecture_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            PRIMARY KEY (lecture_id, chunk_index),
            FOREIGN KEY (lecture_id) REFERENCES lectures(lecture_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS summaries (
            lecture_id TEXT NOT NULL,
            target_words INTEGER NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (lecture_id, target_words)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_lectures_subject ON lectures(subject_name)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the default `admin` account on first init, matching the seed the
/// service has always shipped with. The password should be rotated
/// immediately in any real deployment.
async fn seed_admin_user(pool: &SqlitePool) -> Result<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT COUNT(*) > 0 FROM users WHERE username = 'admin'")
            .fetch_one(pool)
            .await?;

    if !exists {
        let hashed = bcrypt::hash("admin", bcrypt::DEFAULT_COST)?;
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO users (username, password_hash, role, created_at) VALUES ('admin', ?, 'admin', ?)",
        )
        .bind(&hashed)
        .bind(now)
        .execute(pool)
        .await?;
        println!("Created default 'admin' user.");
    }

    Ok(())
}
