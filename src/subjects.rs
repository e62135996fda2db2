//! Subject management.
//!
//! Subjects are keyed by name. Renaming cascades into the lectures that
//! reference the subject, and deleting a subject fully deletes every one of
//! its lectures (chunks and cached summaries included). Both run inside a
//! single transaction.

use anyhow::{bail, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::models::Lecture;

/// A subject together with its lectures, as shown on the dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectWithLectures {
    pub name: String,
    pub lectures: Vec<Lecture>,
}

pub async fn add_subject(pool: &SqlitePool, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Subject name must not be empty");
    }

    let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM subjects WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;
    if exists {
        bail!("Subject '{}' already exists", name);
    }

    sqlx::query("INSERT INTO subjects (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Rename a subject and repoint its lectures atomically.
pub async fn rename_subject(pool: &SqlitePool, old_name: &str, new_name: &str) -> Result<()> {
    if new_name.trim().is_empty() {
        bail!("Subject name must not be empty");
    }
    if new_name == old_name {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM subjects WHERE name = ?")
        .bind(old_name)
        .fetch_one(&mut *tx)
        .await?;
    if !exists {
        bail!("Subject not found: {}", old_name);
    }

    let taken: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM subjects WHERE name = ?")
        .bind(new_name)
        .fetch_one(&mut *tx)
        .await?;
    if taken {
        bail!("Subject name '{}' is taken", new_name);
    }

    sqlx::query("UPDATE subjects SET name = ? WHERE name = ?")
        .bind(new_name)
        .bind(old_name)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE lectures SET subject_name = ? WHERE subject_name = ?")
        .bind(new_name)
        .bind(old_name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Delete a subject and cascade into all of its lectures (chunks and cached
/// summaries included). One transaction: a failure partway leaves the
/// subject untouched.
pub async fn delete_subject(pool: &SqlitePool, name: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM summaries WHERE lecture_id IN
            (SELECT lecture_id FROM lectures WHERE subject_name = ?)
        "#,
    )
    .bind(name)
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        r#"
        DELETE FROM lecture_chunks WHERE lecture_id IN
            (SELECT lecture_id FROM lectures WHERE subject_name = ?)
        "#,
    )
    .bind(name)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM lectures WHERE subject_name = ?")
        .bind(name)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM subjects WHERE name = ?")
        .bind(name)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        bail!("Subject not found: {}", name);
    }

    tx.commit().await?;
    Ok(())
}

/// All subjects with their lectures, sorted by name.
pub async fn list_subjects(pool: &SqlitePool) -> Result<Vec<SubjectWithLectures>> {
    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM subjects ORDER BY name ASC")
        .fetch_all(pool)
        .await?;

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let rows = sqlx::query(
            r#"
            SELECT lecture_id, subject_name, title, original_filename, uploaded_at
            FROM lectures WHERE subject_name = ? ORDER BY uploaded_at DESC
            "#,
        )
        .bind(&name)
        .fetch_all(pool)
        .await?;

        let lecture_list = rows
            .iter()
            .map(|row| Lecture {
                lecture_id: row.get("lecture_id"),
                subject_name: row.get("subject_name"),
                title: row.get("title"),
                original_filename: row.get("original_filename"),
                uploaded_at: row.get("uploaded_at"),
            })
            .collect();

        out.push(SubjectWithLectures {
            name,
            lectures: lecture_list,
        });
    }

    Ok(out)
}

/// CLI entry points for `lct subject …`.
pub async fn run_subject_add(config: &Config, name: &str) -> Result<()> {
    let pool = crate::db::connect(&config.db).await?;
    add_subject(&pool, name).await?;
    println!("Subject '{}' added.", name);
    pool.close().await;
    Ok(())
}

pub async fn run_subject_rename(config: &Config, old_name: &str, new_name: &str) -> Result<()> {
    let pool = crate::db::connect(&config.db).await?;
    rename_subject(&pool, old_name, new_name).await?;
    println!("Subject '{}' renamed to '{}'.", old_name, new_name);
    pool.close().await;
    Ok(())
}

pub async fn run_subject_remove(config: &Config, name: &str) -> Result<()> {
    let pool = crate::db::connect(&config.db).await?;
    delete_subject(&pool, name).await?;
    println!("Subject '{}' and its lectures deleted.", name);
    pool.close().await;
    Ok(())
}

pub async fn run_subject_list(config: &Config) -> Result<()> {
    let pool = crate::db::connect(&config.db).await?;
    let subjects = list_subjects(&pool).await?;
    if subjects.is_empty() {
        println!("No subjects.");
    }
    for subject in &subjects {
        println!("{} ({} lectures)", subject.name, subject.lectures.len());
        for lecture in &subject.lectures {
            println!("  {:<40} {}", lecture.lecture_id, lecture.title);
        }
    }
    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::create_schema(&pool).await.unwrap();
        pool
    }

    async fn seed_lecture(pool: &SqlitePool, subject: &str, lecture_id: &str) {
        sqlx::query(
            r#"
            INSERT INTO lectures (lecture_id, subject_name, title, original_filename, uploaded_at)
            VALUES (?, ?, 'Title', 'f.pdf', 0)
            "#,
        )
        .bind(lecture_id)
        .bind(subject)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO lecture_chunks (lecture_id, chunk_index, text) VALUES (?, 0, 'chunk')")
            .bind(lecture_id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO summaries (lecture_id, target_words, content, created_at) VALUES (?, 300, 's', 0)",
        )
        .bind(lecture_id)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn delete_subject_cascades_through_all_tables() {
        let pool = test_pool().await;
        add_subject(&pool, "Operating Systems").await.unwrap();
        seed_lecture(&pool, "Operating Systems", "lec-a").await;
        seed_lecture(&pool, "Operating Systems", "lec-b").await;

        delete_subject(&pool, "Operating Systems").await.unwrap();

        assert_eq!(count(&pool, "subjects").await, 0);
        assert_eq!(count(&pool, "lectures").await, 0);
        assert_eq!(count(&pool, "lecture_chunks").await, 0);
        assert_eq!(count(&pool, "summaries").await, 0);
    }

    #[tokio::test]
    async fn delete_unknown_subject_leaves_other_subjects_intact() {
        let pool = test_pool().await;
        add_subject(&pool, "Databases").await.unwrap();
        seed_lecture(&pool, "Databases", "lec-c").await;

        let err = delete_subject(&pool, "Ghost").await.unwrap_err();
        assert!(err.to_string().contains("Subject not found"));

        assert_eq!(count(&pool, "subjects").await, 1);
        assert_eq!(count(&pool, "lectures").await, 1);
        assert_eq!(count(&pool, "lecture_chunks").await, 1);
        assert_eq!(count(&pool, "summaries").await, 1);
    }

    #[tokio::test]
    async fn rename_subject_repoints_lectures() {
        let pool = test_pool().await;
        add_subject(&pool, "Old Name").await.unwrap();
        seed_lecture(&pool, "Old Name", "lec-d").await;

        rename_subject(&pool, "Old Name", "New Name").await.unwrap();

        let subject: String = sqlx::query_scalar("SELECT subject_name FROM lectures WHERE lecture_id = 'lec-d'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(subject, "New Name");
    }
}
