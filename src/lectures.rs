//! Lecture listing and deletion.
//!
//! SQLite has no cascade configured across the three lecture tables, so a
//! full delete removes the metadata row, every chunk, and every cached
//! summary in one transaction.

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::models::Lecture;

pub async fn get_lecture(pool: &SqlitePool, lecture_id: &str) -> Result<Option<Lecture>> {
    let row = sqlx::query(
        r#"
        SELECT lecture_id, subject_name, title, original_filename, uploaded_at
        FROM lectures WHERE lecture_id = ?
        "#,
    )
    .bind(lecture_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Lecture {
        lecture_id: row.get("lecture_id"),
        subject_name: row.get("subject_name"),
        title: row.get("title"),
        original_filename: row.get("original_filename"),
        uploaded_at: row.get("uploaded_at"),
    }))
}

pub async fn list_lectures(pool: &SqlitePool, subject: Option<&str>) -> Result<Vec<Lecture>> {
    let rows = match subject {
        Some(name) => {
            sqlx::query(
                r#"
                SELECT lecture_id, subject_name, title, original_filename, uploaded_at
                FROM lectures WHERE subject_name = ? ORDER BY uploaded_at DESC
                "#,
            )
            .bind(name)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT lecture_id, subject_name, title, original_filename, uploaded_at
                FROM lectures ORDER BY subject_name ASC, uploaded_at DESC
                "#,
            )
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows
        .iter()
        .map(|row| Lecture {
            lecture_id: row.get("lecture_id"),
            subject_name: row.get("subject_name"),
            title: row.get("title"),
            original_filename: row.get("original_filename"),
            uploaded_at: row.get("uploaded_at"),
        })
        .collect())
}

/// Where the upload flow keeps a lecture's original document, named by
/// lecture id so the file survives title edits and duplicate filenames.
pub fn stored_document_path(config: &Config, lecture: &Lecture) -> std::path::PathBuf {
    let ext = std::path::Path::new(&lecture.original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("pdf");
    config
        .upload
        .dir
        .join(format!("{}.{}", lecture.lecture_id, ext))
}

/// Delete a lecture, its chunks, and its cached summaries.
pub async fn delete_lecture_fully(pool: &SqlitePool, lecture_id: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM summaries WHERE lecture_id = ?")
        .bind(lecture_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM lecture_chunks WHERE lecture_id = ?")
        .bind(lecture_id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM lectures WHERE lecture_id = ?")
        .bind(lecture_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        bail!("Lecture not found: {}", lecture_id);
    }

    tx.commit().await?;
    Ok(())
}

/// CLI entry point for `lct lectures`.
pub async fn run_list(config: &Config, subject: Option<&str>) -> Result<()> {
    let pool = crate::db::connect(&config.db).await?;
    let all = list_lectures(&pool, subject).await?;
    if all.is_empty() {
        println!("No lectures.");
    } else {
        println!("{:<40} {:<20} TITLE", "LECTURE_ID", "SUBJECT");
        for lecture in &all {
            println!(
                "{:<40} {:<20} {}",
                lecture.lecture_id, lecture.subject_name, lecture.title
            );
        }
    }
    pool.close().await;
    Ok(())
}

/// CLI entry point for `lct delete`.
pub async fn run_delete(config: &Config, lecture_id: &str) -> Result<()> {
    let pool = crate::db::connect(&config.db).await?;
    let lecture = get_lecture(&pool, lecture_id).await?;
    delete_lecture_fully(&pool, lecture_id).await?;
    // Uploaded originals live under [upload].dir; CLI-ingested files stay
    // wherever the user keeps them.
    if let Some(lecture) = lecture {
        let _ = std::fs::remove_file(stored_document_path(config, &lecture));
    }
    println!("Lecture '{}' deleted.", lecture_id);
    pool.close().await;
    Ok(())
}
