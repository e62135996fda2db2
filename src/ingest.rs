//! Lecture ingestion pipeline.
//!
//! Coordinates the full upload flow: read file → extract text → chunk →
//! store lecture metadata and chunks in one transaction. The subject must
//! already exist; a failed pipeline leaves no partial lecture behind.

use anyhow::{bail, Context, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::chunk::split_text;
use crate::config::Config;
use crate::extract;

/// Outcome of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub lecture_id: String,
    pub chunk_count: usize,
}

/// Ingest a lecture document from a path on disk.
pub async fn process_lecture(
    config: &Config,
    pool: &SqlitePool,
    path: &std::path::Path,
    title: &str,
    subject_name: &str,
) -> Result<IngestReport> {
    println!("--- Ingestion started for: {} ---", title);

    let subject_exists: bool =
        sqlx::query_scalar("SELECT COUNT(*) > 0 FROM subjects WHERE name = ?")
            .bind(subject_name)
            .fetch_one(pool)
            .await?;
    if !subject_exists {
        bail!("Unknown subject: '{}'. Add it first.", subject_name);
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    let content_type = extract::content_type_for_extension(&extension)
        .ok_or_else(|| anyhow::anyhow!("Unsupported file type '.{}'. Only PDF is supported.", extension))?;

    println!("Step 1: Reading document...");
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let text = extract::extract_text(&bytes, content_type)
        .with_context(|| "Pipeline failed: could not read document or document is empty")?;

    println!("Step 2: Chunking text...");
    let chunks = split_text(
        &text,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    );
    println!("  split into {} chunks", chunks.len());
    if chunks.is_empty() {
        bail!("Pipeline failed: no text chunks generated");
    }

    let lecture_id = new_lecture_id(title);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    println!("Step 3: Storing lecture data (id: {})...", lecture_id);
    store_lecture(pool, &lecture_id, subject_name, title, &filename, &chunks).await?;

    println!("--- Ingestion finished for: {} ---", title);
    Ok(IngestReport {
        lecture_id,
        chunk_count: chunks.len(),
    })
}

/// Lecture ids are a slug of the title plus a short random suffix,
/// e.g. `intro-to-databases-3fa85f64`.
fn new_lecture_id(title: &str) -> String {
    let uuid = Uuid::new_v4().to_string();
    format!("{}-{}", slugify(title), &uuid[..8])
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if c.is_whitespace() || c == '-' || c == '_' {
            if !slug.ends_with('-') {
                slug.push('-');
            }
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "lecture".to_string()
    } else {
        slug
    }
}

async fn store_lecture(
    pool: &SqlitePool,
    lecture_id: &str,
    subject_name: &str,
    title: &str,
    filename: &str,
    chunks: &[String],
) -> Result<()> {
    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO lectures (lecture_id, subject_name, title, original_filename, uploaded_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(lecture_id)
    .bind(subject_name)
    .bind(title)
    .bind(filename)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for (i, text) in chunks.iter().enumerate() {
        sqlx::query("INSERT INTO lecture_chunks (lecture_id, chunk_index, text) VALUES (?, ?, ?)")
            .bind(lecture_id)
            .bind(i as i64)
            .bind(text)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// CLI entry point for `lct ingest`.
pub async fn run_ingest(
    config: &Config,
    path: &std::path::Path,
    title: &str,
    subject: &str,
) -> Result<()> {
    let pool = crate::db::connect(&config.db).await?;
    let report = process_lecture(config, &pool, path, title, subject).await?;
    println!("ingested lecture");
    println!("  lecture_id: {}", report.lecture_id);
    println!("  chunks:     {}", report.chunk_count);
    println!("ok");
    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_dashes() {
        assert_eq!(slugify("Intro To Databases"), "intro-to-databases");
        assert_eq!(slugify("  Operating  Systems  "), "operating-systems");
    }

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("Week #3: B+ Trees!"), "week-3-b-trees");
    }

    #[test]
    fn slugify_never_empty() {
        assert_eq!(slugify("!!!"), "lecture");
    }

    #[test]
    fn lecture_id_has_short_suffix() {
        let id = new_lecture_id("Intro");
        assert!(id.starts_with("intro-"));
        assert_eq!(id.len(), "intro-".len() + 8);
    }
}
