//! Chunk retrieval for the summarization pipeline.
//!
//! Summaries are built from the full ordered chunk set of a single lecture;
//! there is no similarity ranking involved.

use anyhow::Result;
use sqlx::SqlitePool;

/// All chunk texts for a lecture, ordered by chunk index. An unknown or
/// empty lecture yields an empty vec; the caller decides whether that is an
/// error.
pub async fn chunks_for_lecture(pool: &SqlitePool, lecture_id: &str) -> Result<Vec<String>> {
    let texts: Vec<String> = sqlx::query_scalar(
        "SELECT text FROM lecture_chunks WHERE lecture_id = ? ORDER BY chunk_index ASC",
    )
    .bind(lecture_id)
    .fetch_all(pool)
    .await?;

    if texts.is_empty() {
        println!("Warning: no chunks found for lecture '{}'.", lecture_id);
    }

    Ok(texts)
}

/// Number of stored chunks for a lecture. Used by the size-check endpoint so
/// clients can warn before requesting a summary of a very large lecture.
pub async fn chunk_count(pool: &SqlitePool, lecture_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lecture_chunks WHERE lecture_id = ?")
        .bind(lecture_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
