//! Core data models used throughout Lectern.

use serde::Serialize;

/// An account that can log in. Roles are `student` or `admin`.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: i64,
}

/// Lecture metadata stored alongside its chunks.
#[derive(Debug, Clone, Serialize)]
pub struct Lecture {
    pub lecture_id: String,
    pub subject_name: String,
    pub title: String,
    pub original_filename: String,
    pub uploaded_at: i64,
}
