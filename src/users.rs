//! User account management.
//!
//! Roles are limited to `student` and `admin`. The primary `admin` account
//! cannot be deleted.

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};

use crate::auth::{self, ROLE_ADMIN, ROLE_STUDENT};
use crate::config::Config;
use crate::models::User;

fn validate_role(role: &str) -> Result<()> {
    match role {
        ROLE_STUDENT | ROLE_ADMIN => Ok(()),
        other => bail!(
            "Invalid role '{}'. Must be either '{}' or '{}'.",
            other,
            ROLE_STUDENT,
            ROLE_ADMIN
        ),
    }
}

pub async fn add_user(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    role: &str,
) -> Result<()> {
    if username.trim().is_empty() || password.is_empty() {
        bail!("Username and password are required");
    }
    validate_role(role)?;

    let taken: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;
    if taken {
        bail!("Username '{}' is taken", username);
    }

    let hashed = auth::hash_password(password)?;
    let now = chrono::Utc::now().timestamp();
    sqlx::query("INSERT INTO users (username, password_hash, role, created_at) VALUES (?, ?, ?, ?)")
        .bind(username)
        .bind(&hashed)
        .bind(role)
        .bind(now)
        .execute(pool)
        .await?;

    Ok(())
}

/// Update a user's role and optionally their password.
pub async fn update_user(
    pool: &SqlitePool,
    username: &str,
    role: &str,
    password: Option<&str>,
) -> Result<()> {
    validate_role(role)?;

    let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;
    if !exists {
        bail!("User not found: {}", username);
    }

    match password {
        Some(pw) if !pw.is_empty() => {
            let hashed = auth::hash_password(pw)?;
            sqlx::query("UPDATE users SET role = ?, password_hash = ? WHERE username = ?")
                .bind(role)
                .bind(&hashed)
                .bind(username)
                .execute(pool)
                .await?;
        }
        _ => {
            sqlx::query("UPDATE users SET role = ? WHERE username = ?")
                .bind(role)
                .bind(username)
                .execute(pool)
                .await?;
        }
    }

    Ok(())
}

pub async fn delete_user(pool: &SqlitePool, username: &str) -> Result<()> {
    if username == "admin" {
        bail!("Cannot delete the main admin user");
    }

    let result = sqlx::query("DELETE FROM users WHERE username = ?")
        .bind(username)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        bail!("User not found: {}", username);
    }

    Ok(())
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(
        "SELECT username, password_hash, role, created_at FROM users ORDER BY username ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| User {
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            role: row.get("role"),
            created_at: row.get("created_at"),
        })
        .collect())
}

/// CLI entry points for `lct user …`.
pub async fn run_user_add(config: &Config, username: &str, password: &str, role: &str) -> Result<()> {
    let pool = crate::db::connect(&config.db).await?;
    add_user(&pool, username, password, role).await?;
    println!("User '{}' added ({}).", username, role);
    pool.close().await;
    Ok(())
}

pub async fn run_user_remove(config: &Config, username: &str) -> Result<()> {
    let pool = crate::db::connect(&config.db).await?;
    delete_user(&pool, username).await?;
    println!("User '{}' deleted.", username);
    pool.close().await;
    Ok(())
}

pub async fn run_user_set_role(config: &Config, username: &str, role: &str) -> Result<()> {
    let pool = crate::db::connect(&config.db).await?;
    update_user(&pool, username, role, None).await?;
    println!("User '{}' updated ({}).", username, role);
    pool.close().await;
    Ok(())
}

pub async fn run_user_list(config: &Config) -> Result<()> {
    let pool = crate::db::connect(&config.db).await?;
    let users = list_users(&pool).await?;
    println!("{:<24} {:<10} CREATED", "USERNAME", "ROLE");
    for user in &users {
        println!(
            "{:<24} {:<10} {}",
            user.username, user.role, user.created_at
        );
    }
    pool.close().await;
    Ok(())
}
