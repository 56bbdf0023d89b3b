use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::database::utils::get_timestamp;

/// A full user row, role resolved to its name.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub role: String,
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
        real_name: row.get("real_name"),
        email: row.get("email"),
        created_at: row.get("created_at"),
    }
}

/// Get a user row by username. `Ok(None)` means no such user; `Err` means
/// the store itself failed — callers that care about the difference (the
/// session guard, the login handler) must not collapse the two.
pub async fn get_user(pool: &SqlitePool, username: &str) -> Result<Option<UserRecord>> {
    let row = sqlx::query(
        "SELECT users.id, users.username, users.password_hash, users.real_name,
                users.email, users.created_at, COALESCE(roles.name, 'user') AS role
         FROM users
         LEFT JOIN roles ON roles.id = users.role_id
         WHERE users.username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| record_from_row(&row)))
}

/// A user exists exactly when the lookup finds a row.
pub async fn user_exists(pool: &SqlitePool, username: &str) -> Result<bool> {
    let row = sqlx::query("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(row.is_some())
}

/// All usernames, for the user list resource.
pub async fn list_usernames(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT username FROM users ORDER BY username")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get("username")).collect())
}

/// Insert a new user; the role name is resolved against the roles table.
pub async fn insert_user(pool: &SqlitePool, new_user: &NewUser) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO users (username, password_hash, real_name, email, created_at, role_id)
         VALUES (?, ?, ?, ?, ?, (SELECT id FROM roles WHERE name = ?))",
    )
    .bind(&new_user.username)
    .bind(&new_user.password_hash)
    .bind(&new_user.real_name)
    .bind(&new_user.email)
    .bind(get_timestamp())
    .bind(&new_user.role)
    .execute(pool)
    .await?;

    info!("New user created: {}", new_user.username);

    Ok(result.last_insert_rowid())
}

/// Overwrite a user's mutable fields. Returns the number of rows touched —
/// zero means the username did not exist.
pub async fn update_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    real_name: &Option<String>,
    email: &Option<String>,
    role: &str,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE users
         SET password_hash = ?,
             real_name = ?,
             email = ?,
             role_id = (SELECT id FROM roles WHERE name = ?)
         WHERE username = ?",
    )
    .bind(password_hash)
    .bind(real_name)
    .bind(email)
    .bind(role)
    .bind(username)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Change just the role of a user.
pub async fn set_role(pool: &SqlitePool, username: &str, role: &str) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE users
         SET role_id = (SELECT id FROM roles WHERE name = ?)
         WHERE username = ?",
    )
    .bind(role)
    .bind(username)
    .execute(pool)
    .await?;

    info!("Role of {} set to {}", username, role);

    Ok(result.rows_affected())
}
