pub mod articles;
pub mod categories;
pub mod users;
pub mod utils;

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

/// How long a request may wait for a pooled connection before the lookup is
/// abandoned. Keeps a stalled database from pinning every worker.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the database and ensure the schema exists.
///
/// `path` is anything sqlx's SQLite driver understands — a plain file path
/// or `sqlite::memory:` for tests.
pub async fn open_database(path: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(path)
        .with_context(|| format!("Invalid database path: {}", path))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .context("Failed to open database")?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables for a brand-new database. Idempotent — safe to run on
/// every startup.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS roles (
            id   INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT    NOT NULL UNIQUE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT    NOT NULL UNIQUE,
            password_hash TEXT    NOT NULL,
            real_name     TEXT,
            email         TEXT,
            created_at    INTEGER NOT NULL,
            role_id       INTEGER REFERENCES roles(id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS categories (
            id   INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT    NOT NULL UNIQUE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS articles (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT    NOT NULL,
            author_id   INTEGER NOT NULL REFERENCES users(id),
            body        TEXT    NOT NULL,
            date        INTEGER NOT NULL,
            slug        TEXT    NOT NULL UNIQUE,
            category_id INTEGER NOT NULL DEFAULT 1 REFERENCES categories(id)
        )",
    )
    .execute(pool)
    .await?;

    // --- Indexes --------------------------------------------------------
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_username     ON users(username)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_slug      ON articles(slug)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_category  ON articles(category_id)")
        .execute(pool)
        .await?;

    // The two roles are fixed vocabulary; seed them so user inserts can
    // resolve a role name on a fresh database.
    sqlx::query("INSERT OR IGNORE INTO roles (name) VALUES ('admin'), ('user')")
        .execute(pool)
        .await?;

    info!("Database schema ready");

    Ok(())
}
