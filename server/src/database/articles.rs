use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::database::utils::get_timestamp;

/// An article row with its author and category resolved to names.
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub body: String,
    pub date: i64,
    pub slug: String,
    pub category: String,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub author_id: i64,
    pub body: String,
    pub slug: String,
    pub category_id: i64,
}

const SELECT_ARTICLE: &str = "SELECT articles.id, articles.title, users.username AS author,
        articles.body, articles.date, articles.slug, categories.name AS category
 FROM articles
 JOIN users ON users.id = articles.author_id
 JOIN categories ON categories.id = articles.category_id";

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> ArticleRecord {
    ArticleRecord {
        id: row.get("id"),
        title: row.get("title"),
        author: row.get("author"),
        body: row.get("body"),
        date: row.get("date"),
        slug: row.get("slug"),
        category: row.get("category"),
    }
}

/// All articles, newest first.
pub async fn list_articles(pool: &SqlitePool) -> Result<Vec<ArticleRecord>> {
    let rows = sqlx::query(&format!("{} ORDER BY articles.date DESC", SELECT_ARTICLE))
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(record_from_row).collect())
}

/// Articles filed under one category, newest first.
pub async fn list_by_category(pool: &SqlitePool, category_id: i64) -> Result<Vec<ArticleRecord>> {
    let rows = sqlx::query(&format!(
        "{} WHERE articles.category_id = ? ORDER BY articles.date DESC",
        SELECT_ARTICLE
    ))
    .bind(category_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(record_from_row).collect())
}

pub async fn get_article(pool: &SqlitePool, slug: &str) -> Result<Option<ArticleRecord>> {
    let row = sqlx::query(&format!("{} WHERE articles.slug = ?", SELECT_ARTICLE))
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(record_from_row))
}

/// An article exists exactly when the lookup finds a row.
pub async fn article_exists(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let row = sqlx::query("SELECT id FROM articles WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(row.is_some())
}

pub async fn insert_article(pool: &SqlitePool, new_article: &NewArticle) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO articles (title, author_id, body, date, slug, category_id)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&new_article.title)
    .bind(new_article.author_id)
    .bind(&new_article.body)
    .bind(get_timestamp())
    .bind(&new_article.slug)
    .bind(new_article.category_id)
    .execute(pool)
    .await?;

    info!("New article created: {}", new_article.slug);

    Ok(result.last_insert_rowid())
}

/// Overwrite an existing article's content; the slug, author and original
/// date are preserved. Returns the number of rows touched.
pub async fn update_article(
    pool: &SqlitePool,
    slug: &str,
    title: &str,
    body: &str,
    category_id: i64,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE articles SET title = ?, body = ?, category_id = ? WHERE slug = ?",
    )
    .bind(title)
    .bind(body)
    .bind(category_id)
    .bind(slug)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete an article by slug. Returns the number of rows touched.
pub async fn delete_article(pool: &SqlitePool, slug: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM articles WHERE slug = ?")
        .bind(slug)
        .execute(pool)
        .await?;

    info!("Article deleted: {}", slug);

    Ok(result.rows_affected())
}
