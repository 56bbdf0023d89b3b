use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
}

pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<CategoryRecord>> {
    let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| CategoryRecord {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

pub async fn get_category(pool: &SqlitePool, name: &str) -> Result<Option<CategoryRecord>> {
    let row = sqlx::query("SELECT id, name FROM categories WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| CategoryRecord {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

/// A category exists exactly when the lookup finds a row.
pub async fn category_exists(pool: &SqlitePool, name: &str) -> Result<bool> {
    Ok(get_category(pool, name).await?.is_some())
}

pub async fn insert_category(pool: &SqlitePool, name: &str) -> Result<i64> {
    let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    info!("New category created: {}", name);

    Ok(result.last_insert_rowid())
}

/// Fetch a category by name, creating it first when missing — article
/// creation files articles under categories that may not exist yet.
pub async fn ensure_category(pool: &SqlitePool, name: &str) -> Result<CategoryRecord> {
    if let Some(category) = get_category(pool, name).await? {
        return Ok(category);
    }

    let id = insert_category(pool, name).await?;
    Ok(CategoryRecord {
        id,
        name: name.to_string(),
    })
}

/// Rename a category. Returns the number of rows touched — zero means the
/// old name did not exist.
pub async fn rename_category(pool: &SqlitePool, name: &str, new_name: &str) -> Result<u64> {
    let result = sqlx::query("UPDATE categories SET name = ? WHERE name = ?")
        .bind(new_name)
        .bind(name)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::open_database;

    async fn pool() -> SqlitePool {
        open_database("sqlite::memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn insert_then_get_roundtrips() {
        let pool = pool().await;
        let id = insert_category(&pool, "rust").await.unwrap();

        let category = get_category(&pool, "rust").await.unwrap().unwrap();
        assert_eq!(category, CategoryRecord { id, name: "rust".to_string() });
    }

    #[tokio::test]
    async fn exists_means_a_row_was_found() {
        let pool = pool().await;
        assert!(!category_exists(&pool, "rust").await.unwrap());

        insert_category(&pool, "rust").await.unwrap();
        assert!(category_exists(&pool, "rust").await.unwrap());
    }

    #[tokio::test]
    async fn ensure_creates_once_and_reuses_after() {
        let pool = pool().await;
        let first = ensure_category(&pool, "rust").await.unwrap();
        let second = ensure_category(&pool, "rust").await.unwrap();
        assert_eq!(first, second);

        assert_eq!(list_categories(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let pool = pool().await;
        insert_category(&pool, "rust").await.unwrap();
        assert!(insert_category(&pool, "rust").await.is_err());
    }

    #[tokio::test]
    async fn rename_reports_touched_rows() {
        let pool = pool().await;
        insert_category(&pool, "rust").await.unwrap();

        assert_eq!(rename_category(&pool, "rust", "systems").await.unwrap(), 1);
        assert!(category_exists(&pool, "systems").await.unwrap());
        assert!(!category_exists(&pool, "rust").await.unwrap());

        assert_eq!(rename_category(&pool, "gone", "x").await.unwrap(), 0);
    }
}
