//! Database operations for the `categories` table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const CATEGORY_COLUMNS: &str = "id, name, slug, description, image_url, created_at, updated_at";

/// Returns all categories ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the category does not exist.
pub async fn get_category(pool: &PgPool, id: Uuid) -> Result<CategoryRow, DbError> {
    sqlx::query_as::<_, CategoryRow>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (a duplicate slug is a unique violation).
pub async fn create_category(
    pool: &PgPool,
    name: &str,
    slug: &str,
    description: Option<&str>,
) -> Result<CategoryRow, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(&format!(
        "INSERT INTO categories (name, slug, description) \
         VALUES ($1, $2, $3) \
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(name)
    .bind(slug)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Renames and/or redescribes a category. When `name` changes the caller
/// passes the new slug alongside it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the category does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_category(
    pool: &PgPool,
    id: Uuid,
    name_and_slug: Option<(&str, &str)>,
    description: Option<Option<&str>>,
) -> Result<CategoryRow, DbError> {
    let (name, slug) = name_and_slug.unzip();
    sqlx::query_as::<_, CategoryRow>(&format!(
        "UPDATE categories \
         SET name        = COALESCE($2, name), \
             slug        = COALESCE($3, slug), \
             description = CASE WHEN $4::BOOL THEN $5 ELSE description END, \
             updated_at  = NOW() \
         WHERE id = $1 \
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(slug)
    .bind(description.is_some())
    .bind(description.flatten())
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Deletes a category that no longer has products or ingredients.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if products or ingredients still reference
/// the category, [`DbError::NotFound`] if it does not exist, or
/// [`DbError::Sqlx`] on query failure.
pub async fn delete_category(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let in_use: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM products WHERE category_id = $1) \
             OR EXISTS (SELECT 1 FROM ingredients WHERE category_id = $1) \
             OR EXISTS (SELECT 1 FROM custom_products WHERE category_id = $1)",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if in_use {
        return Err(DbError::Conflict(
            "category still has products or ingredients".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    tx.commit().await?;
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the category does not exist.
pub async fn set_category_image(
    pool: &PgPool,
    id: Uuid,
    image_url: &str,
) -> Result<CategoryRow, DbError> {
    sqlx::query_as::<_, CategoryRow>(&format!(
        "UPDATE categories SET image_url = $2, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(id)
    .bind(image_url)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
