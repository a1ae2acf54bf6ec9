//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::carts::recompute_cart_totals;
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter<'a> {
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring match on name or description.
    pub search: Option<&'a str>,
    pub include_inactive: bool,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub category_id: Uuid,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: Decimal,
    pub stock: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdate<'a> {
    pub category_id: Option<Uuid>,
    pub name: Option<&'a str>,
    pub description: Option<Option<&'a str>>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
}

pub(crate) const PRODUCT_COLUMNS: &str = "id, category_id, name, description, price, stock, \
                                          image_url, is_active, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Lists products ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(
    pool: &PgPool,
    filter: &ProductFilter<'_>,
) -> Result<Vec<ProductRow>, DbError> {
    let pattern = filter.search.map(|s| format!("%{}%", s.trim()));
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE ($1::UUID IS NULL OR category_id = $1) \
           AND ($2::TEXT IS NULL OR name ILIKE $2 OR description ILIKE $2) \
           AND ($3 OR is_active) \
         ORDER BY name, id \
         LIMIT $4 OFFSET $5"
    ))
    .bind(filter.category_id)
    .bind(pattern)
    .bind(filter.include_inactive)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns a product regardless of `is_active`; callers decide visibility.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist.
pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (duplicate name in the
/// category is a unique violation; unknown category a foreign-key violation).
pub async fn create_product(pool: &PgPool, new: &NewProduct<'_>) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO products (category_id, name, description, price, stock) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(new.category_id)
    .bind(new.name)
    .bind(new.description)
    .bind(new.price)
    .bind(new.stock)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Applies a sparse update. Cart lines keep the unit price they were added at.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist.
pub async fn update_product(
    pool: &PgPool,
    id: Uuid,
    update: &ProductUpdate<'_>,
) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(&format!(
        "UPDATE products \
         SET category_id = COALESCE($2, category_id), \
             name        = COALESCE($3, name), \
             description = CASE WHEN $4::BOOL THEN $5 ELSE description END, \
             price       = COALESCE($6, price), \
             stock       = COALESCE($7, stock), \
             is_active   = COALESCE($8, is_active), \
             updated_at  = NOW() \
         WHERE id = $1 \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(update.category_id)
    .bind(update.name)
    .bind(update.description.is_some())
    .bind(update.description.flatten())
    .bind(update.price)
    .bind(update.stock)
    .bind(update.is_active)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Soft-deletes a product: marks it inactive and removes it from every cart,
/// recomputing the affected carts in the same transaction.
///
/// Returns the number of carts that were touched.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist.
pub async fn delete_product(pool: &PgPool, id: Uuid) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE products SET is_active = false, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    let cart_ids: Vec<Uuid> = sqlx::query_scalar(
        "DELETE FROM cart_items WHERE product_id = $1 RETURNING cart_id",
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    for cart_id in &cart_ids {
        recompute_cart_totals(&mut tx, *cart_id).await?;
    }

    tx.commit().await?;
    Ok(cart_ids.len())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist.
pub async fn set_product_image(
    pool: &PgPool,
    id: Uuid,
    image_url: &str,
) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(&format!(
        "UPDATE products SET image_url = $2, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(image_url)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
