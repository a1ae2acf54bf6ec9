//! Database operations for `product_views`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::products::ProductRow;
use crate::DbError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductViewCountRow {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub view_count: i64,
    pub last_viewed_at: DateTime<Utc>,
}

/// Records one view of a product, attributed to a client when known.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn record_product_view(
    pool: &PgPool,
    product_id: Uuid,
    client_id: Option<Uuid>,
) -> Result<(), DbError> {
    sqlx::query("INSERT INTO product_views (product_id, client_id) VALUES ($1, $2)")
        .bind(product_id)
        .bind(client_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Products ordered by total view count, most viewed first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn most_viewed_products(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ProductViewCountRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductViewCountRow>(
        "SELECT p.id AS product_id, p.name, p.price, p.image_url, p.is_active, \
                COUNT(v.id) AS view_count, MAX(v.viewed_at) AS last_viewed_at \
         FROM product_views v \
         JOIN products p ON p.id = v.product_id \
         GROUP BY p.id \
         ORDER BY view_count DESC, p.name \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Distinct active products a client viewed, most recent first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn recently_viewed_products(
    pool: &PgPool,
    client_id: Uuid,
    limit: i64,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT p.id, p.category_id, p.name, p.description, p.price, p.stock, \
                p.image_url, p.is_active, p.created_at, p.updated_at \
         FROM products p \
         JOIN (SELECT product_id, MAX(viewed_at) AS last_viewed_at \
               FROM product_views \
               WHERE client_id = $1 \
               GROUP BY product_id) v ON v.product_id = p.id \
         WHERE p.is_active \
         ORDER BY v.last_viewed_at DESC \
         LIMIT $2",
    )
    .bind(client_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
