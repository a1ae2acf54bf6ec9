use artisan_core::CatalogFile;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Row counts touched by [`seed_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub ingredients: usize,
    pub products: usize,
}

/// Upsert categories, ingredients, and products from the catalog file.
///
/// Categories match on slug; ingredients and products match on
/// case-insensitive name within their category. All upserts run inside a
/// single transaction; if any operation fails the entire batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_catalog(pool: &PgPool, catalog: &CatalogFile) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for category in &catalog.categories {
        let category_id: Uuid = sqlx::query_scalar(
            "INSERT INTO categories (name, slug, description) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 description = EXCLUDED.description, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(&category.name)
        .bind(category.slug())
        .bind(&category.description)
        .fetch_one(&mut *tx)
        .await?;
        summary.categories += 1;

        for ingredient in &category.ingredients {
            sqlx::query(
                "INSERT INTO ingredients (category_id, name, kind, price, description) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (category_id, (LOWER(name))) DO UPDATE SET \
                     kind = EXCLUDED.kind, \
                     price = EXCLUDED.price, \
                     description = EXCLUDED.description, \
                     is_active = true, \
                     updated_at = NOW()",
            )
            .bind(category_id)
            .bind(&ingredient.name)
            .bind(ingredient.kind.as_str())
            .bind(ingredient.price)
            .bind(&ingredient.description)
            .execute(&mut *tx)
            .await?;
            summary.ingredients += 1;
        }

        for product in &category.products {
            sqlx::query(
                "INSERT INTO products (category_id, name, description, price, stock) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (category_id, (LOWER(name))) DO UPDATE SET \
                     description = EXCLUDED.description, \
                     price = EXCLUDED.price, \
                     stock = EXCLUDED.stock, \
                     is_active = true, \
                     updated_at = NOW()",
            )
            .bind(category_id)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.stock)
            .execute(&mut *tx)
            .await?;
            summary.products += 1;
        }
    }

    tx.commit().await?;
    Ok(summary)
}
