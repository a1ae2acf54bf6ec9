//! Database operations for `custom_products` and their ingredient join rows.
//!
//! Creation and updates validate the ingredient set with
//! [`artisan_core::compose`] inside the same transaction that writes the
//! rows, so a rejected composition never leaves partial state behind.

use artisan_core::{check_amount, compose, Composition, IngredientRef};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::carts::{checked_line, recompute_cart_totals};
use crate::ingredients::{get_active_ingredients_by_ids, IngredientRow};
use crate::{conflict_on_unique, DbError};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomProductRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub composition_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const CUSTOM_PRODUCT_COLUMNS: &str =
    "id, client_id, category_id, name, price, composition_key, created_at, updated_at";

const DUPLICATE_COMPOSITION: &str = "you already have a custom product with these ingredients";

async fn validate_composition(
    conn: &mut PgConnection,
    category_id: Uuid,
    ingredient_ids: &[Uuid],
) -> Result<Composition, DbError> {
    let category_exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
            .bind(category_id)
            .fetch_one(&mut *conn)
            .await?;
    if !category_exists {
        return Err(DbError::Validation(format!(
            "category {category_id} does not exist"
        )));
    }

    let rows = get_active_ingredients_by_ids(conn, ingredient_ids).await?;
    let found = rows
        .iter()
        .map(IngredientRow::to_ref)
        .collect::<Result<Vec<IngredientRef>, _>>()?;

    let composition = compose(ingredient_ids, category_id, &found)?;
    check_amount("custom product price", composition.price).map_err(DbError::Validation)?;
    Ok(composition)
}

async fn write_ingredient_links(
    conn: &mut PgConnection,
    custom_product_id: Uuid,
    ingredient_ids: &[Uuid],
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO custom_product_ingredients (custom_product_id, ingredient_id) \
         SELECT $1, UNNEST($2::UUID[])",
    )
    .bind(custom_product_id)
    .bind(ingredient_ids)
    .execute(conn)
    .await?;
    Ok(())
}

/// Validates and persists a new custom product with its ingredient links.
///
/// # Errors
///
/// Returns [`DbError::Composition`] if the ingredient set is invalid,
/// [`DbError::Validation`] if the category does not exist or the price is
/// too large to store, or [`DbError::Conflict`] if the client already owns the
/// same composition.
pub async fn create_custom_product(
    pool: &PgPool,
    client_id: Uuid,
    name: &str,
    category_id: Uuid,
    ingredient_ids: &[Uuid],
) -> Result<CustomProductRow, DbError> {
    let mut tx = pool.begin().await?;
    let composition = validate_composition(&mut tx, category_id, ingredient_ids).await?;

    let row = sqlx::query_as::<_, CustomProductRow>(&format!(
        "INSERT INTO custom_products (client_id, category_id, name, price, composition_key) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {CUSTOM_PRODUCT_COLUMNS}"
    ))
    .bind(client_id)
    .bind(category_id)
    .bind(name)
    .bind(composition.price)
    .bind(&composition.composition_key)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, DUPLICATE_COMPOSITION))?;

    write_ingredient_links(&mut tx, row.id, &composition.ingredient_ids).await?;

    tx.commit().await?;
    Ok(row)
}

/// Lists a client's custom products, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_custom_products(
    pool: &PgPool,
    client_id: Uuid,
) -> Result<Vec<CustomProductRow>, DbError> {
    let rows = sqlx::query_as::<_, CustomProductRow>(&format!(
        "SELECT {CUSTOM_PRODUCT_COLUMNS} FROM custom_products \
         WHERE client_id = $1 \
         ORDER BY created_at DESC, id"
    ))
    .bind(client_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetches a custom product by id; ownership is checked by the caller.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if it does not exist.
pub async fn get_custom_product(pool: &PgPool, id: Uuid) -> Result<CustomProductRow, DbError> {
    sqlx::query_as::<_, CustomProductRow>(&format!(
        "SELECT {CUSTOM_PRODUCT_COLUMNS} FROM custom_products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// The ingredients a custom product is composed of, ordered by kind.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_custom_product_ingredients(
    pool: &PgPool,
    custom_product_id: Uuid,
) -> Result<Vec<IngredientRow>, DbError> {
    let rows = sqlx::query_as::<_, IngredientRow>(
        "SELECT i.id, i.category_id, i.name, i.kind, i.price, i.description, i.image_url, \
                i.is_active, i.created_at, i.updated_at \
         FROM custom_product_ingredients cpi \
         JOIN ingredients i ON i.id = cpi.ingredient_id \
         WHERE cpi.custom_product_id = $1 \
         ORDER BY i.kind, i.name",
    )
    .bind(custom_product_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Re-validates and replaces a custom product's ingredient set (and
/// optionally its name and category). Cart lines pointing at it take the
/// new price and their carts are recomputed.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the client owns no such product,
/// [`DbError::Composition`] if the new set is invalid,
/// [`DbError::Validation`] if the new price or a repriced cart line is too
/// large to store, or [`DbError::Conflict`] if it duplicates another of the
/// client's products.
pub async fn update_custom_product(
    pool: &PgPool,
    id: Uuid,
    client_id: Uuid,
    name: Option<&str>,
    category_id: Option<Uuid>,
    ingredient_ids: &[Uuid],
) -> Result<CustomProductRow, DbError> {
    let mut tx = pool.begin().await?;

    let current_category: Uuid = sqlx::query_scalar(
        "SELECT category_id FROM custom_products WHERE id = $1 AND client_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(client_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    let category_id = category_id.unwrap_or(current_category);
    let composition = validate_composition(&mut tx, category_id, ingredient_ids).await?;

    let row = sqlx::query_as::<_, CustomProductRow>(&format!(
        "UPDATE custom_products \
         SET name            = COALESCE($2, name), \
             category_id     = $3, \
             price           = $4, \
             composition_key = $5, \
             updated_at      = NOW() \
         WHERE id = $1 \
         RETURNING {CUSTOM_PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(category_id)
    .bind(composition.price)
    .bind(&composition.composition_key)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, DUPLICATE_COMPOSITION))?;

    sqlx::query("DELETE FROM custom_product_ingredients WHERE custom_product_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    write_ingredient_links(&mut tx, id, &composition.ingredient_ids).await?;

    let largest_line: Option<i32> =
        sqlx::query_scalar("SELECT MAX(quantity) FROM cart_items WHERE custom_product_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    if let Some(quantity) = largest_line {
        checked_line(composition.price, quantity)?;
    }

    let cart_ids: Vec<Uuid> = sqlx::query_scalar(
        "UPDATE cart_items SET unit_price = $2, subtotal = quantity * $2 \
         WHERE custom_product_id = $1 \
         RETURNING cart_id",
    )
    .bind(id)
    .bind(composition.price)
    .fetch_all(&mut *tx)
    .await?;
    for cart_id in cart_ids {
        recompute_cart_totals(&mut tx, cart_id).await?;
    }

    tx.commit().await?;
    Ok(row)
}

/// Deletes a custom product owned by `client_id`, removing it from every
/// cart and recomputing those carts in the same transaction.
///
/// Returns the number of carts that were touched.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the client owns no such product.
pub async fn delete_custom_product(
    pool: &PgPool,
    id: Uuid,
    client_id: Uuid,
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    let cart_ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT DISTINCT cart_id FROM cart_items WHERE custom_product_id = $1",
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    let result = sqlx::query("DELETE FROM custom_products WHERE id = $1 AND client_id = $2")
        .bind(id)
        .bind(client_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    // cart_items rows are gone via ON DELETE CASCADE; only totals remain stale.
    for cart_id in &cart_ids {
        recompute_cart_totals(&mut tx, *cart_id).await?;
    }

    tx.commit().await?;
    Ok(cart_ids.len())
}
