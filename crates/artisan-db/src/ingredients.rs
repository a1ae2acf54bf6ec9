//! Database operations for the `ingredients` table.

use artisan_core::{CoreError, IngredientKind, IngredientRef};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IngredientRow {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub kind: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IngredientRow {
    /// The subset of this row the composer works with.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidIngredientKind`] if the stored kind is unknown.
    pub fn to_ref(&self) -> Result<IngredientRef, CoreError> {
        Ok(IngredientRef {
            id: self.id,
            category_id: self.category_id,
            kind: self.kind.parse()?,
            price: self.price,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngredientFilter {
    pub category_id: Option<Uuid>,
    pub kind: Option<IngredientKind>,
    pub active_only: bool,
}

#[derive(Debug, Clone)]
pub struct NewIngredient<'a> {
    pub category_id: Uuid,
    pub name: &'a str,
    pub kind: IngredientKind,
    pub price: Decimal,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct IngredientUpdate<'a> {
    pub name: Option<&'a str>,
    pub kind: Option<IngredientKind>,
    pub price: Option<Decimal>,
    pub description: Option<Option<&'a str>>,
    pub is_active: Option<bool>,
}

const INGREDIENT_COLUMNS: &str = "id, category_id, name, kind, price, description, image_url, \
                                  is_active, created_at, updated_at";

/// Lists ingredients ordered by kind then name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ingredients(
    pool: &PgPool,
    filter: IngredientFilter,
) -> Result<Vec<IngredientRow>, DbError> {
    let rows = sqlx::query_as::<_, IngredientRow>(&format!(
        "SELECT {INGREDIENT_COLUMNS} FROM ingredients \
         WHERE ($1::UUID IS NULL OR category_id = $1) \
           AND ($2::TEXT IS NULL OR kind = $2) \
           AND (NOT $3 OR is_active) \
         ORDER BY kind, name"
    ))
    .bind(filter.category_id)
    .bind(filter.kind.map(IngredientKind::as_str))
    .bind(filter.active_only)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the ingredient does not exist.
pub async fn get_ingredient(pool: &PgPool, id: Uuid) -> Result<IngredientRow, DbError> {
    sqlx::query_as::<_, IngredientRow>(&format!(
        "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Loads active ingredients by id; ids that are missing or inactive are simply absent.
pub(crate) async fn get_active_ingredients_by_ids(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> Result<Vec<IngredientRow>, DbError> {
    let rows = sqlx::query_as::<_, IngredientRow>(&format!(
        "SELECT {INGREDIENT_COLUMNS} FROM ingredients \
         WHERE id = ANY($1) AND is_active"
    ))
    .bind(ids)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (duplicate name in the
/// category is a unique violation; unknown category a foreign-key violation).
pub async fn create_ingredient(
    pool: &PgPool,
    new: &NewIngredient<'_>,
) -> Result<IngredientRow, DbError> {
    let row = sqlx::query_as::<_, IngredientRow>(&format!(
        "INSERT INTO ingredients (category_id, name, kind, price, description) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {INGREDIENT_COLUMNS}"
    ))
    .bind(new.category_id)
    .bind(new.name)
    .bind(new.kind.as_str())
    .bind(new.price)
    .bind(new.description)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Applies a sparse update.
///
/// Price changes do not reprice existing custom products; they keep the
/// price they were composed at.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the ingredient does not exist, or
/// [`DbError::Conflict`] if the kind would change while custom products
/// still use the ingredient.
pub async fn update_ingredient(
    pool: &PgPool,
    id: Uuid,
    update: &IngredientUpdate<'_>,
) -> Result<IngredientRow, DbError> {
    let mut tx = pool.begin().await?;

    let current_kind: String =
        sqlx::query_scalar("SELECT kind FROM ingredients WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

    if let Some(kind) = update.kind {
        if kind.as_str() != current_kind {
            let in_use: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM custom_product_ingredients WHERE ingredient_id = $1)",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if in_use {
                return Err(DbError::Conflict(
                    "ingredient kind cannot change while custom products use it".to_string(),
                ));
            }
        }
    }

    let row = sqlx::query_as::<_, IngredientRow>(&format!(
        "UPDATE ingredients \
         SET name        = COALESCE($2, name), \
             kind        = COALESCE($3, kind), \
             price       = COALESCE($4, price), \
             description = CASE WHEN $5::BOOL THEN $6 ELSE description END, \
             is_active   = COALESCE($7, is_active), \
             updated_at  = NOW() \
         WHERE id = $1 \
         RETURNING {INGREDIENT_COLUMNS}"
    ))
    .bind(id)
    .bind(update.name)
    .bind(update.kind.map(IngredientKind::as_str))
    .bind(update.price)
    .bind(update.description.is_some())
    .bind(update.description.flatten())
    .bind(update.is_active)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Deletes an ingredient.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if a custom product still uses it,
/// [`DbError::NotFound`] if it does not exist.
pub async fn delete_ingredient(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(DbError::from)
        .map_err(|e| {
            if e.is_foreign_key_violation() {
                DbError::Conflict(
                    "ingredient is used by custom products; deactivate it instead".to_string(),
                )
            } else {
                e
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the ingredient does not exist.
pub async fn set_ingredient_image(
    pool: &PgPool,
    id: Uuid,
    image_url: &str,
) -> Result<IngredientRow, DbError> {
    sqlx::query_as::<_, IngredientRow>(&format!(
        "UPDATE ingredients SET image_url = $2, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {INGREDIENT_COLUMNS}"
    ))
    .bind(id)
    .bind(image_url)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
