//! Database operations for `carts` and `cart_items`.
//!
//! Every mutation runs in a transaction that ends with
//! [`recompute_cart_totals`], so stored totals always match the lines.

use artisan_core::{check_amount, compute_totals, CartLine, MAX_LINE_QUANTITY};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line joined with the display name of what it points at.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Option<Uuid>,
    pub custom_product_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

impl CartItemRow {
    #[must_use]
    pub fn line(&self) -> CartLine {
        CartLine {
            unit_price: self.unit_price,
            quantity: self.quantity,
        }
    }
}

/// What a cart line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartItemTarget {
    Product(Uuid),
    CustomProduct(Uuid),
}

const CART_COLUMNS: &str = "id, client_id, subtotal, total, created_at, updated_at";

// ---------------------------------------------------------------------------
// Internal helpers (shared with products, custom_products, sales)
// ---------------------------------------------------------------------------

async fn ensure_cart(conn: &mut PgConnection, client_id: Uuid) -> Result<CartRow, DbError> {
    sqlx::query("INSERT INTO carts (client_id) VALUES ($1) ON CONFLICT (client_id) DO NOTHING")
        .bind(client_id)
        .execute(&mut *conn)
        .await?;

    let cart = sqlx::query_as::<_, CartRow>(&format!(
        "SELECT {CART_COLUMNS} FROM carts WHERE client_id = $1 FOR UPDATE"
    ))
    .bind(client_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(cart)
}

pub(crate) async fn cart_items_on(
    conn: &mut PgConnection,
    cart_id: Uuid,
) -> Result<Vec<CartItemRow>, DbError> {
    let rows = sqlx::query_as::<_, CartItemRow>(
        "SELECT ci.id, ci.cart_id, ci.product_id, ci.custom_product_id, \
                COALESCE(p.name, cp.name) AS name, \
                ci.quantity, ci.unit_price, ci.subtotal, ci.created_at \
         FROM cart_items ci \
         LEFT JOIN products p ON p.id = ci.product_id \
         LEFT JOIN custom_products cp ON cp.id = ci.custom_product_id \
         WHERE ci.cart_id = $1 \
         ORDER BY ci.created_at, ci.id",
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Recompute and store a cart's subtotal and total from its lines.
pub(crate) async fn recompute_cart_totals(
    conn: &mut PgConnection,
    cart_id: Uuid,
) -> Result<CartRow, DbError> {
    let lines: Vec<(Decimal, i32)> =
        sqlx::query_as("SELECT unit_price, quantity FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .fetch_all(&mut *conn)
            .await?;

    let lines: Vec<CartLine> = lines
        .into_iter()
        .map(|(unit_price, quantity)| CartLine {
            unit_price,
            quantity,
        })
        .collect();
    let totals = compute_totals(&lines);
    check_amount("cart total", totals.total).map_err(DbError::Validation)?;

    let cart = sqlx::query_as::<_, CartRow>(&format!(
        "UPDATE carts SET subtotal = $2, total = $3, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {CART_COLUMNS}"
    ))
    .bind(cart_id)
    .bind(totals.subtotal)
    .bind(totals.total)
    .fetch_one(&mut *conn)
    .await?;
    Ok(cart)
}

/// Build a cart line, rejecting quantities or subtotals the cart columns
/// cannot store.
pub(crate) fn checked_line(unit_price: Decimal, quantity: i32) -> Result<CartLine, DbError> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(DbError::Validation(format!(
            "quantity must be at most {MAX_LINE_QUANTITY}"
        )));
    }
    let line = CartLine {
        unit_price,
        quantity,
    };
    check_amount("line subtotal", line.subtotal()).map_err(DbError::Validation)?;
    Ok(line)
}

async fn check_product_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    requested: i32,
) -> Result<Decimal, DbError> {
    let (price, stock, is_active): (Decimal, i32, bool) =
        sqlx::query_as("SELECT price, stock, is_active FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(DbError::NotFound)?;

    if !is_active {
        return Err(DbError::Validation("product is not available".to_string()));
    }
    if stock < requested {
        return Err(DbError::InsufficientStock {
            product_id,
            available: stock,
            requested,
        });
    }
    Ok(price)
}

async fn owned_item(
    conn: &mut PgConnection,
    client_id: Uuid,
    item_id: Uuid,
) -> Result<(Uuid, Option<Uuid>, Decimal), DbError> {
    sqlx::query_as(
        "SELECT ci.cart_id, ci.product_id, ci.unit_price \
         FROM cart_items ci \
         JOIN carts c ON c.id = ci.cart_id \
         WHERE ci.id = $1 AND c.client_id = $2 \
         FOR UPDATE OF ci",
    )
    .bind(item_id)
    .bind(client_id)
    .fetch_optional(conn)
    .await?
    .ok_or(DbError::NotFound)
}

// ---------------------------------------------------------------------------
// Public operations
// ---------------------------------------------------------------------------

/// Returns the client's cart, creating an empty one on first access.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the queries fail.
pub async fn get_or_create_cart(pool: &PgPool, client_id: Uuid) -> Result<CartRow, DbError> {
    let mut tx = pool.begin().await?;
    let cart = ensure_cart(&mut tx, client_id).await?;
    tx.commit().await?;
    Ok(cart)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_cart_items(pool: &PgPool, cart_id: Uuid) -> Result<Vec<CartItemRow>, DbError> {
    let mut conn = pool.acquire().await?;
    cart_items_on(&mut conn, cart_id).await
}

/// Adds `quantity` of a product or custom product to the client's cart.
///
/// Adding something already in the cart increases that line's quantity and
/// refreshes its unit price. Products must be active with enough stock for
/// the resulting quantity; custom products must belong to the client.
///
/// # Errors
///
/// Returns [`DbError::Validation`] for a non-positive or oversized quantity,
/// a line or cart total too large to store, or an inactive product;
/// [`DbError::InsufficientStock`]; or [`DbError::NotFound`] when the target
/// does not exist (or is another client's custom product).
pub async fn add_cart_item(
    pool: &PgPool,
    client_id: Uuid,
    target: CartItemTarget,
    quantity: i32,
) -> Result<CartRow, DbError> {
    if quantity < 1 {
        return Err(DbError::Validation("quantity must be at least 1".to_string()));
    }

    let mut tx = pool.begin().await?;
    let cart = ensure_cart(&mut tx, client_id).await?;

    let (product_id, custom_product_id) = match target {
        CartItemTarget::Product(id) => (Some(id), None),
        CartItemTarget::CustomProduct(id) => (None, Some(id)),
    };

    let existing: Option<(Uuid, i32)> = sqlx::query_as(
        "SELECT id, quantity FROM cart_items \
         WHERE cart_id = $1 \
           AND product_id IS NOT DISTINCT FROM $2 \
           AND custom_product_id IS NOT DISTINCT FROM $3 \
         FOR UPDATE",
    )
    .bind(cart.id)
    .bind(product_id)
    .bind(custom_product_id)
    .fetch_optional(&mut *tx)
    .await?;

    let new_quantity = existing
        .map_or(0, |(_, q)| q)
        .checked_add(quantity)
        .ok_or_else(|| DbError::Validation("quantity is too large".to_string()))?;

    let unit_price = match target {
        CartItemTarget::Product(id) => check_product_stock(&mut tx, id, new_quantity).await?,
        CartItemTarget::CustomProduct(id) => {
            sqlx::query_scalar::<_, Decimal>(
                "SELECT price FROM custom_products WHERE id = $1 AND client_id = $2",
            )
            .bind(id)
            .bind(client_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?
        }
    };
    let line = checked_line(unit_price, new_quantity)?;

    if let Some((item_id, _)) = existing {
        sqlx::query(
            "UPDATE cart_items SET quantity = $2, unit_price = $3, subtotal = $4 WHERE id = $1",
        )
        .bind(item_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.subtotal())
        .execute(&mut *tx)
        .await?;
    } else {
        sqlx::query(
            "INSERT INTO cart_items \
               (cart_id, product_id, custom_product_id, quantity, unit_price, subtotal) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(cart.id)
        .bind(product_id)
        .bind(custom_product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.subtotal())
        .execute(&mut *tx)
        .await?;
    }

    let cart = recompute_cart_totals(&mut tx, cart.id).await?;
    tx.commit().await?;
    Ok(cart)
}

/// Sets the quantity of one of the client's cart lines; `0` removes the line.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the line is not in the client's cart,
/// [`DbError::Validation`] for a negative or oversized quantity, or
/// [`DbError::InsufficientStock`].
pub async fn set_cart_item_quantity(
    pool: &PgPool,
    client_id: Uuid,
    item_id: Uuid,
    quantity: i32,
) -> Result<CartRow, DbError> {
    if quantity < 0 {
        return Err(DbError::Validation("quantity must not be negative".to_string()));
    }

    let mut tx = pool.begin().await?;
    let (cart_id, product_id, unit_price) = owned_item(&mut tx, client_id, item_id).await?;

    if quantity == 0 {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
    } else {
        let line = checked_line(unit_price, quantity)?;
        if let Some(product_id) = product_id {
            check_product_stock(&mut tx, product_id, quantity).await?;
        }
        sqlx::query("UPDATE cart_items SET quantity = $2, subtotal = $3 WHERE id = $1")
            .bind(item_id)
            .bind(line.quantity)
            .bind(line.subtotal())
            .execute(&mut *tx)
            .await?;
    }

    let cart = recompute_cart_totals(&mut tx, cart_id).await?;
    tx.commit().await?;
    Ok(cart)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the line is not in the client's cart.
pub async fn remove_cart_item(
    pool: &PgPool,
    client_id: Uuid,
    item_id: Uuid,
) -> Result<CartRow, DbError> {
    set_cart_item_quantity(pool, client_id, item_id, 0).await
}

/// Removes every line from the client's cart.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the queries fail.
pub async fn clear_cart(pool: &PgPool, client_id: Uuid) -> Result<CartRow, DbError> {
    let mut tx = pool.begin().await?;
    let cart = ensure_cart(&mut tx, client_id).await?;

    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart.id)
        .execute(&mut *tx)
        .await?;

    let cart = recompute_cart_totals(&mut tx, cart.id).await?;
    tx.commit().await?;
    Ok(cart)
}
