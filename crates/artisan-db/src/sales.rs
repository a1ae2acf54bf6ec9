//! Database operations for `sales` and `sale_items`.

use artisan_core::{compute_totals, SaleStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::carts::{cart_items_on, recompute_cart_totals, CartItemRow};
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SaleRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub status: String,
    pub total: Decimal,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A snapshot of one cart line taken at checkout.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SaleItemRow {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Option<Uuid>,
    pub custom_product_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SaleFilter {
    /// Restrict to one client's sales; `None` lists everyone's.
    pub client_id: Option<Uuid>,
    pub status: Option<SaleStatus>,
    pub limit: i64,
    pub offset: i64,
}

const SALE_COLUMNS: &str =
    "id, client_id, status, total, shipping_address, created_at, updated_at";

// ---------------------------------------------------------------------------
// Checkout
// ---------------------------------------------------------------------------

/// Product lines of a cart as `(product_id, quantity)`, ordered by product id
/// so concurrent checkouts lock product rows in the same order.
fn reservation_order(items: &[CartItemRow]) -> Vec<(Uuid, i32)> {
    let mut lines: Vec<(Uuid, i32)> = items
        .iter()
        .filter_map(|item| item.product_id.map(|id| (id, item.quantity)))
        .collect();
    lines.sort_by_key(|&(id, _)| id);
    lines
}

async fn reserve_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), DbError> {
    let reserved = sqlx::query(
        "UPDATE products SET stock = stock - $2, updated_at = NOW() \
         WHERE id = $1 AND is_active AND stock >= $2",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if reserved.rows_affected() == 0 {
        let available: i32 = sqlx::query_scalar(
            "SELECT CASE WHEN is_active THEN stock ELSE 0 END FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .unwrap_or(0);
        return Err(DbError::InsufficientStock {
            product_id,
            available,
            requested: quantity,
        });
    }
    Ok(())
}

/// Converts the client's cart into a `pending` sale.
///
/// In one transaction: snapshots every line into `sale_items`, decrements
/// product stock, and empties the cart. The shipping address defaults to the
/// client's profile address.
///
/// # Errors
///
/// Returns [`DbError::Validation`] if the cart is empty, or
/// [`DbError::InsufficientStock`] if any product cannot cover its line.
pub async fn checkout(
    pool: &PgPool,
    client_id: Uuid,
    shipping_address: Option<&str>,
) -> Result<SaleRow, DbError> {
    let mut tx = pool.begin().await?;

    let cart_id: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM carts WHERE client_id = $1 FOR UPDATE")
            .bind(client_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some(cart_id) = cart_id else {
        return Err(DbError::Validation("cart is empty".to_string()));
    };

    let items = cart_items_on(&mut tx, cart_id).await?;
    if items.is_empty() {
        return Err(DbError::Validation("cart is empty".to_string()));
    }

    for (product_id, quantity) in reservation_order(&items) {
        reserve_stock(&mut tx, product_id, quantity).await?;
    }

    let lines: Vec<_> = items.iter().map(CartItemRow::line).collect();
    let totals = compute_totals(&lines);

    let sale = sqlx::query_as::<_, SaleRow>(&format!(
        "INSERT INTO sales (client_id, status, total, shipping_address) \
         VALUES ($1, 'pending', $2, \
                 COALESCE($3, (SELECT address FROM clients WHERE id = $1))) \
         RETURNING {SALE_COLUMNS}"
    ))
    .bind(client_id)
    .bind(totals.total)
    .bind(shipping_address)
    .fetch_one(&mut *tx)
    .await?;

    for item in &items {
        sqlx::query(
            "INSERT INTO sale_items \
               (sale_id, product_id, custom_product_id, name, quantity, unit_price, subtotal) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(sale.id)
        .bind(item.product_id)
        .bind(item.custom_product_id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.line().subtotal())
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;
    recompute_cart_totals(&mut tx, cart_id).await?;

    tx.commit().await?;
    Ok(sale)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Lists sales newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sales(pool: &PgPool, filter: SaleFilter) -> Result<Vec<SaleRow>, DbError> {
    let rows = sqlx::query_as::<_, SaleRow>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales \
         WHERE ($1::UUID IS NULL OR client_id = $1) \
           AND ($2::TEXT IS NULL OR status = $2) \
         ORDER BY created_at DESC, id \
         LIMIT $3 OFFSET $4"
    ))
    .bind(filter.client_id)
    .bind(filter.status.map(SaleStatus::as_str))
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the sale does not exist.
pub async fn get_sale(pool: &PgPool, id: Uuid) -> Result<SaleRow, DbError> {
    sqlx::query_as::<_, SaleRow>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sale_items(pool: &PgPool, sale_id: Uuid) -> Result<Vec<SaleItemRow>, DbError> {
    let rows = sqlx::query_as::<_, SaleItemRow>(
        "SELECT id, sale_id, product_id, custom_product_id, name, quantity, unit_price, subtotal \
         FROM sale_items \
         WHERE sale_id = $1 \
         ORDER BY name, id",
    )
    .bind(sale_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

async fn transition(
    conn: &mut PgConnection,
    id: Uuid,
    from: SaleStatus,
    to: SaleStatus,
) -> Result<SaleRow, DbError> {
    if !from.can_transition_to(to) {
        return Err(DbError::InvalidSaleTransition { id, from, to });
    }

    if to.restores_stock() {
        sqlx::query(
            "UPDATE products p \
             SET stock = p.stock + si.quantity, updated_at = NOW() \
             FROM sale_items si \
             WHERE si.sale_id = $1 AND si.product_id = p.id",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
    }

    let row = sqlx::query_as::<_, SaleRow>(&format!(
        "UPDATE sales SET status = $2, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {SALE_COLUMNS}"
    ))
    .bind(id)
    .bind(to.as_str())
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Moves a sale to `next`, validated by [`SaleStatus::can_transition_to`].
/// Cancelling returns the sale's products to stock.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the sale does not exist or
/// [`DbError::InvalidSaleTransition`] if the move is not allowed.
pub async fn update_sale_status(
    pool: &PgPool,
    id: Uuid,
    next: SaleStatus,
) -> Result<SaleRow, DbError> {
    let mut tx = pool.begin().await?;

    let current: String = sqlx::query_scalar("SELECT status FROM sales WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

    let row = transition(&mut tx, id, current.parse()?, next).await?;
    tx.commit().await?;
    Ok(row)
}

/// Client-initiated cancellation, allowed only while the sale is `pending`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the client owns no such sale, or
/// [`DbError::InvalidSaleTransition`] if it is no longer pending.
pub async fn cancel_sale(pool: &PgPool, id: Uuid, client_id: Uuid) -> Result<SaleRow, DbError> {
    let mut tx = pool.begin().await?;

    let current: String = sqlx::query_scalar(
        "SELECT status FROM sales WHERE id = $1 AND client_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(client_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    let from: SaleStatus = current.parse()?;
    if from != SaleStatus::Pending {
        return Err(DbError::InvalidSaleTransition {
            id,
            from,
            to: SaleStatus::Cancelled,
        });
    }

    let row = transition(&mut tx, id, from, SaleStatus::Cancelled).await?;
    tx.commit().await?;
    Ok(row)
}
