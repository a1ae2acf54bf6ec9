use artisan_core::{AppConfig, CompositionError, CoreError, SaleStatus};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/artisan-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Composition(#[from] CompositionError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("cannot move sale {id} from {from} to {to}")]
    InvalidSaleTransition {
        id: Uuid,
        from: SaleStatus,
        to: SaleStatus,
    },
    #[error("insufficient stock for product {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: Uuid,
        available: i32,
        requested: i32,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// True when the underlying Postgres error is a unique-constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.has_pg_code("23505")
    }

    /// True when the underlying Postgres error is a foreign-key violation.
    #[must_use]
    pub fn is_foreign_key_violation(&self) -> bool {
        self.has_pg_code("23503")
    }

    fn has_pg_code(&self, code: &str) -> bool {
        matches!(
            self,
            DbError::Sqlx(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some(code)
        )
    }
}

/// Map a unique violation to [`DbError::Conflict`] with a caller-facing message.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> DbError {
    let err = DbError::from(err);
    if err.is_unique_violation() {
        DbError::Conflict(message.to_string())
    } else {
        err
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table does not exist yet on a fresh database.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Run a full health check: ping the pool and return a typed error on failure.
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}


pub mod accounts;
pub mod carts;
pub mod categories;
pub mod custom_products;
pub mod ingredients;
pub mod notifications;
pub mod product_views;
pub mod products;
pub mod sales;
pub mod seed;

pub use accounts::{
    create_admin, create_client, create_usuario, get_admin, get_admin_by_email, get_client,
    get_client_by_email, get_usuario, get_usuario_by_username, list_clients, list_push_tokens,
    set_client_push_token, update_client, AdminRow, ClientRow, ClientUpdate, UsuarioRow,
};
pub use carts::{
    add_cart_item, clear_cart, get_or_create_cart, list_cart_items, remove_cart_item,
    set_cart_item_quantity, CartItemRow, CartItemTarget, CartRow,
};
pub use categories::{
    create_category, delete_category, get_category, list_categories, set_category_image,
    update_category, CategoryRow,
};
pub use custom_products::{
    create_custom_product, delete_custom_product, get_custom_product,
    list_custom_product_ingredients, list_custom_products, update_custom_product,
    CustomProductRow,
};
pub use ingredients::{
    create_ingredient, delete_ingredient, get_ingredient, list_ingredients, set_ingredient_image,
    update_ingredient, IngredientFilter, IngredientRow, IngredientUpdate, NewIngredient,
};
pub use notifications::{
    create_notification, list_notifications_for_client, mark_notification_read, NotificationRow,
};
pub use product_views::{
    most_viewed_products, record_product_view, recently_viewed_products, ProductViewCountRow,
};
pub use products::{
    create_product, delete_product, get_product, list_products, set_product_image,
    update_product, NewProduct, ProductFilter, ProductRow, ProductUpdate,
};
pub use sales::{
    cancel_sale, checkout, get_sale, list_sale_items, list_sales, update_sale_status,
    SaleFilter, SaleItemRow, SaleRow,
};
pub use seed::{seed_catalog, SeedSummary};
