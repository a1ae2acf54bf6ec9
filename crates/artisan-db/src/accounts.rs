//! Database operations for `clients`, `admins`, and `usuarios`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `clients` table. Carries the password hash; never serialize directly.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClientRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub push_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsuarioRow {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Sparse profile update. `None` keeps the column; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate<'a> {
    pub name: Option<&'a str>,
    pub phone: Option<Option<&'a str>>,
    pub address: Option<Option<&'a str>>,
}

const CLIENT_COLUMNS: &str =
    "id, name, email, password_hash, phone, address, push_token, created_at, updated_at";

// ---------------------------------------------------------------------------
// clients
// ---------------------------------------------------------------------------

/// Inserts a client. `email` must already be normalized.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; a duplicate email surfaces
/// as a unique violation (see [`DbError::is_unique_violation`]).
pub async fn create_client(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
    phone: Option<&str>,
    address: Option<&str>,
) -> Result<ClientRow, DbError> {
    let row = sqlx::query_as::<_, ClientRow>(&format!(
        "INSERT INTO clients (name, email, password_hash, phone, address) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {CLIENT_COLUMNS}"
    ))
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(phone)
    .bind(address)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_client_by_email(pool: &PgPool, email: &str) -> Result<Option<ClientRow>, DbError> {
    let row = sqlx::query_as::<_, ClientRow>(&format!(
        "SELECT {CLIENT_COLUMNS} FROM clients WHERE LOWER(email) = LOWER($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no client has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_client(pool: &PgPool, id: Uuid) -> Result<ClientRow, DbError> {
    sqlx::query_as::<_, ClientRow>(&format!(
        "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns clients ordered by creation time, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_clients(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<ClientRow>, DbError> {
    let rows = sqlx::query_as::<_, ClientRow>(&format!(
        "SELECT {CLIENT_COLUMNS} FROM clients \
         ORDER BY created_at DESC, id \
         LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Applies a sparse profile update in a single `UPDATE … RETURNING`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the client does not exist, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn update_client(
    pool: &PgPool,
    id: Uuid,
    update: &ClientUpdate<'_>,
) -> Result<ClientRow, DbError> {
    sqlx::query_as::<_, ClientRow>(&format!(
        "UPDATE clients \
         SET name       = COALESCE($2, name), \
             phone      = CASE WHEN $3::BOOL THEN $4 ELSE phone END, \
             address    = CASE WHEN $5::BOOL THEN $6 ELSE address END, \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {CLIENT_COLUMNS}"
    ))
    .bind(id)
    .bind(update.name)
    .bind(update.phone.is_some())
    .bind(update.phone.flatten())
    .bind(update.address.is_some())
    .bind(update.address.flatten())
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Stores (or clears, with `None`) the device push token of a client.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the client does not exist, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn set_client_push_token(
    pool: &PgPool,
    id: Uuid,
    push_token: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE clients SET push_token = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(push_token)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Push tokens for one client, or for every client with a token when
/// `client_id` is `None` (broadcast).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_push_tokens(pool: &PgPool, client_id: Option<Uuid>) -> Result<Vec<String>, DbError> {
    let tokens = sqlx::query_scalar::<_, String>(
        "SELECT push_token FROM clients \
         WHERE push_token IS NOT NULL \
           AND ($1::UUID IS NULL OR id = $1)",
    )
    .bind(client_id)
    .fetch_all(pool)
    .await?;
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// admins
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including duplicate email).
pub async fn create_admin(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<AdminRow, DbError> {
    let row = sqlx::query_as::<_, AdminRow>(
        "INSERT INTO admins (name, email, password_hash) \
         VALUES ($1, $2, $3) \
         RETURNING id, name, email, password_hash, created_at",
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_admin_by_email(pool: &PgPool, email: &str) -> Result<Option<AdminRow>, DbError> {
    let row = sqlx::query_as::<_, AdminRow>(
        "SELECT id, name, email, password_hash, created_at \
         FROM admins WHERE LOWER(email) = LOWER($1)",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no admin has this id.
pub async fn get_admin(pool: &PgPool, id: Uuid) -> Result<AdminRow, DbError> {
    sqlx::query_as::<_, AdminRow>(
        "SELECT id, name, email, password_hash, created_at FROM admins WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

// ---------------------------------------------------------------------------
// usuarios (legacy accounts)
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including duplicate username).
pub async fn create_usuario(
    pool: &PgPool,
    username: &str,
    email: Option<&str>,
    password_hash: &str,
) -> Result<UsuarioRow, DbError> {
    let row = sqlx::query_as::<_, UsuarioRow>(
        "INSERT INTO usuarios (username, email, password_hash) \
         VALUES ($1, $2, $3) \
         RETURNING id, username, email, password_hash, created_at",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_usuario_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UsuarioRow>, DbError> {
    let row = sqlx::query_as::<_, UsuarioRow>(
        "SELECT id, username, email, password_hash, created_at \
         FROM usuarios WHERE LOWER(username) = LOWER($1)",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no usuario has this id.
pub async fn get_usuario(pool: &PgPool, id: Uuid) -> Result<UsuarioRow, DbError> {
    sqlx::query_as::<_, UsuarioRow>(
        "SELECT id, username, email, password_hash, created_at FROM usuarios WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
