//! Registration, login, and profile handlers for clients, admins, and
//! legacy usuarios.

use artisan_core::{normalize_email, validate_password, PasswordError, Role};
use artisan_db::{AdminRow, ClientRow, ClientUpdate, UsuarioRow};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{AuthUser, RequestId};

use super::{
    map_db_error, map_unique_violation, normalize_limit, normalize_offset, nullable,
    required_text, require_role, validation_error, ApiError, ApiResponse, AppState, PageQuery,
};

const INVALID_CREDENTIALS: &str = "invalid credentials";

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct RegisterClientRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EmailLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct RegisterUsuarioRequest {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct UsuarioLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateAdminRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateProfileRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub address: Option<Option<String>>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct ClientProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub has_push_token: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct AdminProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct UsuarioProfile {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile of any account, tagged with its role.
#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub(super) enum AccountProfile {
    Client(ClientProfile),
    Admin(AdminProfile),
    Usuario(UsuarioProfile),
}

#[derive(Debug, Serialize)]
pub(super) struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub account: AccountProfile,
}

impl From<ClientRow> for ClientProfile {
    fn from(row: ClientRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            has_push_token: row.push_token.is_some(),
            created_at: row.created_at,
        }
    }
}

impl From<AdminRow> for AdminProfile {
    fn from(row: AdminRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

impl From<UsuarioRow> for UsuarioProfile {
    fn from(row: UsuarioRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn checked_email(req_id: &RequestId, raw: &str) -> Result<String, ApiError> {
    normalize_email(raw).ok_or_else(|| validation_error(req_id, "email is not a valid address"))
}

fn checked_password(req_id: &RequestId, password: &str) -> Result<(), ApiError> {
    validate_password(password).map_err(|msg| validation_error(req_id, msg))
}

fn password_failure(req_id: &RequestId, e: &PasswordError) -> ApiError {
    tracing::error!(error = %e, "password hashing failed");
    ApiError::new(req_id.0.clone(), "internal_error", e.to_string())
}

/// Runs on the blocking pool.
async fn hash_password(req_id: &RequestId, password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || artisan_core::hash_password(&password))
        .await
        .map_err(|e| ApiError::new(req_id.0.clone(), "internal_error", e.to_string()))?
        .map_err(|e| password_failure(req_id, &e))
}

async fn password_matches(
    req_id: &RequestId,
    password: String,
    hash: String,
) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || artisan_core::verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::new(req_id.0.clone(), "internal_error", e.to_string()))?
        .map_err(|e| password_failure(req_id, &e))
}

fn unauthorized(req_id: &RequestId) -> ApiError {
    ApiError::new(req_id.0.clone(), "unauthorized", INVALID_CREDENTIALS)
}

fn issue_token(
    state: &AppState,
    req_id: &RequestId,
    id: Uuid,
    account: AccountProfile,
) -> Result<TokenResponse, ApiError> {
    let role = match &account {
        AccountProfile::Client(_) => Role::Client,
        AccountProfile::Admin(_) => Role::Admin,
        AccountProfile::Usuario(_) => Role::Usuario,
    };
    let token = state.jwt.issue(id, role).map_err(|e| {
        tracing::error!(error = %e, "token signing failed");
        ApiError::new(req_id.0.clone(), "internal_error", e.to_string())
    })?;
    Ok(TokenResponse {
        token,
        token_type: "Bearer",
        expires_in: state.jwt.ttl_secs(),
        account,
    })
}

fn optional_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/clients/register
pub(super) async fn register_client(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<RegisterClientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), ApiError> {
    let name = required_text(&req_id, "name", &body.name, 200)?;
    let email = checked_email(&req_id, &body.email)?;
    checked_password(&req_id, &body.password)?;
    let hash = hash_password(&req_id, body.password).await?;

    let row = artisan_db::create_client(
        &state.pool,
        &name,
        &email,
        &hash,
        optional_text(body.phone.as_deref()),
        optional_text(body.address.as_deref()),
    )
    .await
    .map_err(|e| map_unique_violation(&req_id, &e, "an account with that email already exists"))?;

    tracing::info!(client_id = %row.id, "client registered");
    let id = row.id;
    let token = issue_token(&state, &req_id, id, AccountProfile::Client(row.into()))?;
    Ok((StatusCode::CREATED, ApiResponse::new(&req_id, token)))
}

/// POST /api/v1/auth/clients/login
pub(super) async fn login_client(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<EmailLoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let email = normalize_email(&body.email).ok_or_else(|| unauthorized(&req_id))?;
    let row = artisan_db::get_client_by_email(&state.pool, &email)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| unauthorized(&req_id))?;

    if !password_matches(&req_id, body.password, row.password_hash.clone()).await? {
        return Err(unauthorized(&req_id));
    }

    let id = row.id;
    let token = issue_token(&state, &req_id, id, AccountProfile::Client(row.into()))?;
    Ok(ApiResponse::new(&req_id, token))
}

/// GET /api/v1/clients/me
pub(super) async fn get_own_profile(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<ClientProfile>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let row = artisan_db::get_client(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, row.into()))
}

/// PATCH /api/v1/clients/me
pub(super) async fn update_own_profile(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ClientProfile>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;

    let name = body
        .name
        .as_deref()
        .map(|n| required_text(&req_id, "name", n, 200))
        .transpose()?;
    let update = ClientUpdate {
        name: name.as_deref(),
        phone: body.phone.as_ref().map(|p| optional_text(p.as_deref())),
        address: body.address.as_ref().map(|a| optional_text(a.as_deref())),
    };

    let row = artisan_db::update_client(&state.pool, user.id, &update)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, row.into()))
}

/// GET /api/v1/clients (admin)
pub(super) async fn list_clients(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<ClientProfile>>>, ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    let rows = artisan_db::list_clients(
        &state.pool,
        normalize_limit(page.limit),
        normalize_offset(page.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(
        &req_id,
        rows.into_iter().map(ClientProfile::from).collect(),
    ))
}

// ---------------------------------------------------------------------------
// Admins
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/admins/login
pub(super) async fn login_admin(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<EmailLoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let email = normalize_email(&body.email).ok_or_else(|| unauthorized(&req_id))?;
    let row = artisan_db::get_admin_by_email(&state.pool, &email)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| unauthorized(&req_id))?;

    if !password_matches(&req_id, body.password, row.password_hash.clone()).await? {
        return Err(unauthorized(&req_id));
    }

    let id = row.id;
    let token = issue_token(&state, &req_id, id, AccountProfile::Admin(row.into()))?;
    Ok(ApiResponse::new(&req_id, token))
}

/// POST /api/v1/admins (admin creates admin)
pub(super) async fn create_admin(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AdminProfile>>), ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    let name = required_text(&req_id, "name", &body.name, 200)?;
    let email = checked_email(&req_id, &body.email)?;
    checked_password(&req_id, &body.password)?;
    let hash = hash_password(&req_id, body.password).await?;

    let row = artisan_db::create_admin(&state.pool, &name, &email, &hash)
        .await
        .map_err(|e| map_unique_violation(&req_id, &e, "an admin with that email already exists"))?;

    tracing::info!(admin_id = %row.id, created_by = %user.id, "admin created");
    Ok((StatusCode::CREATED, ApiResponse::new(&req_id, row.into())))
}

// ---------------------------------------------------------------------------
// Usuarios
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/usuarios/register
pub(super) async fn register_usuario(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<RegisterUsuarioRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), ApiError> {
    let username = required_text(&req_id, "username", &body.username, 100)?;
    if username.contains(char::is_whitespace) {
        return Err(validation_error(&req_id, "username must not contain spaces"));
    }
    let email = match optional_text(body.email.as_deref()) {
        Some(raw) => Some(checked_email(&req_id, raw)?),
        None => None,
    };
    checked_password(&req_id, &body.password)?;
    let hash = hash_password(&req_id, body.password).await?;

    let row = artisan_db::create_usuario(&state.pool, &username, email.as_deref(), &hash)
        .await
        .map_err(|e| map_unique_violation(&req_id, &e, "that username is already taken"))?;

    let id = row.id;
    let token = issue_token(&state, &req_id, id, AccountProfile::Usuario(row.into()))?;
    Ok((StatusCode::CREATED, ApiResponse::new(&req_id, token)))
}

/// POST /api/v1/auth/usuarios/login
pub(super) async fn login_usuario(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<UsuarioLoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let row = artisan_db::get_usuario_by_username(&state.pool, body.username.trim())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| unauthorized(&req_id))?;

    if !password_matches(&req_id, body.password, row.password_hash.clone()).await? {
        return Err(unauthorized(&req_id));
    }

    let id = row.id;
    let token = issue_token(&state, &req_id, id, AccountProfile::Usuario(row.into()))?;
    Ok(ApiResponse::new(&req_id, token))
}

// ---------------------------------------------------------------------------
// Any role
// ---------------------------------------------------------------------------

/// GET /api/v1/auth/me
pub(super) async fn me(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<AccountProfile>>, ApiError> {
    let profile = match user.role {
        Role::Client => artisan_db::get_client(&state.pool, user.id)
            .await
            .map(|row| AccountProfile::Client(row.into())),
        Role::Admin => artisan_db::get_admin(&state.pool, user.id)
            .await
            .map(|row| AccountProfile::Admin(row.into())),
        Role::Usuario => artisan_db::get_usuario(&state.pool, user.id)
            .await
            .map(|row| AccountProfile::Usuario(row.into())),
    }
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(&req_id, profile))
}
