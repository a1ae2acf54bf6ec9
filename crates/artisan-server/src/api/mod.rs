mod accounts;
mod cart;
mod categories;
mod custom_products;
mod ingredients;
mod notifications;
mod products;
mod recommendation;
mod sales;
mod uploads;

use std::{path::PathBuf, sync::Arc, time::Duration};

use artisan_core::Role;
use artisan_db::DbError;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth::JwtService;
use crate::inference::InferenceClient;
use crate::middleware::{
    enforce_rate_limit, optional_auth, request_id, require_auth, AuthState, AuthUser,
    RateLimitState, RequestId,
};
use crate::push::PushClient;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt: Arc<JwtService>,
    /// `None` when no inference API is configured.
    pub inference: Option<Arc<InferenceClient>>,
    /// `None` disables push delivery; notifications are still stored.
    pub push: Option<Arc<PushClient>>,
    pub uploads: UploadSettings,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

/// `limit`/`offset` query parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub(super) struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: &RequestId, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id.0.clone()),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn normalize_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

pub(super) fn validation_error(request_id: &RequestId, message: impl Into<String>) -> ApiError {
    ApiError::new(request_id.0.clone(), "validation_error", message)
}

pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound => ApiError::new(request_id, "not_found", "resource not found"),
        DbError::Conflict(message) => ApiError::new(request_id, "conflict", message.clone()),
        DbError::InvalidSaleTransition { .. } => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        DbError::Validation(_)
        | DbError::Composition(_)
        | DbError::Core(_)
        | DbError::InsufficientStock { .. } => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        _ if error.is_unique_violation() => {
            ApiError::new(request_id, "conflict", "resource already exists")
        }
        _ if error.is_foreign_key_violation() => ApiError::new(
            request_id,
            "validation_error",
            "referenced resource does not exist",
        ),
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", error.to_string())
        }
    }
}

pub(super) fn map_unique_violation(request_id: &RequestId, e: &DbError, message: &str) -> ApiError {
    if e.is_unique_violation() {
        return ApiError::new(request_id.0.clone(), "conflict", message);
    }
    map_db_error(request_id.0.clone(), e)
}

/// Trim `value` and require 1..=`max_chars` characters.
pub(super) fn required_text(
    request_id: &RequestId,
    field: &str,
    value: &str,
    max_chars: usize,
) -> Result<String, ApiError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > max_chars {
        return Err(validation_error(
            request_id,
            format!("{field} must be 1-{max_chars} characters"),
        ));
    }
    Ok(trimmed.to_owned())
}

pub(super) fn non_negative_price(request_id: &RequestId, price: Decimal) -> Result<Decimal, ApiError> {
    if price.is_sign_negative() {
        return Err(validation_error(request_id, "price must not be negative"));
    }
    let price = price.round_dp(2);
    artisan_core::check_amount("price", price).map_err(|msg| validation_error(request_id, msg))?;
    Ok(price)
}

/// Deserialize a PATCH field so that `null` means "clear" and an absent key
/// means "keep". Use with `#[serde(default)]`.
#[allow(clippy::option_option)]
pub(super) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Reject callers whose role is not `role`.
pub(super) fn require_role(
    request_id: &RequestId,
    user: &AuthUser,
    role: Role,
) -> Result<(), ApiError> {
    if user.role == role {
        Ok(())
    } else {
        Err(ApiError::new(
            request_id.0.clone(),
            "forbidden",
            format!("this action requires the {role} role"),
        ))
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

/// Routes open to anonymous callers. A valid token is still recorded.
fn public_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/auth/clients/register",
            post(accounts::register_client),
        )
        .route("/api/v1/auth/clients/login", post(accounts::login_client))
        .route("/api/v1/auth/admins/login", post(accounts::login_admin))
        .route(
            "/api/v1/auth/usuarios/register",
            post(accounts::register_usuario),
        )
        .route("/api/v1/auth/usuarios/login", post(accounts::login_usuario))
        .route("/api/v1/categories", get(categories::list_categories))
        .route("/api/v1/categories/{id}", get(categories::get_category))
        .route("/api/v1/ingredients", get(ingredients::list_ingredients))
        .route("/api/v1/ingredients/{id}", get(ingredients::get_ingredient))
        .route("/api/v1/products", get(products::list_products))
        .route("/api/v1/products/{id}", get(products::get_product))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(auth, optional_auth)),
        )
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/me", get(accounts::me))
        .route("/api/v1/admins", post(accounts::create_admin))
        .route("/api/v1/clients", get(accounts::list_clients))
        .route(
            "/api/v1/clients/me",
            get(accounts::get_own_profile).patch(accounts::update_own_profile),
        )
        .route(
            "/api/v1/clients/me/push-token",
            put(notifications::register_push_token),
        )
        .route(
            "/api/v1/clients/me/recently-viewed",
            get(products::recently_viewed),
        )
        .route("/api/v1/categories", post(categories::create_category))
        .route(
            "/api/v1/categories/{id}",
            patch(categories::update_category).delete(categories::delete_category),
        )
        .route(
            "/api/v1/categories/{id}/image",
            post(uploads::upload_category_image),
        )
        .route("/api/v1/ingredients", post(ingredients::create_ingredient))
        .route(
            "/api/v1/ingredients/{id}",
            patch(ingredients::update_ingredient).delete(ingredients::delete_ingredient),
        )
        .route(
            "/api/v1/ingredients/{id}/image",
            post(uploads::upload_ingredient_image),
        )
        .route("/api/v1/products", post(products::create_product))
        .route("/api/v1/products/most-viewed", get(products::most_viewed))
        .route(
            "/api/v1/products/{id}",
            patch(products::update_product).delete(products::delete_product),
        )
        .route(
            "/api/v1/products/{id}/image",
            post(uploads::upload_product_image),
        )
        .route(
            "/api/v1/custom-products",
            get(custom_products::list_custom_products).post(custom_products::create_custom_product),
        )
        .route(
            "/api/v1/custom-products/recommendation",
            post(recommendation::recommend_custom_product),
        )
        .route(
            "/api/v1/custom-products/{id}",
            get(custom_products::get_custom_product)
                .put(custom_products::update_custom_product)
                .delete(custom_products::delete_custom_product),
        )
        .route(
            "/api/v1/cart",
            get(cart::get_cart).delete(cart::clear_cart),
        )
        .route("/api/v1/cart/items", post(cart::add_item))
        .route(
            "/api/v1/cart/items/{item_id}",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/api/v1/sales/checkout", post(sales::checkout))
        .route("/api/v1/sales", get(sales::list_sales))
        .route("/api/v1/sales/{id}", get(sales::get_sale))
        .route("/api/v1/sales/{id}/status", patch(sales::update_status))
        .route("/api/v1/sales/{id}/cancel", post(sales::cancel_sale))
        .route(
            "/api/v1/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route(
            "/api/v1/notifications/{id}/read",
            patch(notifications::mark_read),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(auth, require_auth)),
        )
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let auth = AuthState::new(Arc::clone(&state.jwt));
    let uploads = ServeDir::new(&state.uploads.dir);
    // Multipart framing needs headroom above the image itself.
    let body_limit = state.uploads.max_bytes + 64 * 1024;

    let health_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(health_routes)
        .merge(public_router(auth.clone(), rate_limit.clone()))
        .merge(protected_router(auth, rate_limit))
        .nest_service("/uploads", uploads)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match artisan_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
