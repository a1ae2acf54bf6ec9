use artisan_core::Role;
use artisan_db::{NewProduct, ProductFilter, ProductRow, ProductUpdate, ProductViewCountRow};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{AuthUser, MaybeAuthUser, RequestId};

use super::{
    map_db_error, map_unique_violation, non_negative_price, normalize_limit, normalize_offset,
    nullable, required_text, require_role, validation_error, ApiError, ApiResponse, AppState,
    PageQuery,
};

const DUPLICATE_NAME: &str = "a product with that name already exists in this category";

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    /// Honoured for admins only.
    #[serde(default)]
    pub include_inactive: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateProductRequest {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
}

#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateProductRequest {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(super) struct DeleteProductResponse {
    pub id: Uuid,
    pub carts_updated: usize,
}

fn checked_stock(req_id: &RequestId, stock: i32) -> Result<i32, ApiError> {
    if stock < 0 {
        return Err(validation_error(req_id, "stock must not be negative"));
    }
    Ok(stock)
}

/// GET /api/v1/products
pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(caller): Extension<MaybeAuthUser>,
    Query(params): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<ProductRow>>>, ApiError> {
    let is_admin = caller.0.is_some_and(|u| u.role == Role::Admin);
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let filter = ProductFilter {
        category_id: params.category_id,
        search,
        include_inactive: is_admin && params.include_inactive,
        limit: normalize_limit(params.limit),
        offset: normalize_offset(params.offset),
    };
    let rows = artisan_db::list_products(&state.pool, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, rows))
}

/// GET /api/v1/products/{id}
///
/// Records a view, attributed to the caller when a client token is present.
pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(caller): Extension<MaybeAuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductRow>>, ApiError> {
    let row = artisan_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let is_admin = caller.0.is_some_and(|u| u.role == Role::Admin);
    if !row.is_active && !is_admin {
        return Err(ApiError::new(req_id.0, "not_found", "resource not found"));
    }

    let viewer = caller.0.filter(|u| u.role == Role::Client).map(|u| u.id);
    if let Err(e) = artisan_db::record_product_view(&state.pool, id, viewer).await {
        tracing::warn!(error = %e, product_id = %id, "failed to record product view");
    }

    Ok(ApiResponse::new(&req_id, row))
}

/// GET /api/v1/products/most-viewed (admin)
pub(super) async fn most_viewed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<ProductViewCountRow>>>, ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    let rows = artisan_db::most_viewed_products(&state.pool, normalize_limit(page.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, rows))
}

/// GET /api/v1/clients/me/recently-viewed
pub(super) async fn recently_viewed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<ProductRow>>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let limit = page.limit.unwrap_or(10).clamp(1, 50);
    let rows = artisan_db::recently_viewed_products(&state.pool, user.id, limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, rows))
}

/// POST /api/v1/products (admin)
pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductRow>>), ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    let name = required_text(&req_id, "name", &body.name, 200)?;
    let price = non_negative_price(&req_id, body.price)?;
    let stock = checked_stock(&req_id, body.stock)?;

    let new = NewProduct {
        category_id: body.category_id,
        name: &name,
        description: body.description.as_deref(),
        price,
        stock,
    };
    let row = artisan_db::create_product(&state.pool, &new)
        .await
        .map_err(|e| map_unique_violation(&req_id, &e, DUPLICATE_NAME))?;

    Ok((StatusCode::CREATED, ApiResponse::new(&req_id, row)))
}

/// PATCH /api/v1/products/{id} (admin)
pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductRow>>, ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    let name = body
        .name
        .as_deref()
        .map(|n| required_text(&req_id, "name", n, 200))
        .transpose()?;
    let price = body
        .price
        .map(|p| non_negative_price(&req_id, p))
        .transpose()?;
    let stock = body
        .stock
        .map(|s| checked_stock(&req_id, s))
        .transpose()?;

    let update = ProductUpdate {
        category_id: body.category_id,
        name: name.as_deref(),
        description: body.description.as_ref().map(Option::as_deref),
        price,
        stock,
        is_active: body.is_active,
    };
    let row = artisan_db::update_product(&state.pool, id, &update)
        .await
        .map_err(|e| map_unique_violation(&req_id, &e, DUPLICATE_NAME))?;

    Ok(ApiResponse::new(&req_id, row))
}

/// DELETE /api/v1/products/{id} (admin)
///
/// Soft delete: the product is deactivated and dropped from every cart.
pub(super) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeleteProductResponse>>, ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    let carts_updated = artisan_db::delete_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(product_id = %id, carts_updated, "product deactivated");
    Ok(ApiResponse::new(
        &req_id,
        DeleteProductResponse { id, carts_updated },
    ))
}
