//! Client-owned custom products. Composition rules are enforced by
//! `artisan_core::compose` inside the database transaction.

use artisan_core::Role;
use artisan_db::{CustomProductRow, IngredientRow};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{AuthUser, RequestId};

use super::{map_db_error, required_text, require_role, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct CreateCustomProductRequest {
    pub name: String,
    pub category_id: Uuid,
    pub ingredient_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateCustomProductRequest {
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub ingredient_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub(super) struct CustomProductDetail {
    #[serde(flatten)]
    pub product: CustomProductRow,
    pub ingredients: Vec<IngredientRow>,
}

#[derive(Debug, Serialize)]
pub(super) struct DeleteCustomProductResponse {
    pub id: Uuid,
    pub carts_updated: usize,
}

/// Load a custom product and check the caller owns it.
async fn owned_custom_product(
    state: &AppState,
    req_id: &RequestId,
    user: &AuthUser,
    id: Uuid,
) -> Result<CustomProductRow, ApiError> {
    let row = artisan_db::get_custom_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    if row.client_id != user.id {
        return Err(ApiError::new(
            req_id.0.clone(),
            "forbidden",
            "custom product belongs to another client",
        ));
    }
    Ok(row)
}

async fn with_ingredients(
    state: &AppState,
    req_id: &RequestId,
    product: CustomProductRow,
) -> Result<CustomProductDetail, ApiError> {
    let ingredients = artisan_db::list_custom_product_ingredients(&state.pool, product.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(CustomProductDetail {
        product,
        ingredients,
    })
}

/// GET /api/v1/custom-products
pub(super) async fn list_custom_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<CustomProductRow>>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let rows = artisan_db::list_custom_products(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, rows))
}

/// GET /api/v1/custom-products/{id}
pub(super) async fn get_custom_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CustomProductDetail>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let row = owned_custom_product(&state, &req_id, &user, id).await?;
    let detail = with_ingredients(&state, &req_id, row).await?;
    Ok(ApiResponse::new(&req_id, detail))
}

/// POST /api/v1/custom-products
pub(super) async fn create_custom_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateCustomProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CustomProductDetail>>), ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let name = required_text(&req_id, "name", &body.name, 200)?;

    let row = artisan_db::create_custom_product(
        &state.pool,
        user.id,
        &name,
        body.category_id,
        &body.ingredient_ids,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(custom_product_id = %row.id, client_id = %user.id, price = %row.price, "custom product created");
    let detail = with_ingredients(&state, &req_id, row).await?;
    Ok((StatusCode::CREATED, ApiResponse::new(&req_id, detail)))
}

/// PUT /api/v1/custom-products/{id}
pub(super) async fn update_custom_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCustomProductRequest>,
) -> Result<Json<ApiResponse<CustomProductDetail>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    owned_custom_product(&state, &req_id, &user, id).await?;
    let name = body
        .name
        .as_deref()
        .map(|n| required_text(&req_id, "name", n, 200))
        .transpose()?;

    let row = artisan_db::update_custom_product(
        &state.pool,
        id,
        user.id,
        name.as_deref(),
        body.category_id,
        &body.ingredient_ids,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let detail = with_ingredients(&state, &req_id, row).await?;
    Ok(ApiResponse::new(&req_id, detail))
}

/// DELETE /api/v1/custom-products/{id}
pub(super) async fn delete_custom_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeleteCustomProductResponse>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    owned_custom_product(&state, &req_id, &user, id).await?;

    let carts_updated = artisan_db::delete_custom_product(&state.pool, id, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(custom_product_id = %id, carts_updated, "custom product deleted");
    Ok(ApiResponse::new(
        &req_id,
        DeleteCustomProductResponse { id, carts_updated },
    ))
}
