use artisan_core::Role;
use artisan_db::{CartItemRow, CartItemTarget, CartRow};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{AuthUser, RequestId};

use super::{map_db_error, require_role, validation_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct AddItemRequest {
    pub product_id: Option<Uuid>,
    pub custom_product_id: Option<Uuid>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub(super) struct CartView {
    #[serde(flatten)]
    pub cart: CartRow,
    pub item_count: i64,
    pub items: Vec<CartItemRow>,
}

fn target(req_id: &RequestId, body: &AddItemRequest) -> Result<CartItemTarget, ApiError> {
    match (body.product_id, body.custom_product_id) {
        (Some(id), None) => Ok(CartItemTarget::Product(id)),
        (None, Some(id)) => Ok(CartItemTarget::CustomProduct(id)),
        _ => Err(validation_error(
            req_id,
            "exactly one of product_id or custom_product_id is required",
        )),
    }
}

async fn cart_view(state: &AppState, req_id: &RequestId, cart: CartRow) -> Result<CartView, ApiError> {
    let items = artisan_db::list_cart_items(&state.pool, cart.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let item_count = items.iter().map(|i| i64::from(i.quantity)).sum();
    Ok(CartView {
        cart,
        item_count,
        items,
    })
}

/// GET /api/v1/cart
pub(super) async fn get_cart(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let cart = artisan_db::get_or_create_cart(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let view = cart_view(&state, &req_id, cart).await?;
    Ok(ApiResponse::new(&req_id, view))
}

/// POST /api/v1/cart/items
pub(super) async fn add_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let target = target(&req_id, &body)?;
    if body.quantity < 1 {
        return Err(validation_error(&req_id, "quantity must be at least 1"));
    }

    let cart = artisan_db::add_cart_item(&state.pool, user.id, target, body.quantity)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let view = cart_view(&state, &req_id, cart).await?;
    Ok(ApiResponse::new(&req_id, view))
}

/// PATCH /api/v1/cart/items/{item_id}
///
/// A quantity of zero removes the line.
pub(super) async fn update_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(item_id): Path<Uuid>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let cart = artisan_db::set_cart_item_quantity(&state.pool, user.id, item_id, body.quantity)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let view = cart_view(&state, &req_id, cart).await?;
    Ok(ApiResponse::new(&req_id, view))
}

/// DELETE /api/v1/cart/items/{item_id}
pub(super) async fn remove_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let cart = artisan_db::remove_cart_item(&state.pool, user.id, item_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let view = cart_view(&state, &req_id, cart).await?;
    Ok(ApiResponse::new(&req_id, view))
}

/// DELETE /api/v1/cart
pub(super) async fn clear_cart(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let cart = artisan_db::clear_cart(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let view = cart_view(&state, &req_id, cart).await?;
    Ok(ApiResponse::new(&req_id, view))
}
