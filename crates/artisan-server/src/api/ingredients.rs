use artisan_core::{IngredientKind, Role};
use artisan_db::{IngredientFilter, IngredientRow, IngredientUpdate, NewIngredient};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{AuthUser, MaybeAuthUser, RequestId};

use super::{
    map_db_error, map_unique_violation, non_negative_price, nullable, required_text,
    require_role, validation_error, ApiError, ApiResponse, AppState,
};

const DUPLICATE_NAME: &str = "an ingredient with that name already exists in this category";

#[derive(Debug, Deserialize)]
pub(super) struct IngredientQuery {
    pub category_id: Option<Uuid>,
    pub kind: Option<String>,
    /// Honoured for admins only.
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateIngredientRequest {
    pub category_id: Uuid,
    pub name: String,
    pub kind: String,
    pub price: Decimal,
    pub description: Option<String>,
}

#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateIngredientRequest {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

fn parse_kind(req_id: &RequestId, raw: &str) -> Result<IngredientKind, ApiError> {
    raw.parse::<IngredientKind>().map_err(|_| {
        validation_error(
            req_id,
            format!("kind must be one of mold, color, aroma, essence; got '{raw}'"),
        )
    })
}

/// GET /api/v1/ingredients
pub(super) async fn list_ingredients(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(caller): Extension<MaybeAuthUser>,
    Query(params): Query<IngredientQuery>,
) -> Result<Json<ApiResponse<Vec<IngredientRow>>>, ApiError> {
    let kind = params
        .kind
        .as_deref()
        .map(|k| parse_kind(&req_id, k))
        .transpose()?;
    let is_admin = caller.0.is_some_and(|u| u.role == Role::Admin);

    let filter = IngredientFilter {
        category_id: params.category_id,
        kind,
        active_only: !(is_admin && params.include_inactive),
    };
    let rows = artisan_db::list_ingredients(&state.pool, filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, rows))
}

/// GET /api/v1/ingredients/{id}
pub(super) async fn get_ingredient(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<IngredientRow>>, ApiError> {
    let row = artisan_db::get_ingredient(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, row))
}

/// POST /api/v1/ingredients (admin)
pub(super) async fn create_ingredient(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateIngredientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IngredientRow>>), ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    let name = required_text(&req_id, "name", &body.name, 200)?;
    let kind = parse_kind(&req_id, &body.kind)?;
    let price = non_negative_price(&req_id, body.price)?;

    let new = NewIngredient {
        category_id: body.category_id,
        name: &name,
        kind,
        price,
        description: body.description.as_deref(),
    };
    let row = artisan_db::create_ingredient(&state.pool, &new)
        .await
        .map_err(|e| map_unique_violation(&req_id, &e, DUPLICATE_NAME))?;

    Ok((StatusCode::CREATED, ApiResponse::new(&req_id, row)))
}

/// PATCH /api/v1/ingredients/{id} (admin)
///
/// Price changes apply to new custom products only; existing ones keep the
/// price they were composed at.
pub(super) async fn update_ingredient(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateIngredientRequest>,
) -> Result<Json<ApiResponse<IngredientRow>>, ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    let name = body
        .name
        .as_deref()
        .map(|n| required_text(&req_id, "name", n, 200))
        .transpose()?;
    let kind = body
        .kind
        .as_deref()
        .map(|k| parse_kind(&req_id, k))
        .transpose()?;
    let price = body
        .price
        .map(|p| non_negative_price(&req_id, p))
        .transpose()?;

    let update = IngredientUpdate {
        name: name.as_deref(),
        kind,
        price,
        description: body.description.as_ref().map(Option::as_deref),
        is_active: body.is_active,
    };
    let row = artisan_db::update_ingredient(&state.pool, id, &update)
        .await
        .map_err(|e| map_unique_violation(&req_id, &e, DUPLICATE_NAME))?;

    Ok(ApiResponse::new(&req_id, row))
}

/// DELETE /api/v1/ingredients/{id} (admin)
pub(super) async fn delete_ingredient(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    artisan_db::delete_ingredient(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(StatusCode::NO_CONTENT)
}
