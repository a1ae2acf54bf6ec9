use artisan_core::{slug_from_name, Role};
use artisan_db::CategoryRow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{AuthUser, RequestId};

use super::{
    map_db_error, map_unique_violation, nullable, required_text, require_role, validation_error,
    ApiError, ApiResponse, AppState,
};

const DUPLICATE_SLUG: &str = "a category with that name already exists";

#[derive(Debug, Deserialize)]
pub(super) struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

fn slug_for(req_id: &RequestId, name: &str) -> Result<String, ApiError> {
    let slug = slug_from_name(name);
    if slug.is_empty() {
        return Err(validation_error(
            req_id,
            "name must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

/// GET /api/v1/categories
pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<CategoryRow>>>, ApiError> {
    let rows = artisan_db::list_categories(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, rows))
}

/// GET /api/v1/categories/{id}
pub(super) async fn get_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CategoryRow>>, ApiError> {
    let row = artisan_db::get_category(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, row))
}

/// POST /api/v1/categories (admin)
pub(super) async fn create_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryRow>>), ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    let name = required_text(&req_id, "name", &body.name, 120)?;
    let slug = slug_for(&req_id, &name)?;

    let row = artisan_db::create_category(&state.pool, &name, &slug, body.description.as_deref())
        .await
        .map_err(|e| map_unique_violation(&req_id, &e, DUPLICATE_SLUG))?;

    Ok((StatusCode::CREATED, ApiResponse::new(&req_id, row)))
}

/// PATCH /api/v1/categories/{id} (admin)
pub(super) async fn update_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryRow>>, ApiError> {
    require_role(&req_id, &user, Role::Admin)?;

    let renamed = match body.name.as_deref() {
        Some(raw) => {
            let name = required_text(&req_id, "name", raw, 120)?;
            let slug = slug_for(&req_id, &name)?;
            Some((name, slug))
        }
        None => None,
    };

    let row = artisan_db::update_category(
        &state.pool,
        id,
        renamed.as_ref().map(|(n, s)| (n.as_str(), s.as_str())),
        body.description.as_ref().map(Option::as_deref),
    )
    .await
    .map_err(|e| map_unique_violation(&req_id, &e, DUPLICATE_SLUG))?;

    Ok(ApiResponse::new(&req_id, row))
}

/// DELETE /api/v1/categories/{id} (admin)
pub(super) async fn delete_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    artisan_db::delete_category(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(StatusCode::NO_CONTENT)
}
