use artisan_core::{Role, SaleStatus};
use artisan_db::{SaleFilter, SaleItemRow, SaleRow};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{AuthUser, RequestId};

use super::{
    map_db_error, normalize_limit, normalize_offset, notifications::spawn_push, required_text,
    require_role, validation_error, ApiError, ApiResponse, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub(super) struct CheckoutRequest {
    /// Falls back to the address on the client's profile.
    pub shipping_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SaleQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SaleDetail {
    #[serde(flatten)]
    pub sale: SaleRow,
    pub items: Vec<SaleItemRow>,
}

fn parse_status(req_id: &RequestId, raw: &str) -> Result<SaleStatus, ApiError> {
    raw.trim()
        .to_ascii_lowercase()
        .parse::<SaleStatus>()
        .map_err(|_| validation_error(req_id, format!("unknown sale status '{raw}'")))
}

async fn sale_detail(state: &AppState, req_id: &RequestId, sale: SaleRow) -> Result<SaleDetail, ApiError> {
    let items = artisan_db::list_sale_items(&state.pool, sale.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(SaleDetail { sale, items })
}

/// Persist a status notification for the sale's client and queue a push.
async fn notify_status_change(state: &AppState, sale: &SaleRow, status: SaleStatus) {
    let title = "Order update".to_string();
    let body = status.notification_text().to_string();

    if let Err(e) =
        artisan_db::create_notification(&state.pool, Some(sale.client_id), &title, &body).await
    {
        tracing::warn!(error = %e, sale_id = %sale.id, "failed to store sale notification");
        return;
    }
    let data = serde_json::json!({ "sale_id": sale.id, "status": status.as_str() });
    spawn_push(state, Some(sale.client_id), title, body, data);
}

/// POST /api/v1/sales/checkout
///
/// Converts the caller's cart into a pending sale and empties the cart.
pub(super) async fn checkout(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    body: Option<Json<CheckoutRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<SaleDetail>>), ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let address = body
        .shipping_address
        .as_deref()
        .map(|a| required_text(&req_id, "shipping_address", a, 500))
        .transpose()?;

    let sale = artisan_db::checkout(&state.pool, user.id, address.as_deref())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(sale_id = %sale.id, client_id = %user.id, total = %sale.total, "checkout completed");
    notify_status_change(&state, &sale, SaleStatus::Pending).await;

    let detail = sale_detail(&state, &req_id, sale).await?;
    Ok((StatusCode::CREATED, ApiResponse::new(&req_id, detail)))
}

/// GET /api/v1/sales
///
/// Clients see their own sales; admins see everyone's.
pub(super) async fn list_sales(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<SaleQuery>,
) -> Result<Json<ApiResponse<Vec<SaleRow>>>, ApiError> {
    let client_id = match user.role {
        Role::Admin => None,
        Role::Client => Some(user.id),
        Role::Usuario => {
            return Err(ApiError::new(
                req_id.0,
                "forbidden",
                "this action requires the client or admin role",
            ))
        }
    };
    let status = params
        .status
        .as_deref()
        .map(|s| parse_status(&req_id, s))
        .transpose()?;

    let filter = SaleFilter {
        client_id,
        status,
        limit: normalize_limit(params.limit),
        offset: normalize_offset(params.offset),
    };
    let rows = artisan_db::list_sales(&state.pool, filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, rows))
}

/// GET /api/v1/sales/{id}
pub(super) async fn get_sale(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SaleDetail>>, ApiError> {
    let sale = artisan_db::get_sale(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let allowed = match user.role {
        Role::Admin => true,
        Role::Client => sale.client_id == user.id,
        Role::Usuario => false,
    };
    if !allowed {
        return Err(ApiError::new(
            req_id.0,
            "forbidden",
            "sale belongs to another client",
        ));
    }

    let detail = sale_detail(&state, &req_id, sale).await?;
    Ok(ApiResponse::new(&req_id, detail))
}

/// PATCH /api/v1/sales/{id}/status (admin)
pub(super) async fn update_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<SaleRow>>, ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    let next = parse_status(&req_id, &body.status)?;

    let sale = artisan_db::update_sale_status(&state.pool, id, next)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(sale_id = %id, status = %next, "sale status updated");
    notify_status_change(&state, &sale, next).await;
    Ok(ApiResponse::new(&req_id, sale))
}

/// POST /api/v1/sales/{id}/cancel
///
/// Clients may cancel their own sale while it is still pending.
pub(super) async fn cancel_sale(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SaleRow>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let sale = artisan_db::cancel_sale(&state.pool, id, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(sale_id = %id, client_id = %user.id, "sale cancelled by client");
    notify_status_change(&state, &sale, SaleStatus::Cancelled).await;
    Ok(ApiResponse::new(&req_id, sale))
}
