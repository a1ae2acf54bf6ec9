use artisan_core::Role;
use artisan_db::NotificationRow;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{AuthUser, RequestId};

use super::{
    map_db_error, normalize_limit, normalize_offset, required_text, require_role,
    validation_error, ApiError, ApiResponse, AppState, PageQuery,
};

#[derive(Debug, Deserialize)]
pub(super) struct CreateNotificationRequest {
    /// Absent for a broadcast to every client.
    pub client_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(super) struct PushTokenRequest {
    /// `null` unregisters the device.
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct PushTokenResponse {
    pub registered: bool,
}

/// Store-and-forward: deliver a push in the background. Delivery problems
/// are logged; the stored notification is the source of truth.
pub(super) fn spawn_push(
    state: &AppState,
    client_id: Option<Uuid>,
    title: String,
    body: String,
    data: serde_json::Value,
) {
    let Some(push) = state.push.clone() else {
        tracing::debug!(?client_id, "push delivery disabled; notification stored only");
        return;
    };
    let pool = state.pool.clone();

    tokio::spawn(async move {
        let tokens = match artisan_db::list_push_tokens(&pool, client_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(error = %e, ?client_id, "failed to load push tokens");
                return;
            }
        };
        if tokens.is_empty() {
            return;
        }
        match push.send(&tokens, &title, &body, &data).await {
            Ok(sent) => tracing::info!(sent, ?client_id, "push notifications sent"),
            Err(e) => tracing::warn!(error = %e, ?client_id, "push delivery failed"),
        }
    });
}

/// POST /api/v1/notifications (admin)
pub(super) async fn create_notification(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<NotificationRow>>), ApiError> {
    require_role(&req_id, &user, Role::Admin)?;
    let title = required_text(&req_id, "title", &body.title, 200)?;
    let text = required_text(&req_id, "body", &body.body, 2000)?;

    let row = artisan_db::create_notification(&state.pool, body.client_id, &title, &text)
        .await
        .map_err(|e| {
            if e.is_foreign_key_violation() {
                ApiError::new(req_id.0.clone(), "not_found", "client not found")
            } else {
                map_db_error(req_id.0.clone(), &e)
            }
        })?;

    let mut data = body.data;
    if let serde_json::Value::Object(map) = &mut data {
        map.insert(
            "notification_id".to_string(),
            serde_json::Value::String(row.id.to_string()),
        );
    } else {
        data = serde_json::json!({ "notification_id": row.id });
    }
    spawn_push(&state, body.client_id, title, text, data);

    Ok((StatusCode::CREATED, ApiResponse::new(&req_id, row)))
}

/// GET /api/v1/notifications
pub(super) async fn list_notifications(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<NotificationRow>>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let rows = artisan_db::list_notifications_for_client(
        &state.pool,
        user.id,
        normalize_limit(page.limit),
        normalize_offset(page.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, rows))
}

/// PATCH /api/v1/notifications/{id}/read
pub(super) async fn mark_read(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<NotificationRow>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let row = artisan_db::mark_notification_read(&state.pool, id, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(&req_id, row))
}

/// PUT /api/v1/clients/me/push-token
pub(super) async fn register_push_token(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<PushTokenRequest>,
) -> Result<Json<ApiResponse<PushTokenResponse>>, ApiError> {
    require_role(&req_id, &user, Role::Client)?;
    let token = match body.token.as_deref() {
        Some(raw) => Some(required_text(&req_id, "token", raw, 255)?),
        None => None,
    };
    if token.as_deref().is_some_and(|t| t.contains(char::is_whitespace)) {
        return Err(validation_error(&req_id, "token must not contain whitespace"));
    }

    artisan_db::set_client_push_token(&state.pool, user.id, token.as_deref())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        &req_id,
        PushTokenResponse {
            registered: token.is_some(),
        },
    ))
}
