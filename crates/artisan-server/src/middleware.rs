use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use artisan_core::Role;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::JwtService;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Authenticated caller, inserted by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

/// Caller identity on public routes; `None` for anonymous requests.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

/// Token verification settings used by the auth middleware.
#[derive(Clone)]
pub struct AuthState {
    jwt: Arc<JwtService>,
}

impl AuthState {
    #[must_use]
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }

    fn authenticate(&self, header: Option<&HeaderValue>) -> Option<AuthUser> {
        let token = extract_bearer_token(header)?;
        match self.jwt.verify(token) {
            Ok((id, role)) => Some(AuthUser { id, role }),
            Err(e) => {
                tracing::debug!(error = %e, "rejected bearer token");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter shared by every API route.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn middleware_error(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware rejecting requests without a valid bearer token.
pub async fn require_auth(State(auth): State<AuthState>, mut req: Request, next: Next) -> Response {
    match auth.authenticate(req.headers().get(AUTHORIZATION)) {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => middleware_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        ),
    }
}

/// Middleware recording the caller when a valid token is present.
/// Invalid or missing tokens are treated as anonymous.
pub async fn optional_auth(State(auth): State<AuthState>, mut req: Request, next: Next) -> Response {
    let user = auth.authenticate(req.headers().get(AUTHORIZATION));
    req.extensions_mut().insert(MaybeAuthUser(user));
    next.run(req).await
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        return middleware_error(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        );
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_state() -> AuthState {
        AuthState::new(Arc::new(JwtService::new("middleware-test-secret", 5)))
    }

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn authenticate_resolves_valid_token() {
        let state = auth_state();
        let id = Uuid::new_v4();
        let token = state.jwt.issue(id, Role::Usuario).expect("issue");
        let header = HeaderValue::from_str(&format!("Bearer {token}")).expect("header");

        assert_eq!(
            state.authenticate(Some(&header)),
            Some(AuthUser {
                id,
                role: Role::Usuario
            })
        );
    }

    #[test]
    fn authenticate_rejects_missing_and_bogus_tokens() {
        let state = auth_state();
        let bogus = HeaderValue::from_static("Bearer nope");
        assert_eq!(state.authenticate(None), None);
        assert_eq!(state.authenticate(Some(&bogus)), None);
    }
}
