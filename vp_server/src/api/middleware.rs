//! Identity middleware for game endpoints.
//!
//! Resolves the `x-user-id` header against the user registry and injects the
//! [`User`] into request extensions for downstream handlers:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use vpoker::user::User;
//!
//! async fn handler(Extension(user): Extension<User>) -> String {
//!     format!("Hello {}", user.name)
//! }
//! # let _ = handler;
//! ```

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;
use vpoker::user::User;

use super::AppState;

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Look up a user by the textual id a client sent.
pub async fn resolve_user(state: &AppState, raw: &str) -> Option<User> {
    let id = Uuid::parse_str(raw.trim()).ok()?;
    state.users.get(&id).await
}

/// Rejects requests without a known user with `401 Unauthorized`.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let raw = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user = resolve_user(&state, raw)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
