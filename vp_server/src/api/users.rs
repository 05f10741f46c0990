//! User registration.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use vpoker::user::User;

use super::{AppState, ApiError};

/// Longest display name accepted
pub const MAX_NAME_LEN: usize = 32;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
}

/// Register a user under a fresh id.
///
/// Returns `201 Created` with `{"id", "name", "created_at"}`. The id is what
/// the client later sends as `x-user-id`.
///
/// # Errors
///
/// - `400 Bad Request`: Empty or overlong name
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("name must be at most {MAX_NAME_LEN} characters"),
        ));
    }

    let user = state.users.register(name).await;
    Ok((StatusCode::CREATED, Json(user)))
}
