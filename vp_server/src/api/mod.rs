//! HTTP/WebSocket API for the virtual poker server.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP/WebSocket
//! - **Tower**: Middleware for CORS, request ids and identity
//! - **vpoker**: every game request is one table transaction followed by a
//!   push to the other players at that table
//!
//! # Modules
//!
//! - [`users`]: User registration
//! - [`tables`]: Game creation, state and player actions
//! - [`websocket`]: Per-player push stream
//! - [`middleware`]: Identity middleware for game endpoints
//! - [`request_id`]: Request correlation
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                          - Health check
//! POST /api/users                       - Register a user
//! POST /api/games                       - Start a game (creator joins it)
//! GET  /api/games/{id}/state            - Table as the caller may see it
//! POST /api/games/{id}/join             - Take a seat
//! POST /api/games/{id}/update           - Move or flip one item
//! POST /api/games/{id}/update_many      - Move a batch of items
//! POST /api/games/{id}/show_card        - Reveal a held card
//! POST /api/games/{id}/take_card        - Pick up a card
//! POST /api/games/{id}/give_card        - Hand a card to another player
//! POST /api/games/{id}/shuffle          - Reshuffle the deck
//! POST /api/games/{id}/kick             - Remove a player by name
//! GET  /ws/{id}?user_id=<uuid>          - Push stream
//! ```
//!
//! Game endpoints identify the caller by the `x-user-id` header.

pub mod middleware;
pub mod request_id;
pub mod tables;
pub mod users;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use vpoker::{TableError, TableRegistry, UserRegistry};

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Cloned for each request; both registries are `Arc`-backed.
#[derive(Clone)]
pub struct AppState {
    pub users: UserRegistry,
    pub tables: TableRegistry,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by API handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn game_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "game not found")
    }
}

impl From<TableError> for ApiError {
    fn from(err: TableError) -> Self {
        let status = match err {
            TableError::Validation(_) => StatusCode::BAD_REQUEST,
            TableError::Authorization(_) | TableError::Capacity { .. } => StatusCode::FORBIDDEN,
            TableError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        Self::new(status, err.client_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let game_routes = Router::new()
        .route("/games", post(tables::create_game))
        .route("/games/{table_id}/state", get(tables::get_state))
        .route("/games/{table_id}/join", post(tables::join_game))
        .route("/games/{table_id}/update", post(tables::update_item))
        .route("/games/{table_id}/update_many", post(tables::update_many))
        .route("/games/{table_id}/show_card", post(tables::show_card))
        .route("/games/{table_id}/take_card", post(tables::take_card))
        .route("/games/{table_id}/give_card", post(tables::give_card))
        .route("/games/{table_id}/shuffle", post(tables::shuffle))
        .route("/games/{table_id}/kick", post(tables::kick_player))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::identity_middleware,
        ));

    let api_routes = Router::new()
        .route("/users", post(users::register))
        .merge(game_routes);

    Router::new()
        .route("/health", get(health_check))
        // WebSocket route identifies the user via query parameter
        .route("/ws/{table_id}", get(websocket::websocket_handler))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "users": state.users.len().await,
        "tables": state.tables.len().await,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_errors_map_to_status() {
        let cases = [
            (TableError::item_not_found(1), StatusCode::BAD_REQUEST),
            (TableError::not_at_table(), StatusCode::FORBIDDEN),
            (TableError::Capacity { max_seats: 3 }, StatusCode::FORBIDDEN),
            (TableError::NotFound("bob".into()), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_capacity_message_is_wire_safe() {
        let err = ApiError::from(TableError::Capacity { max_seats: 3 });
        assert_eq!(err.message, "this table is full");
    }
}
