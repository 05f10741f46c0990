//! Game API handlers.
//!
//! Every endpoint runs one table transaction for the caller (resolved by the
//! identity middleware), then pushes the change to the other players. Items
//! in responses are already redacted for the caller.
//!
//! # Examples
//!
//! Pick up a card:
//! ```bash
//! curl -X POST http://localhost:8080/api/games/$GAME/take_card \
//!   -H "x-user-id: $USER" \
//!   -H "Content-Type: application/json" \
//!   -d '{"id": 17}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use vpoker::{
    Table, TableId, TableItem, TableState,
    table::{ItemId, PlayerView},
    user::{User, UserId},
};

use super::{ApiError, AppState};
use crate::logging::log_table_action;

#[derive(Debug, Serialize)]
pub struct GameCreated {
    pub id: TableId,
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub id: ItemId,
}

#[derive(Debug, Deserialize)]
pub struct GiveRequest {
    pub id: ItemId,
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct KickRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemsPayload {
    pub items: Vec<TableItem>,
}

#[derive(Debug, Serialize)]
pub struct ItemUpdated {
    pub updated: TableItem,
}

#[derive(Debug, Serialize)]
pub struct Kicked {
    pub kicked: PlayerView,
}

async fn find_table(state: &AppState, id: &TableId) -> Result<Arc<Table>, ApiError> {
    state.tables.get(id).await.ok_or_else(ApiError::game_not_found)
}

/// Start a new game and seat the caller at it.
///
/// Returns `201 Created` with `{"id": "<game id>"}`.
pub async fn create_game(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<(StatusCode, Json<GameCreated>), ApiError> {
    let table = state.tables.create().await?;
    table.join_and_announce(&user).await?;
    log_table_action("create", &table.id(), Some(&user.id), "ok");
    Ok((StatusCode::CREATED, Json(GameCreated { id: table.id() })))
}

/// Full table as the caller may see it: other players' cards are blank.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not seated at this table
/// - `404 Not Found`: No such game
pub async fn get_state(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(table_id): Path<Uuid>,
) -> Result<Json<TableState>, ApiError> {
    let table = find_table(&state, &table_id).await?;
    Ok(Json(table.snapshot_for(&user.id)?))
}

/// Take a seat. Returns the marker and chips created for the caller, or an
/// empty list when already seated.
///
/// # Errors
///
/// - `403 Forbidden`: Every seat is taken
pub async fn join_game(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(table_id): Path<Uuid>,
) -> Result<Json<ItemsPayload>, ApiError> {
    let table = find_table(&state, &table_id).await?;
    let items = table.join_and_announce(&user).await?;
    log_table_action("join", &table_id, Some(&user.id), "ok");
    Ok(Json(ItemsPayload { items }))
}

/// Move one item; cards may also be flipped by their holder.
pub async fn update_item(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(table_id): Path<Uuid>,
    Json(item): Json<TableItem>,
) -> Result<Json<ItemUpdated>, ApiError> {
    let table = find_table(&state, &table_id).await?;
    let updated = table.update_item(&user.id, &item).await?;
    Ok(Json(ItemUpdated { updated }))
}

/// Move a batch of items. Items that do not exist or may not be changed are
/// skipped; the response lists the ones applied.
pub async fn update_many(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(table_id): Path<Uuid>,
    Json(request): Json<ItemsPayload>,
) -> Result<Json<ItemsPayload>, ApiError> {
    let table = find_table(&state, &table_id).await?;
    let items = table.update_many(&user.id, &request.items).await?;
    Ok(Json(ItemsPayload { items }))
}

/// Reveal a card the caller holds.
pub async fn show_card(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(table_id): Path<Uuid>,
    Json(request): Json<ItemRequest>,
) -> Result<Json<ItemUpdated>, ApiError> {
    let table = find_table(&state, &table_id).await?;
    let updated = table.show_card(&user.id, request.id).await?;
    log_table_action("show_card", &table_id, Some(&user.id), "ok");
    Ok(Json(ItemUpdated { updated }))
}

/// Pick up an unowned card; the response shows its face.
pub async fn take_card(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(table_id): Path<Uuid>,
    Json(request): Json<ItemRequest>,
) -> Result<Json<ItemUpdated>, ApiError> {
    let table = find_table(&state, &table_id).await?;
    let updated = table.take_card(&user.id, request.id).await?;
    Ok(Json(ItemUpdated { updated }))
}

/// Hand a card to another seated player.
pub async fn give_card(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(table_id): Path<Uuid>,
    Json(request): Json<GiveRequest>,
) -> Result<Json<ItemUpdated>, ApiError> {
    let table = find_table(&state, &table_id).await?;
    let updated = table
        .give_card(&user.id, request.id, &request.user_id)
        .await?;
    Ok(Json(ItemUpdated { updated }))
}

/// Reshuffle the deck; everyone else is told to reload.
pub async fn shuffle(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(table_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let table = find_table(&state, &table_id).await?;
    table.shuffle_and_refresh(&user.id).await?;
    log_table_action("shuffle", &table_id, Some(&user.id), "ok");
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a player by display name. Only seated players may kick.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not seated at this table
/// - `404 Not Found`: No such game, or nobody by that name is seated
pub async fn kick_player(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(table_id): Path<Uuid>,
    Json(request): Json<KickRequest>,
) -> Result<Json<Kicked>, ApiError> {
    let table = find_table(&state, &table_id).await?;

    match table.kick_and_announce(&user.id, &request.name).await {
        Ok(kicked) => {
            log_table_action("kick", &table_id, Some(&user.id), "ok");
            Ok(Json(Kicked { kicked }))
        }
        Err(e) => {
            log_table_action("kick", &table_id, Some(&user.id), &e.to_string());
            Err(e.into())
        }
    }
}
