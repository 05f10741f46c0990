//! WebSocket push stream for one seated player.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{table_id}?user_id=<uuid>`
//! 2. Server checks the user is seated and subscribes a fresh channel
//!    (closing any older connection of the same player)
//! 3. Every push for this player is written as one JSON text frame; items
//!    are already redacted for them
//! 4. When the channel is closed (superseded, kicked) a final
//!    `{"type": "disconnected"}` frame is written and the socket is closed
//! 5. A ping goes out every 15 seconds to keep proxies from idling the
//!    connection out
//!
//! The stream is push-only: incoming frames are read just to notice the
//! client going away.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket(`ws://localhost:8080/ws/${game}?user_id=${user}`);
//!
//! ws.onmessage = (event) => {
//!   const push = JSON.parse(event.data);
//!   switch (push.type) {
//!     case "items_updated": applyItems(push.items); break;
//!     case "refresh": reloadTable(); break;
//!   }
//! };
//! ```

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{Sink, SinkExt, StreamExt};
use log::{debug, error, info};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;
use vpoker::{Push, table::push};

use super::{ApiError, AppState, middleware::resolve_user};

/// Interval between keep-alive pings
pub const PING_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    user_id: String,
}

/// Why a push pump stopped.
#[derive(Debug, PartialEq, Eq)]
pub enum PumpEnd {
    /// The table closed our channel; the client was told and the socket closed
    ChannelClosed,
    /// Writing to the socket failed
    SocketGone,
}

/// Upgrade to a push stream for the given table.
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown `user_id`
/// - `403 Forbidden`: User is not seated at this table
/// - `404 Not Found`: No such game
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(table_id): Path<Uuid>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let Some(user) = resolve_user(&state, &query.user_id).await else {
        return ApiError::new(StatusCode::UNAUTHORIZED, "unknown user").into_response();
    };
    let Some(table) = state.tables.get(&table_id).await else {
        return ApiError::game_not_found().into_response();
    };

    // Subscribe before upgrading so no push is lost in between
    let (tx, rx) = push::channel();
    let weak = tx.downgrade();
    if let Err(e) = table.subscribe(&user.id, tx) {
        return ApiError::from(e).into_response();
    }

    ws.on_upgrade(move |socket| async move {
        info!("WebSocket connected: table={}, user={}", table_id, user.name);
        handle_socket(socket, rx).await;
        if table.unsubscribe_channel(&user.id, &weak) {
            debug!("Released push channel of {} at table {}", user.name, table_id);
        }
        info!("WebSocket disconnected: table={}, user={}", table_id, user.name);
    })
}

async fn handle_socket(socket: WebSocket, rx: mpsc::Receiver<Push>) {
    let (mut sender, mut receiver) = socket.split();

    let pump = pump_pushes(rx, &mut sender, PING_INTERVAL);
    let listen = async {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    };

    tokio::select! {
        end = pump => debug!("Push pump finished: {:?}", end),
        _ = listen => debug!("Client went away"),
    }
}

/// Forward pushes to `sink` until the channel closes or the sink fails,
/// pinging every `ping_every`.
pub async fn pump_pushes<S>(mut rx: mpsc::Receiver<Push>, sink: &mut S, ping_every: Duration) -> PumpEnd
where
    S: Sink<Message> + Unpin,
{
    let mut ping = tokio::time::interval_at(tokio::time::Instant::now() + ping_every, ping_every);

    loop {
        tokio::select! {
            next = rx.recv() => {
                let Some(push) = next else {
                    let _ = send_push(sink, &Push::disconnected()).await;
                    let _ = sink.send(Message::Close(None)).await;
                    return PumpEnd::ChannelClosed;
                };
                if !send_push(sink, &push).await {
                    return PumpEnd::SocketGone;
                }
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    return PumpEnd::SocketGone;
                }
            }
        }
    }
}

async fn send_push<S>(sink: &mut S, push: &Push) -> bool
where
    S: Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(push) {
        Ok(j) => j,
        Err(e) => {
            error!("Failed to serialize push: {}", e);
            return true;
        }
    };
    sink.send(Message::Text(json.into())).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpoker::TableItem;

    fn text(msg: &Message) -> serde_json::Value {
        match msg {
            Message::Text(t) => serde_json::from_str(t.as_str()).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pump_forwards_then_disconnects() {
        let (tx, rx) = push::channel();
        tx.send(Push::items_updated(vec![TableItem::dealer(58, 1, 2)]))
            .await
            .unwrap();
        tx.send(Push::refresh()).await.unwrap();
        drop(tx);

        let mut sink: Vec<Message> = Vec::new();
        let end = pump_pushes(rx, &mut sink, Duration::from_secs(3600)).await;

        assert_eq!(end, PumpEnd::ChannelClosed);
        assert_eq!(sink.len(), 4);
        assert_eq!(text(&sink[0])["type"], "items_updated");
        assert_eq!(text(&sink[0])["items"][0]["id"], 58);
        assert_eq!(text(&sink[1])["type"], "refresh");
        assert_eq!(text(&sink[2])["type"], "disconnected");
        assert!(matches!(sink[3], Message::Close(None)));
    }

    #[tokio::test]
    async fn test_pump_pings_while_idle() {
        let (tx, rx) = push::channel();
        let mut sink: Vec<Message> = Vec::new();
        let every = Duration::from_millis(10);

        let pump = pump_pushes(rx, &mut sink, every);
        let closer = async move {
            tokio::time::sleep(every * 4).await;
            drop(tx);
        };
        let (end, ()) = tokio::join!(pump, closer);

        assert_eq!(end, PumpEnd::ChannelClosed);
        let pings = sink.iter().filter(|m| matches!(m, Message::Ping(_))).count();
        assert!(pings >= 1);
        assert!(matches!(sink.last(), Some(Message::Close(None))));
    }
}
