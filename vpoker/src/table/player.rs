//! Seated players.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::constants::SEAT_COLORS;
use super::push::{Mailbox, PlayerHandle, Push};
use crate::user::{User, UserId};
use tokio::sync::mpsc;

/// What other players are told about a seated player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    #[serde(flatten)]
    pub user: User,
    pub color: String,
    pub skin: String,
    pub index: usize,
}

impl PlayerView {
    pub fn id(&self) -> UserId {
        self.user.id
    }
}

/// A user seated at a table, together with their push mailbox.
///
/// The mailbox is never persisted; a reloaded player has no subscriber until
/// their client reconnects.
#[derive(Debug, Serialize, Deserialize)]
pub struct Player {
    #[serde(flatten)]
    view: PlayerView,

    #[serde(skip)]
    mailbox: Arc<Mailbox>,
}

impl Player {
    /// Seat `user` at `index`, which must be below [`super::MAX_SEATS`].
    pub fn new(user: User, index: usize) -> Self {
        Self {
            view: PlayerView {
                user,
                color: SEAT_COLORS[index].to_string(),
                skin: format!("player_{index}"),
                index,
            },
            mailbox: Arc::default(),
        }
    }

    pub fn id(&self) -> UserId {
        self.view.user.id
    }

    pub fn name(&self) -> &str {
        &self.view.user.name
    }

    /// Seat index, stable while the player stays at the table.
    pub fn index(&self) -> usize {
        self.view.index
    }

    pub fn color(&self) -> &str {
        &self.view.color
    }

    pub fn view(&self) -> PlayerView {
        self.view.clone()
    }

    /// Unlocked handle used to deliver pushes to this player.
    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle::new(self.id(), self.name(), Arc::clone(&self.mailbox))
    }

    /// Copy of this player with its own, empty mailbox.
    pub fn detached(&self) -> Player {
        Player {
            view: self.view.clone(),
            mailbox: Arc::default(),
        }
    }

    /// Install `sender` as this player's push channel, closing any previous one.
    pub fn subscribe(&self, sender: mpsc::Sender<Push>) {
        self.mailbox.subscribe(sender);
    }

    /// Close this player's push channel, if any.
    pub fn unsubscribe(&self) {
        self.mailbox.unsubscribe();
    }

    /// Close `channel` if it is still this player's current one.
    pub fn unsubscribe_channel(&self, channel: &mpsc::WeakSender<Push>) -> bool {
        self.mailbox.unsubscribe_channel(channel)
    }

    pub fn is_subscribed(&self) -> bool {
        self.mailbox.is_subscribed()
    }
}
