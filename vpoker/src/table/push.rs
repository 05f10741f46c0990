//! Push notifications to seated players.
//!
//! Every player owns at most one bounded channel ([`Mailbox`]). A new
//! subscription closes the previous one. Delivery never blocks the table:
//! recipients are snapshotted under the read lock, the lock is released, and
//! each send waits at most [`DISPATCH_TIMEOUT`] before the push is dropped.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

use super::constants::{DISPATCH_TIMEOUT, MAILBOX_CAPACITY};
use super::item::TableItem;
use super::player::PlayerView;
use super::Table;
use crate::user::UserId;

/// Kind of a push.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushKind {
    ItemsUpdated,
    PlayerJoined,
    PlayerKicked,
    Refresh,
    Disconnected,
}

/// A change notification. Items are redacted per recipient right before
/// delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Push {
    #[serde(rename = "type")]
    pub kind: PushKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<TableItem>,

    /// Player the push is about (joined or kicked)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerView>,

    /// Roster after the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<BTreeMap<UserId, PlayerView>>,
}

impl Push {
    fn new(kind: PushKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            player: None,
            players: None,
        }
    }

    pub fn items_updated(items: Vec<TableItem>) -> Self {
        Self {
            items,
            ..Self::new(PushKind::ItemsUpdated)
        }
    }

    pub fn player_joined(
        player: PlayerView,
        items: Vec<TableItem>,
        players: BTreeMap<UserId, PlayerView>,
    ) -> Self {
        Self {
            items,
            player: Some(player),
            players: Some(players),
            ..Self::new(PushKind::PlayerJoined)
        }
    }

    pub fn player_kicked(
        player: PlayerView,
        items: Vec<TableItem>,
        players: BTreeMap<UserId, PlayerView>,
    ) -> Self {
        Self {
            items,
            player: Some(player),
            players: Some(players),
            ..Self::new(PushKind::PlayerKicked)
        }
    }

    /// Tell clients to re-fetch the whole table.
    pub fn refresh() -> Self {
        Self::new(PushKind::Refresh)
    }

    /// Written by a connection handler when its channel closes.
    pub fn disconnected() -> Self {
        Self::new(PushKind::Disconnected)
    }

    /// Copy of this push as `viewer` may see it.
    pub fn redacted_for(&self, viewer: &UserId) -> Push {
        let mut push = self.clone();
        for item in &mut push.items {
            item.apply_visibility_rules(viewer);
        }
        push
    }
}

/// Bounded channel sized for one player's push stream.
pub fn channel() -> (mpsc::Sender<Push>, mpsc::Receiver<Push>) {
    mpsc::channel(MAILBOX_CAPACITY)
}

/// Slot holding a player's current push channel.
#[derive(Debug, Default)]
pub struct Mailbox {
    sender: Mutex<Option<mpsc::Sender<Push>>>,
}

impl Mailbox {
    /// Replace the current channel. The old sender is dropped, which closes
    /// the old receiver once in-flight sends finish.
    pub fn subscribe(&self, sender: mpsc::Sender<Push>) {
        let previous = self.slot().replace(sender);
        if previous.is_some() {
            log::debug!("Replacing an existing push subscription");
        }
    }

    pub fn unsubscribe(&self) {
        self.slot().take();
    }

    /// Close `channel` only if it is still the current subscription.
    pub fn unsubscribe_channel(&self, channel: &mpsc::WeakSender<Push>) -> bool {
        let mut slot = self.slot();
        let current = match (slot.as_ref(), channel.upgrade()) {
            (Some(current), Some(ours)) => current.same_channel(&ours),
            _ => false,
        };
        if current {
            slot.take();
        }
        current
    }

    pub fn is_subscribed(&self) -> bool {
        self.slot().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    fn sender(&self) -> Option<mpsc::Sender<Push>> {
        self.slot().clone()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<mpsc::Sender<Push>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Outcome of one dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Player has no channel; nothing to do
    NoSubscriber,
    /// Receiver has gone away
    Closed,
    /// Receiver did not drain in time; the push was dropped
    TimedOut,
}

/// A player's identity and mailbox, detached from the table lock.
#[derive(Clone, Debug)]
pub struct PlayerHandle {
    pub user_id: UserId,
    pub name: String,
    mailbox: Arc<Mailbox>,
}

impl PlayerHandle {
    pub fn new(user_id: UserId, name: impl Into<String>, mailbox: Arc<Mailbox>) -> Self {
        Self {
            user_id,
            name: name.into(),
            mailbox,
        }
    }

    /// Deliver `push`, redacted for this player, waiting at most
    /// [`DISPATCH_TIMEOUT`] for room in the channel.
    pub async fn dispatch(&self, push: &Push) -> Delivery {
        let Some(sender) = self.mailbox.sender() else {
            return Delivery::NoSubscriber;
        };
        let push = push.redacted_for(&self.user_id);

        match tokio::time::timeout(DISPATCH_TIMEOUT, sender.send(push)).await {
            Ok(Ok(())) => Delivery::Sent,
            Ok(Err(_)) => {
                log::debug!("Player {} push channel closed", self.name);
                Delivery::Closed
            }
            Err(_) => {
                log::warn!(
                    "Player {} did not drain pushes within {:?}, dropping one",
                    self.name,
                    DISPATCH_TIMEOUT
                );
                Delivery::TimedOut
            }
        }
    }
}

/// Dispatch `push` to every recipient concurrently.
pub async fn broadcast(recipients: &[PlayerHandle], push: &Push) -> Vec<Delivery> {
    join_all(recipients.iter().map(|r| r.dispatch(push))).await
}

impl Table {
    /// Send `push` to every seated player except `acting`.
    ///
    /// Must not be called while holding this table's lock.
    pub async fn notify_others(&self, acting: &UserId, push: Push) -> Vec<Delivery> {
        let recipients = self.recipients(Some(acting));
        broadcast(&recipients, &push).await
    }

    /// Send `push` to every seated player.
    pub async fn notify_all(&self, push: Push) -> Vec<Delivery> {
        let recipients = self.recipients(None);
        broadcast(&recipients, &push).await
    }

    /// Attach `sender` as `user`'s push channel. Fails when `user` is not seated.
    pub fn subscribe(&self, user: &UserId, sender: mpsc::Sender<Push>) -> super::TableResult<()> {
        self.read_by(user, |t| {
            if let Some(player) = t.player(user) {
                player.subscribe(sender);
            }
            Ok(())
        })
    }

    /// Detach a connection's channel when it goes away. A newer subscription
    /// for the same player is left in place.
    pub fn unsubscribe_channel(&self, user: &UserId, channel: &mpsc::WeakSender<Push>) -> bool {
        self.read_lock(|t| Ok(t.player(user).is_some_and(|p| p.unsubscribe_channel(channel))))
            .unwrap_or(false)
    }

    fn recipients(&self, except: Option<&UserId>) -> Vec<PlayerHandle> {
        self.read_lock(|t| {
            Ok(match except {
                Some(acting) => t.other_players(acting),
                None => t.players.values().map(|p| p.handle()).collect(),
            })
        })
        .unwrap_or_default()
    }
}
