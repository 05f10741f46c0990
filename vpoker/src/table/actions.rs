//! Player actions: one transaction, then a broadcast once the lock is
//! released. Returned items are already redacted for the acting player.

use super::item::{Class, ItemId, TableItem};
use super::player::PlayerView;
use super::push::Push;
use super::{Table, TableError, TableResult};
use crate::user::{User, UserId};

impl Table {
    /// Seat `user` and tell everyone else. Returns the items created for
    /// them; empty when they were already seated.
    pub async fn join_and_announce(&self, user: &User) -> TableResult<Vec<TableItem>> {
        let joined = self.update(|t| {
            let Some(items) = t.join(user)? else {
                return Ok(None);
            };
            let view = t.player(&user.id).map(|p| p.view());
            Ok(view.map(|v| (v, items, t.roster())))
        })?;

        let Some((player, items, roster)) = joined else {
            log::debug!("User {} already seated at table {}", user.name, self.id());
            return Ok(Vec::new());
        };
        self.notify_others(&user.id, Push::player_joined(player, items.clone(), roster))
            .await;
        Ok(items)
    }

    /// Kick the player named `name` on behalf of the seated player `by`, and
    /// tell everyone still seated. Membership of `by` is checked in the same
    /// transaction as the kick.
    pub async fn kick_and_announce(&self, by: &UserId, name: &str) -> TableResult<PlayerView> {
        let kicked = self.update_by(by, |t| t.kick(name))?;
        let player = kicked.player.view();
        self.notify_all(Push::player_kicked(
            player.clone(),
            kicked.released,
            kicked.players,
        ))
        .await;
        Ok(player)
    }

    /// Turn a held card face up for everyone.
    pub async fn show_card(&self, user: &UserId, id: ItemId) -> TableResult<TableItem> {
        let updated = self.update_by(user, |t| {
            let item = t.items.require_mut(id)?;
            item.show(user)?;
            Ok(item.clone())
        })?;
        self.notify_others(user, Push::items_updated(vec![updated.clone()]))
            .await;
        Ok(updated)
    }

    /// Pick up an unowned card.
    pub async fn take_card(&self, user: &UserId, id: ItemId) -> TableResult<TableItem> {
        let updated = self.update_by(user, |t| {
            let item = t.items.require_mut(id)?;
            if !item.is(Class::Card) {
                return Err(TableError::Validation(format!("item {id} is not a card")));
            }
            if !item.take(user) && !item.is_owned_by(user) {
                return Err(TableError::Authorization(
                    "this card belongs to another player".to_string(),
                ));
            }
            Ok(item.clone())
        })?;
        self.notify_others(user, Push::items_updated(vec![updated.clone()]))
            .await;
        Ok(updated.redacted_for(user))
    }

    /// Hand a card to another seated player.
    pub async fn give_card(&self, user: &UserId, id: ItemId, to: &UserId) -> TableResult<TableItem> {
        let updated = self.update_by(user, |t| {
            if !t.is_seated(to) {
                return Err(TableError::Validation(
                    "recipient is not at the table".to_string(),
                ));
            }
            let item = t.items.require_mut(id)?;
            item.give(user, to)?;
            Ok(item.clone())
        })?;
        self.notify_others(user, Push::items_updated(vec![updated.clone()]))
            .await;
        Ok(updated.redacted_for(user))
    }

    /// Move (and, for cards, flip) one item.
    pub async fn update_item(&self, user: &UserId, src: &TableItem) -> TableResult<TableItem> {
        let updated = self.update_by(user, |t| {
            let item = t.items.require_mut(src.id)?;
            item.update_from(user, src)?;
            Ok(item.clone())
        })?;
        self.notify_others(user, Push::items_updated(vec![updated.clone()]))
            .await;
        Ok(updated.redacted_for(user))
    }

    /// Apply a batch of moves. Unknown or rejected items are skipped; the
    /// ones that went through are returned.
    pub async fn update_many(&self, user: &UserId, srcs: &[TableItem]) -> TableResult<Vec<TableItem>> {
        let updated = self.update_by(user, |t| {
            let mut updated = Vec::with_capacity(srcs.len());
            for src in srcs {
                let Some(item) = t.items.get_mut(src.id) else {
                    log::error!("UpdateMany: item_id={} not found", src.id);
                    continue;
                };
                if let Err(e) = item.update_from(user, src) {
                    log::error!("UpdateMany: item_id={} rejected: {}", src.id, e);
                    continue;
                }
                updated.push(item.clone());
            }
            Ok(updated)
        })?;
        log::debug!("UpdateMany: {} of {} items updated", updated.len(), srcs.len());

        if !updated.is_empty() {
            self.notify_others(user, Push::items_updated(updated.clone()))
                .await;
        }
        Ok(updated.into_iter().map(|it| it.redacted_for(user)).collect())
    }

    /// Reshuffle the deck and ask everyone else to reload the table.
    pub async fn shuffle_and_refresh(&self, user: &UserId) -> TableResult<()> {
        self.update_by(user, |t| {
            t.shuffle();
            Ok(())
        })?;
        log::info!("Table {} shuffled by {}", self.id(), user);
        self.notify_others(user, Push::refresh()).await;
        Ok(())
    }
}
