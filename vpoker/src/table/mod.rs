//! The shared table: one lock-guarded aggregate per game.
//!
//! This module implements:
//! - [`Table`]: the aggregate root, guarding a [`TableState`] with one
//!   read/write lock and exposing closure-based transactions
//! - Items and the per-viewer visibility filter ([`item`])
//! - Dealing and shuffling ([`dealing`])
//! - Seat allocation, joining and kicking ([`seats`])
//! - Per-player push delivery and broadcast ([`push`])
//! - Transaction-then-broadcast operations used by request handlers ([`actions`])
//!
//! ## Locking discipline
//!
//! All mutation happens inside [`Table::update`]; reads inside
//! [`Table::read_lock`]. Pushes are only sent after the lock is released, so
//! a recipient reacting to a push can safely re-enter the same table.
//!
//! ## Example
//!
//! ```
//! use vpoker::table::{Table, Push};
//! use vpoker::user::User;
//! use uuid::Uuid;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), vpoker::table::TableError> {
//! let table = Table::started(Uuid::new_v4(), 1)?;
//! let alice = User::random("alice");
//!
//! let new_items = table.update(|t| t.join(&alice))?;
//! table.notify_others(&alice.id, Push::items_updated(new_items.unwrap_or_default())).await;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod constants;
pub mod dealing;
pub mod errors;
pub mod item;
pub mod player;
pub mod push;
pub mod seats;

pub use constants::{DEFAULT_CHIPS_PER_COLOR, MAX_SEATS};
pub use errors::{TableError, TableResult};
pub use item::{Card, Chip, ChipColor, Class, ItemId, ItemKind, ItemList, Rank, Side, Suit, TableItem};
pub use player::{Player, PlayerView};
pub use push::{Delivery, Mailbox, PlayerHandle, Push, PushKind};
pub use seats::Kicked;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use crate::user::UserId;

/// Table ID type
pub type TableId = Uuid;

/// Monotonic item id generator. Ids start at 1 and are never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(ItemId);

impl Sequence {
    pub fn next(&mut self) -> ItemId {
        self.0 += 1;
        self.0
    }

    pub fn current(&self) -> ItemId {
        self.0
    }

    /// Make sure the next id is above `id`.
    fn advance_past(&mut self, id: ItemId) {
        self.0 = self.0.max(id);
    }
}

fn default_chips_per_color() -> usize {
    DEFAULT_CHIPS_PER_COLOR
}

/// Everything on one table. Only reachable through [`Table`]'s lock.
#[derive(Debug, Serialize, Deserialize)]
pub struct TableState {
    pub id: TableId,

    /// Seated players keyed by user id
    pub players: BTreeMap<UserId, Player>,

    /// Items in creation order; the first 52 are the deck
    pub items: ItemList,

    #[serde(default)]
    id_seq: Sequence,

    #[serde(default = "default_chips_per_color")]
    chips_per_color: usize,
}

impl TableState {
    pub fn new(id: TableId, chips_per_color: usize) -> Self {
        Self {
            id,
            players: BTreeMap::new(),
            items: ItemList::new(),
            id_seq: Sequence::default(),
            chips_per_color,
        }
    }

    pub fn next_id(&mut self) -> ItemId {
        self.id_seq.next()
    }

    /// Last id handed out.
    pub fn last_id(&self) -> ItemId {
        self.id_seq.current()
    }

    pub fn chips_per_color(&self) -> usize {
        self.chips_per_color
    }

    pub fn player(&self, user: &UserId) -> Option<&Player> {
        self.players.get(user)
    }

    pub fn is_seated(&self, user: &UserId) -> bool {
        self.players.contains_key(user)
    }

    fn require_seated(&self, user: &UserId) -> TableResult<()> {
        if self.is_seated(user) {
            Ok(())
        } else {
            Err(TableError::not_at_table())
        }
    }

    /// Roster snapshot keyed by user id.
    pub fn roster(&self) -> BTreeMap<UserId, PlayerView> {
        self.players
            .iter()
            .map(|(id, p)| (*id, p.view()))
            .collect()
    }

    /// Handles of every seated player except `acting`.
    pub fn other_players(&self, acting: &UserId) -> Vec<PlayerHandle> {
        self.players
            .values()
            .filter(|p| p.id() != *acting)
            .map(Player::handle)
            .collect()
    }

    /// Structurally independent copy. Players in the copy have no
    /// delivery channel.
    pub fn deep_copy(&self) -> TableState {
        TableState {
            id: self.id,
            players: self
                .players
                .iter()
                .map(|(id, p)| (*id, p.detached()))
                .collect(),
            items: self.items.clone(),
            id_seq: self.id_seq,
            chips_per_color: self.chips_per_color,
        }
    }

    /// Check a reloaded state before it is put behind a lock: every player
    /// sits on a distinct seat below [`MAX_SEATS`] and owns exactly one
    /// marker, item ids are unique, and only seated players hold cards.
    pub fn check_integrity(&self) -> TableResult<()> {
        let corrupt = |msg: String| -> TableResult<()> { Err(TableError::Validation(msg)) };

        let mut seats = [false; MAX_SEATS];
        for (id, player) in &self.players {
            if player.id() != *id {
                return corrupt(format!("player {} stored under {id}", player.id()));
            }
            match seats.get_mut(player.index()) {
                Some(taken) if !*taken => *taken = true,
                Some(_) => return corrupt(format!("seat {} is taken twice", player.index())),
                None => return corrupt(format!("seat {} does not exist", player.index())),
            }
        }

        let mut ids = HashSet::with_capacity(self.items.len());
        let mut markers: BTreeMap<UserId, usize> = BTreeMap::new();
        for item in self.items.iter() {
            if !ids.insert(item.id) {
                return corrupt(format!("item id {} is used twice", item.id));
            }
            let needs_seated_owner = item.is(Class::Card) || item.is(Class::Player);
            match item.owner_id {
                Some(owner) if needs_seated_owner && !self.is_seated(&owner) => {
                    return corrupt(format!("item {} is held by {owner}, who is not seated", item.id));
                }
                Some(owner) if item.is(Class::Player) => *markers.entry(owner).or_default() += 1,
                None if item.is(Class::Player) => {
                    return corrupt(format!("player marker {} has no owner", item.id));
                }
                _ => {}
            }
        }
        if let Some(player) = self.players.values().find(|p| markers.get(&p.id()) != Some(&1)) {
            return corrupt(format!("{} does not own exactly one marker", player.name()));
        }
        Ok(())
    }

    /// Redact every item of this (outbound) copy for `viewer`.
    pub fn apply_visibility_rules(&mut self, viewer: &UserId) {
        for item in self.items.iter_mut() {
            item.apply_visibility_rules(viewer);
        }
    }
}

/// A game table: the aggregate root guarding all players and items.
#[derive(Debug)]
pub struct Table {
    id: TableId,
    state: RwLock<TableState>,
}

impl Table {
    /// Empty table; call [`TableState::start_game`] to lay out the deck.
    pub fn new(id: TableId, chips_per_color: usize) -> Self {
        Self::from_state(TableState::new(id, chips_per_color))
    }

    /// Table with the deck, bank chips and dealer button laid out.
    pub fn started(id: TableId, chips_per_color: usize) -> TableResult<Self> {
        let table = Self::new(id, chips_per_color);
        table.update(|t| t.start_game())?;
        Ok(table)
    }

    /// Wrap a reloaded state after [`TableState::check_integrity`], repairing
    /// the id sequence if it lags behind the ids already in use.
    pub fn restore(state: TableState) -> TableResult<Self> {
        state.check_integrity()?;
        Ok(Self::from_state(state))
    }

    fn from_state(mut state: TableState) -> Self {
        if let Some(max_id) = state.items.iter().map(|it| it.id).max() {
            state.id_seq.advance_past(max_id);
        }
        Self {
            id: state.id,
            state: RwLock::new(state),
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    /// Run `mutator` under the exclusive lock.
    ///
    /// The lock is released on every exit path. Changes made before the
    /// mutator returns an error are kept, so mutators validate first.
    pub fn update<T>(&self, mutator: impl FnOnce(&mut TableState) -> TableResult<T>) -> TableResult<T> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        mutator(&mut state)
    }

    /// Run `reader` under the shared lock.
    pub fn read_lock<T>(&self, reader: impl FnOnce(&TableState) -> TableResult<T>) -> TableResult<T> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        reader(&state)
    }

    /// [`Table::update`] for a seated player only.
    pub fn update_by<T>(
        &self,
        user: &UserId,
        mutator: impl FnOnce(&mut TableState) -> TableResult<T>,
    ) -> TableResult<T> {
        self.update(|t| {
            t.require_seated(user)?;
            mutator(t)
        })
    }

    /// [`Table::read_lock`] for a seated player only.
    pub fn read_by<T>(&self, user: &UserId, reader: impl FnOnce(&TableState) -> TableResult<T>) -> TableResult<T> {
        self.read_lock(|t| {
            t.require_seated(user)?;
            reader(t)
        })
    }

    pub fn deep_copy(&self) -> TableState {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.deep_copy()
    }

    /// Full state as `viewer` is allowed to see it.
    pub fn snapshot_for(&self, viewer: &UserId) -> TableResult<TableState> {
        let mut copy = self.read_by(viewer, |t| Ok(t.deep_copy()))?;
        copy.apply_visibility_rules(viewer);
        Ok(copy)
    }
}

impl Serialize for Table {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Table {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let state = TableState::deserialize(deserializer)?;
        Table::restore(state).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::User;
    use std::sync::Arc;

    #[test]
    fn test_sequence_is_monotonic() {
        let mut seq = Sequence::default();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        seq.advance_past(10);
        assert_eq!(seq.next(), 11);
        seq.advance_past(3);
        assert_eq!(seq.next(), 12);
    }

    #[test]
    fn test_update_releases_lock_on_error() {
        let table = Table::new(Uuid::new_v4(), 1);
        let res: TableResult<()> = table.update(|_| Err(TableError::NotFound("x".into())));
        assert!(res.is_err());

        // Would deadlock if the write lock were still held
        let len = table.read_lock(|t| Ok(t.items.len())).unwrap();
        assert_eq!(len, 0);
    }

    #[test]
    fn test_update_keeps_partial_mutation_on_error() {
        let table = Table::new(Uuid::new_v4(), 1);
        let res: TableResult<()> = table.update(|t| {
            let id = t.next_id();
            t.items.push(TableItem::dealer(id, 0, 0));
            Err(TableError::Validation("late failure".into()))
        });
        assert!(res.is_err());
        assert_eq!(table.read_lock(|t| Ok(t.items.len())).unwrap(), 1);
    }

    #[test]
    fn test_update_recovers_after_panic() {
        let table = Arc::new(Table::new(Uuid::new_v4(), 1));
        let t2 = table.clone();
        let joined = std::thread::spawn(move || {
            let _: TableResult<()> = t2.update(|_| panic!("mutator blew up"));
        })
        .join();
        assert!(joined.is_err());

        assert!(table.update(|t| t.start_game()).is_ok());
    }

    #[test]
    fn test_update_by_rejects_strangers() {
        let table = Table::started(Uuid::new_v4(), 1).unwrap();
        let stranger = User::random("stranger");
        let mut ran = false;

        let err = table
            .update_by(&stranger.id, |_| {
                ran = true;
                Ok(())
            })
            .unwrap_err();

        assert_eq!(err, TableError::not_at_table());
        assert!(!ran);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let table = Table::started(Uuid::new_v4(), 1).unwrap();
        let alice = User::random("alice");
        table.update(|t| t.join(&alice)).unwrap();

        let mut copy = table.deep_copy();
        copy.items.iter_mut().for_each(|it| it.x = -1);
        copy.players.clear();

        table
            .read_lock(|t| {
                assert!(t.items.iter().all(|it| it.x != -1 || it.is(Class::Player)));
                assert_eq!(t.players.len(), 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_snapshot_hides_other_players_cards() {
        let table = Table::started(Uuid::new_v4(), 1).unwrap();
        let (alice, bob) = (User::random("alice"), User::random("bob"));
        table.update(|t| t.join(&alice)).unwrap();
        table.update(|t| t.join(&bob)).unwrap();
        table
            .update(|t| {
                t.items.require_mut(1)?.take(&alice.id);
                Ok(())
            })
            .unwrap();

        let for_bob = table.snapshot_for(&bob.id).unwrap();
        let card = for_bob.items.get(1).and_then(|it| it.as_card()).copied().unwrap();
        assert!(card.is_hidden());
        assert_eq!(card.side, Side::Cover);

        let for_alice = table.snapshot_for(&alice.id).unwrap();
        let card = for_alice.items.get(1).and_then(|it| it.as_card()).copied().unwrap();
        assert!(!card.is_hidden());
        assert_eq!(card.side, Side::Face);
    }

    #[test]
    fn test_snapshot_requires_seat() {
        let table = Table::started(Uuid::new_v4(), 1).unwrap();
        assert!(matches!(
            table.snapshot_for(&Uuid::new_v4()),
            Err(TableError::Authorization(_))
        ));
    }

    #[test]
    fn test_from_state_repairs_sequence() {
        let mut state = TableState::new(Uuid::new_v4(), 1);
        state.items.push(TableItem::dealer(40, 0, 0));
        let table = Table::from_state(state);
        let next = table.update(|t| Ok(t.next_id())).unwrap();
        assert_eq!(next, 41);
    }

    fn seated_table() -> (TableState, User) {
        let mut state = TableState::new(Uuid::new_v4(), 1);
        state.start_game().unwrap();
        let alice = User::random("alice");
        state.join(&alice).unwrap();
        (state, alice)
    }

    #[test]
    fn test_consistent_state_passes_integrity_check() {
        let (state, _) = seated_table();
        assert!(state.check_integrity().is_ok());
        assert!(Table::restore(state).is_ok());
    }

    #[test]
    fn test_seat_out_of_range_is_rejected_and_join_survives() {
        let (state, alice) = seated_table();
        let mut json = serde_json::to_value(&state).unwrap();
        json["players"][alice.id.to_string()]["index"] = 7.into();

        let tampered: TableState = serde_json::from_value(json.clone()).unwrap();
        assert!(matches!(tampered.check_integrity(), Err(TableError::Validation(_))));
        assert!(serde_json::from_value::<Table>(json).is_err());

        // Even unchecked, seating must not panic
        let mut tampered = tampered;
        assert!(tampered.join(&User::random("bob")).unwrap().is_some());
    }

    #[test]
    fn test_shared_seat_is_rejected() {
        let (mut state, _) = seated_table();
        state.join(&User::random("bob")).unwrap();
        let mut json = serde_json::to_value(&state).unwrap();
        for player in json["players"].as_object_mut().unwrap().values_mut() {
            player["index"] = 0.into();
        }

        let tampered: TableState = serde_json::from_value(json).unwrap();
        assert!(tampered.check_integrity().is_err());
    }

    #[test]
    fn test_second_marker_is_rejected() {
        let (mut state, alice) = seated_table();
        let id = state.next_id();
        state.items.push(TableItem::player_marker(id, 0, 0, alice.id));
        assert!(state.check_integrity().is_err());
    }

    #[test]
    fn test_duplicate_item_id_is_rejected() {
        let (mut state, _) = seated_table();
        state.items.push(TableItem::dealer(1, 0, 0));
        assert!(state.check_integrity().is_err());
    }

    #[test]
    fn test_card_held_by_stranger_is_rejected() {
        let (mut state, _) = seated_table();
        state.items.as_mut_slice()[0].owner_id = Some(Uuid::new_v4());
        assert!(state.check_integrity().is_err());
    }
}
