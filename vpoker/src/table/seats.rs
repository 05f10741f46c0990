//! Seat allocation: joining and kicking players.
//!
//! A seat index decides a player's color, skin and where their starting chip
//! rack is laid out. The lowest free index is always taken first, and seats
//! vacated by a kick are reused.

use super::constants::{CHIP_STACK_STEP, CHIP_WIDTH, MAX_SEATS, SEAT_SLOTS};
use super::item::{CHIP_SET, ChipColor, Class, Side, TableItem};
use super::player::{Player, PlayerView};
use super::{TableError, TableResult, TableState};
use crate::user::{User, UserId};
use std::collections::BTreeMap;

/// Starting rack: how many chips of each color a new player gets.
pub const RACK: [(ChipColor, usize); 5] = [
    (ChipColor::Gray, 10),
    (ChipColor::Red, 8),
    (ChipColor::Blue, 5),
    (ChipColor::Green, 2),
    (ChipColor::Black, 1),
];

/// Result of a successful kick, for the broadcast that follows.
#[derive(Debug)]
pub struct Kicked {
    /// The removed player; their channel is already closed
    pub player: Player,
    /// The removed seat marker
    pub marker: Option<TableItem>,
    /// Cards the player was holding, now unowned and face down
    pub released: Vec<TableItem>,
    /// Roster after the kick
    pub players: BTreeMap<UserId, PlayerView>,
}

fn rack_count(color: ChipColor) -> usize {
    RACK.iter()
        .find(|(c, _)| *c == color)
        .map_or(0, |(_, n)| *n)
}

impl TableState {
    /// Lowest seat index not held by any player.
    pub fn free_seat(&self) -> Option<usize> {
        let mut taken = [false; MAX_SEATS];
        for player in self.players.values() {
            if let Some(seat) = taken.get_mut(player.index()) {
                *seat = true;
            }
        }
        taken.iter().position(|t| !t)
    }

    /// Seat `user`. Returns the items created for them, or `None` when they
    /// are already seated.
    pub fn join(&mut self, user: &User) -> TableResult<Option<Vec<TableItem>>> {
        if self.is_seated(&user.id) {
            return Ok(None);
        }
        if self.players.len() >= MAX_SEATS {
            return Err(TableError::Capacity {
                max_seats: MAX_SEATS,
            });
        }
        let index = self.free_seat().ok_or(TableError::Capacity {
            max_seats: MAX_SEATS,
        })?;

        log::debug!(
            "Join begin table_id={} user={} seat={} seq={}",
            self.id,
            user.name,
            index,
            self.last_id()
        );

        self.players.insert(user.id, Player::new(user.clone(), index));
        let start = self.items.len();
        let id = self.next_id();
        self.items.push(TableItem::player_marker(id, 0, 0, user.id));
        self.lay_out_rack(index);

        log::info!(
            "User {} joined table {} at seat {}",
            user.name,
            self.id,
            index
        );
        Ok(Some(self.items.tail(start)))
    }

    /// Starting chips for the seat at `index`. Gray, red and blue run in one
    /// line; green and black start a second line below.
    fn lay_out_rack(&mut self, index: usize) {
        let (slot_x, slot_y) = SEAT_SLOTS[index];
        let (mut x, mut y) = (slot_x, slot_y);
        for chip in CHIP_SET {
            if chip.color == ChipColor::Green {
                x = slot_x;
                y = slot_y + CHIP_WIDTH;
            }
            for _ in 0..rack_count(chip.color) {
                let id = self.next_id();
                self.items.push(TableItem::chip(id, x, y, chip));
                x += CHIP_STACK_STEP;
            }
            x += CHIP_WIDTH;
        }
    }

    /// Remove the player named `name`: their marker goes, the cards they
    /// held are released face down, and their channel is closed.
    pub fn kick(&mut self, name: &str) -> TableResult<Kicked> {
        let id = self
            .players
            .values()
            .find(|p| p.name() == name)
            .map(Player::id)
            .ok_or_else(|| TableError::NotFound(format!("{name} is not at the table")))?;

        let marker = self
            .items
            .remove_first(|it| it.is(Class::Player) && it.is_owned_by(&id));

        let mut released = Vec::new();
        for item in self.items.iter_mut() {
            if item.is(Class::Card) && item.is_owned_by(&id) {
                item.owner_id = None;
                item.prev_owner_id = Some(id);
                item.reset_side(Side::Cover);
                released.push(item.clone());
            }
        }

        let player = self
            .players
            .remove(&id)
            .ok_or_else(|| TableError::NotFound(format!("{name} is not at the table")))?;
        player.unsubscribe();

        log::info!(
            "Kicked {} from table {} (seat {}, {} cards released)",
            name,
            self.id,
            player.index(),
            released.len()
        );
        Ok(Kicked {
            player,
            marker,
            released,
            players: self.roster(),
        })
    }
}
