//! Laying out a fresh game and shuffling the deck.

use rand::seq::SliceRandom;
use rand::Rng;

use super::constants::{BANK_ORIGIN, BANK_ROW_HEIGHT, DEALER_POSITION, DECK_ORIGIN, DECK_SIZE};
use super::item::{Card, CHIP_SET, Class, Rank, Side, Suit, TableItem};
use super::{TableError, TableResult, TableState};

/// The 52 cards in creation order: suit by suit, two to ace.
pub fn deck() -> Vec<Card> {
    Suit::ALL
        .iter()
        .flat_map(|&suit| Rank::ALL.iter().map(move |&rank| Card::new(rank, suit)))
        .collect()
}

impl TableState {
    /// Create the deck, shuffle it, lay out the bank chips and the dealer
    /// button. Only valid on an empty table.
    pub fn start_game(&mut self) -> TableResult<()> {
        if !self.items.is_empty() {
            return Err(TableError::Validation("game already started".to_string()));
        }

        for card in deck() {
            let id = self.next_id();
            self.items.push(TableItem::card(id, 0, 0, card));
        }
        self.shuffle();

        let (x0, mut y) = BANK_ORIGIN;
        for chip in CHIP_SET {
            let mut x = x0;
            for _ in 0..self.chips_per_color() {
                let id = self.next_id();
                self.items.push(TableItem::chip(id, x, y, chip));
                x += 1;
            }
            y += BANK_ROW_HEIGHT;
        }

        let id = self.next_id();
        let (x, y) = DEALER_POSITION;
        self.items.push(TableItem::dealer(id, x, y));

        log::info!(
            "Table {} started with {} items",
            self.id,
            self.items.len()
        );
        Ok(())
    }

    /// Gather every card back into the deck strip, face down and unowned,
    /// in a fresh random order.
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::rng());
    }

    /// [`TableState::shuffle`] with a caller-supplied random source.
    ///
    /// The deck is the leading run of cards; a table that was never started
    /// has none, and nothing else is touched.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let deck_len = self
            .items
            .iter()
            .take(DECK_SIZE)
            .take_while(|it| it.is(Class::Card))
            .count();
        let deck = &mut self.items.as_mut_slice()[..deck_len];
        deck.shuffle(rng);

        let (x0, y) = DECK_ORIGIN;
        for (offset, item) in (0..).zip(deck.iter_mut()) {
            item.x = x0 + offset;
            item.y = y;
            item.z_index = 1;
            item.owner_id = None;
            item.prev_owner_id = None;
            item.reset_side(Side::Cover);
        }
    }
}
