//! Objects lying on the table and the per-viewer visibility filter.
//!
//! Every object on the table (card, chip, dealer button, player marker)
//! shares one positional/ownership record, [`TableItem`]. The class-specific
//! part lives in [`ItemKind`] and is flattened into the same JSON object on
//! the wire, tagged by `class`:
//!
//! ```json
//! {"id": 7, "x": 156, "y": 20, "z_index": 1, "owner_id": "", "prev_owner_id": "",
//!  "class": "card", "rank": "8", "suit": "♠", "side": "cover"}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{TableError, TableResult};
use crate::user::UserId;

/// Item ID type, unique within one table.
pub type ItemId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "♠")]
    Spades,
    #[serde(rename = "♥")]
    Hearts,
    #[serde(rename = "♦")]
    Diamonds,
    #[serde(rename = "♣")]
    Clubs,
    /// Scrubbed suit of a card the viewer may not see.
    #[serde(rename = "")]
    Hidden,
}

impl Suit {
    /// Suits in deck order.
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Spades => "♠",
            Self::Hearts => "♥",
            Self::Diamonds => "♦",
            Self::Clubs => "♣",
            Self::Hidden => "",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
    /// Scrubbed rank of a card the viewer may not see.
    #[serde(rename = "")]
    Hidden,
}

impl Rank {
    /// Ranks in deck order, deuce to ace.
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
            Self::Ace => "A",
            Self::Hidden => "",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Face,
    Cover,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
    pub side: Side,
}

impl Card {
    /// Face-down card.
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self {
            rank,
            suit,
            side: Side::Cover,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.rank == Rank::Hidden && self.suit == Suit::Hidden
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChipColor {
    Gray,
    Red,
    Blue,
    Green,
    Black,
}

impl fmt::Display for ChipColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChipColor::Gray => write!(f, "gray"),
            ChipColor::Red => write!(f, "red"),
            ChipColor::Blue => write!(f, "blue"),
            ChipColor::Green => write!(f, "green"),
            ChipColor::Black => write!(f, "black"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chip {
    pub color: ChipColor,
    pub val: u32,
}

/// Every chip denomination, in layout order.
pub const CHIP_SET: [Chip; 5] = [
    Chip {
        color: ChipColor::Gray,
        val: 1,
    },
    Chip {
        color: ChipColor::Red,
        val: 5,
    },
    Chip {
        color: ChipColor::Blue,
        val: 10,
    },
    Chip {
        color: ChipColor::Green,
        val: 25,
    },
    Chip {
        color: ChipColor::Black,
        val: 50,
    },
];

/// Class of an item, as written in its `class` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Class {
    Card,
    Chip,
    Dealer,
    Player,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Class::Card => write!(f, "card"),
            Class::Chip => write!(f, "chip"),
            Class::Dealer => write!(f, "dealer"),
            Class::Player => write!(f, "player"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "lowercase")]
pub enum ItemKind {
    Card(Card),
    Chip(Chip),
    Dealer,
    Player,
}

impl ItemKind {
    pub fn class(&self) -> Class {
        match self {
            ItemKind::Card(_) => Class::Card,
            ItemKind::Chip(_) => Class::Chip,
            ItemKind::Dealer => Class::Dealer,
            ItemKind::Player => Class::Player,
        }
    }
}

/// A virtual object on the table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableItem {
    pub id: ItemId,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default, with = "owner_field")]
    pub owner_id: Option<UserId>,
    #[serde(default, with = "owner_field")]
    pub prev_owner_id: Option<UserId>,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl TableItem {
    pub fn new(id: ItemId, x: i32, y: i32, kind: ItemKind) -> Self {
        Self {
            id,
            x,
            y,
            z_index: 0,
            owner_id: None,
            prev_owner_id: None,
            kind,
        }
    }

    pub fn card(id: ItemId, x: i32, y: i32, card: Card) -> Self {
        Self::new(id, x, y, ItemKind::Card(card))
    }

    pub fn chip(id: ItemId, x: i32, y: i32, chip: Chip) -> Self {
        Self::new(id, x, y, ItemKind::Chip(chip))
    }

    pub fn dealer(id: ItemId, x: i32, y: i32) -> Self {
        Self::new(id, x, y, ItemKind::Dealer)
    }

    /// Marker representing a seated player; owned by that player.
    pub fn player_marker(id: ItemId, x: i32, y: i32, player: UserId) -> Self {
        let mut item = Self::new(id, x, y, ItemKind::Player);
        item.owner_id = Some(player);
        item
    }

    pub fn class(&self) -> Class {
        self.kind.class()
    }

    pub fn is(&self, class: Class) -> bool {
        self.class() == class
    }

    pub fn is_owned(&self) -> bool {
        self.owner_id.is_some()
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.owner_id.as_ref() == Some(user)
    }

    pub fn as_card(&self) -> Option<&Card> {
        match &self.kind {
            ItemKind::Card(card) => Some(card),
            _ => None,
        }
    }

    fn card_mut(&mut self) -> TableResult<&mut Card> {
        let id = self.id;
        match &mut self.kind {
            ItemKind::Card(card) => Ok(card),
            other => Err(TableError::Validation(format!(
                "item {id} is a {}, not a card",
                other.class()
            ))),
        }
    }

    /// Reveal a held card to everyone. Only the holder may do this; the card
    /// becomes unowned and face up, remembering who revealed it.
    pub fn show(&mut self, by: &UserId) -> TableResult<()> {
        if !self.is(Class::Card) {
            return Err(TableError::Validation(format!(
                "item {} is not a card",
                self.id
            )));
        }
        if !self.is_owned_by(by) {
            return Err(TableError::Authorization(
                "only the owner can show this card".to_string(),
            ));
        }
        self.prev_owner_id = self.owner_id.take();
        self.card_mut()?.side = Side::Face;
        Ok(())
    }

    /// Pick up an unowned card. Anything else is left untouched.
    ///
    /// Returns whether ownership changed. The side is not altered; what the
    /// new owner sees is decided by [`TableItem::apply_visibility_rules`].
    pub fn take(&mut self, by: &UserId) -> bool {
        if !self.is(Class::Card) || self.is_owned() {
            return false;
        }
        self.owner_id = Some(*by);
        true
    }

    /// Hand a card to another player. The giver must hold it, or it must be
    /// lying unowned on the table.
    pub fn give(&mut self, from: &UserId, to: &UserId) -> TableResult<()> {
        self.card_mut()?;
        if self.is_owned() && !self.is_owned_by(from) {
            return Err(TableError::Authorization(
                "this card belongs to another player".to_string(),
            ));
        }
        if let Some(prev) = self.owner_id.replace(*to) {
            self.prev_owner_id = Some(prev);
        }
        Ok(())
    }

    /// Apply a client-side move (and, for cards, a flip) to this item.
    ///
    /// The class must match. Cards held by someone else may be moved but
    /// not flipped.
    pub fn update_from(&mut self, by: &UserId, src: &TableItem) -> TableResult<()> {
        if src.class() != self.class() {
            return Err(TableError::Validation(format!(
                "item {} is a {}, got a {}",
                self.id,
                self.class(),
                src.class()
            )));
        }
        if let (ItemKind::Card(dest), ItemKind::Card(from)) = (&self.kind, &src.kind)
            && dest.side != from.side
            && self.is_owned()
            && !self.is_owned_by(by)
        {
            return Err(TableError::Authorization(
                "cannot turn another player's card".to_string(),
            ));
        }
        self.x = src.x;
        self.y = src.y;
        self.z_index = src.z_index;
        if let (ItemKind::Card(dest), ItemKind::Card(from)) = (&mut self.kind, &src.kind) {
            dest.side = from.side;
        }
        Ok(())
    }

    /// Turn a card to `side`. No effect on other classes.
    pub fn reset_side(&mut self, side: Side) {
        if let ItemKind::Card(card) = &mut self.kind {
            card.side = side;
        }
    }

    /// Redact this item for `viewer`.
    ///
    /// Must only ever be applied to an outbound copy. Cards held by the
    /// viewer are turned face up, cards held by anyone else are turned face
    /// down, and any face-down card has its rank and suit blanked.
    pub fn apply_visibility_rules(&mut self, viewer: &UserId) {
        let owner = self.owner_id;
        let ItemKind::Card(card) = &mut self.kind else {
            return;
        };
        match owner {
            Some(owner) if owner == *viewer => card.side = Side::Face,
            Some(_) => card.side = Side::Cover,
            None => {}
        }
        if card.side == Side::Cover {
            card.rank = Rank::Hidden;
            card.suit = Suit::Hidden;
        }
    }

    /// Redacted copy of this item for `viewer`.
    pub fn redacted_for(&self, viewer: &UserId) -> TableItem {
        let mut item = self.clone();
        item.apply_visibility_rules(viewer);
        item
    }
}

/// Ordered list of everything on a table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemList(Vec<TableItem>);

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    // Linear scan; tables hold a few hundred items at most.
    pub fn get(&self, id: ItemId) -> Option<&TableItem> {
        self.0.iter().find(|it| it.id == id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut TableItem> {
        self.0.iter_mut().find(|it| it.id == id)
    }

    /// Like [`ItemList::get_mut`], failing with a validation error.
    pub fn require_mut(&mut self, id: ItemId) -> TableResult<&mut TableItem> {
        self.get_mut(id).ok_or_else(|| TableError::item_not_found(id))
    }

    pub fn push(&mut self, item: TableItem) {
        self.0.push(item);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TableItem> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TableItem> {
        self.0.iter_mut()
    }

    pub fn as_slice(&self) -> &[TableItem] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [TableItem] {
        &mut self.0
    }

    /// Items from `start` to the end, cloned.
    pub fn tail(&self, start: usize) -> Vec<TableItem> {
        self.0.get(start..).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// Remove the first item matching `pred`.
    pub fn remove_first(&mut self, pred: impl Fn(&TableItem) -> bool) -> Option<TableItem> {
        let idx = self.0.iter().position(pred)?;
        Some(self.0.remove(idx))
    }

    pub fn count(&self, class: Class) -> usize {
        self.0.iter().filter(|it| it.is(class)).count()
    }
}

impl<'a> IntoIterator for &'a ItemList {
    type Item = &'a TableItem;
    type IntoIter = std::slice::Iter<'a, TableItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<TableItem>> for ItemList {
    fn from(items: Vec<TableItem>) -> Self {
        Self(items)
    }
}

/// Owner ids travel as strings; the empty string means unowned.
mod owner_field {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use uuid::Uuid;

    pub fn serialize<S>(owner: &Option<Uuid>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match owner {
            Some(id) => serializer.collect_str(id),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(None);
        }
        Uuid::parse_str(&s).map(Some).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ace_of_spades(id: ItemId) -> TableItem {
        TableItem::card(id, 0, 0, Card::new(Rank::Ace, Suit::Spades))
    }

    #[test]
    fn test_take_sets_owner_and_keeps_side() {
        let user = Uuid::new_v4();
        let mut item = ace_of_spades(5);

        assert!(item.take(&user));
        assert_eq!(item.owner_id, Some(user));
        assert_eq!(item.as_card().map(|c| c.side), Some(Side::Cover));
    }

    #[test]
    fn test_take_owned_card_is_noop() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut item = ace_of_spades(1);
        item.take(&a);

        assert!(!item.take(&b));
        assert_eq!(item.owner_id, Some(a));
    }

    #[test]
    fn test_take_non_card_is_noop() {
        let user = Uuid::new_v4();
        let mut chip = TableItem::chip(1, 0, 0, CHIP_SET[0]);
        assert!(!chip.take(&user));
        assert!(!chip.is_owned());
    }

    #[test]
    fn test_show_by_owner() {
        let user = Uuid::new_v4();
        let mut item = ace_of_spades(1);
        item.take(&user);

        item.show(&user).unwrap();

        assert_eq!(item.owner_id, None);
        assert_eq!(item.prev_owner_id, Some(user));
        assert_eq!(item.as_card().map(|c| c.side), Some(Side::Face));
    }

    #[test]
    fn test_show_by_non_owner_fails() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut item = ace_of_spades(1);
        item.take(&a);

        let err = item.show(&b).unwrap_err();
        assert!(matches!(err, TableError::Authorization(_)));
        assert_eq!(item.owner_id, Some(a));
    }

    #[test]
    fn test_show_unowned_card_fails() {
        let mut item = ace_of_spades(1);
        assert!(matches!(
            item.show(&Uuid::new_v4()),
            Err(TableError::Authorization(_))
        ));
    }

    #[test]
    fn test_show_chip_is_validation_error() {
        let mut chip = TableItem::chip(1, 0, 0, CHIP_SET[1]);
        assert!(matches!(
            chip.show(&Uuid::new_v4()),
            Err(TableError::Validation(_))
        ));
    }

    #[test]
    fn test_give_moves_ownership() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut item = ace_of_spades(1);
        item.take(&a);

        item.give(&a, &b).unwrap();
        assert_eq!(item.owner_id, Some(b));
        assert_eq!(item.prev_owner_id, Some(a));

        assert!(matches!(item.give(&a, &a), Err(TableError::Authorization(_))));
    }

    #[test]
    fn test_visibility_owner_sees_face() {
        let user = Uuid::new_v4();
        let mut item = ace_of_spades(1);
        item.take(&user);

        let view = item.redacted_for(&user);
        let card = view.as_card().unwrap();
        assert_eq!(card.side, Side::Face);
        assert_eq!(card.rank, Rank::Ace);
        assert_eq!(card.suit, Suit::Spades);
    }

    #[test]
    fn test_visibility_other_owner_scrubbed() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut item = ace_of_spades(1);
        item.take(&a);
        if let ItemKind::Card(card) = &mut item.kind {
            card.side = Side::Face;
        }

        let view = item.redacted_for(&b);
        let card = view.as_card().unwrap();
        assert_eq!(card.side, Side::Cover);
        assert!(card.is_hidden());
        // Canonical value untouched
        assert_eq!(item.as_card().unwrap().rank, Rank::Ace);
    }

    #[test]
    fn test_visibility_unowned_face_card_stays_visible() {
        let mut item = ace_of_spades(1);
        if let ItemKind::Card(card) = &mut item.kind {
            card.side = Side::Face;
        }
        let view = item.redacted_for(&Uuid::new_v4());
        assert_eq!(view, item);
    }

    #[test]
    fn test_visibility_ignores_non_cards() {
        let user = Uuid::new_v4();
        let marker = TableItem::player_marker(3, 0, 0, Uuid::new_v4());
        assert_eq!(marker.redacted_for(&user), marker);
    }

    #[test]
    fn test_update_from_moves_item() {
        let user = Uuid::new_v4();
        let mut chip = TableItem::chip(9, 0, 0, CHIP_SET[2]);
        let mut src = chip.clone();
        src.x = 300;
        src.y = 120;
        src.z_index = 4;

        chip.update_from(&user, &src).unwrap();
        assert_eq!((chip.x, chip.y, chip.z_index), (300, 120, 4));
    }

    #[test]
    fn test_update_from_rejects_class_mismatch() {
        let user = Uuid::new_v4();
        let mut chip = TableItem::chip(9, 0, 0, CHIP_SET[2]);
        let src = TableItem::dealer(9, 10, 10);
        assert!(matches!(
            chip.update_from(&user, &src),
            Err(TableError::Validation(_))
        ));
        assert_eq!((chip.x, chip.y), (0, 0));
    }

    #[test]
    fn test_update_from_cannot_flip_foreign_card() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut item = ace_of_spades(1);
        item.take(&a);
        let mut src = item.clone();
        if let ItemKind::Card(card) = &mut src.kind {
            card.side = Side::Face;
        }

        assert!(matches!(
            item.update_from(&b, &src),
            Err(TableError::Authorization(_))
        ));
        item.update_from(&a, &src).unwrap();
        assert_eq!(item.as_card().unwrap().side, Side::Face);
    }

    #[test]
    fn test_wire_format() {
        let user = Uuid::new_v4();
        let mut item = ace_of_spades(7);
        item.take(&user);

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["class"], "card");
        assert_eq!(json["rank"], "A");
        assert_eq!(json["suit"], "♠");
        assert_eq!(json["side"], "cover");
        assert_eq!(json["owner_id"], user.to_string());
        assert_eq!(json["prev_owner_id"], "");

        let back: TableItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_wire_format_hidden_card() {
        let mut item = ace_of_spades(7);
        item.apply_visibility_rules(&Uuid::new_v4());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["rank"], "");
        assert_eq!(json["suit"], "");
    }

    #[test]
    fn test_item_list_lookup_and_remove() {
        let owner = Uuid::new_v4();
        let mut list = ItemList::from(vec![
            ace_of_spades(1),
            TableItem::player_marker(2, 0, 0, owner),
            TableItem::dealer(3, 0, 0),
        ]);

        assert!(list.get(2).is_some());
        assert!(matches!(list.require_mut(99), Err(TableError::Validation(_))));

        let removed = list.remove_first(|it| it.is(Class::Player) && it.is_owned_by(&owner));
        assert_eq!(removed.map(|it| it.id), Some(2));
        assert_eq!(list.len(), 2);
        assert_eq!(list.count(Class::Player), 0);
    }
}
