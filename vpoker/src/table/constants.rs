//! Fixed table geometry and delivery limits.

use std::time::Duration;

/// Number of seats at one table.
pub const MAX_SEATS: usize = 3;

/// Number of cards in the deck block at the head of the item list.
pub const DECK_SIZE: usize = 52;

/// Chips of each color laid out by a fresh game unless configured otherwise.
pub const DEFAULT_CHIPS_PER_COLOR: usize = 50;

/// Upper bound on how long one dispatch may wait for a slow receiver.
pub const DISPATCH_TIMEOUT: Duration = Duration::from_millis(50);

/// Capacity of a player's push mailbox.
pub const MAILBOX_CAPACITY: usize = 16;

/// Where the shuffled deck strip starts.
pub const DECK_ORIGIN: (i32, i32) = (150, 20);

/// Where the bank chip rows start; each color gets its own row.
pub const BANK_ORIGIN: (i32, i32) = (10, 20);
pub const BANK_ROW_HEIGHT: i32 = 100;

pub const DEALER_POSITION: (i32, i32) = (595, 315);

/// Rendered chip diameter, used to space chip columns in a rack.
pub const CHIP_WIDTH: i32 = 40;

/// Horizontal offset between stacked chips of one color.
pub const CHIP_STACK_STEP: i32 = 2;

/// Top-left corner of each seat's chip rack, indexed by seat.
pub const SEAT_SLOTS: [(i32, i32); MAX_SEATS] = [(140, 545), (890, 10), (890, 545)];

/// In-game color of each seat.
pub const SEAT_COLORS: [&str; MAX_SEATS] = ["#FF5733", "#9B59B6", "#2ECC71"];
