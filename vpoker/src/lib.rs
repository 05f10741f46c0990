//! # Virtual Poker
//!
//! A shared poker tabletop. Several players move cards and chips around one
//! table in real time; each of them sees a view redacted to what they are
//! entitled to know. There is no rules engine: the table only enforces who
//! may hold, show and flip cards.
//!
//! ## Architecture
//!
//! - **Table**: one lock per table; every change runs as a closure inside
//!   [`Table::update`], every read inside [`Table::read_lock`]
//! - **Items**: cards, chips, the dealer button and seat markers, with the
//!   per-viewer visibility filter
//! - **Dealing**: deck creation, bank chip layout and shuffling
//! - **Seats**: lowest-free-seat allocation, starting chip racks, kicking
//! - **Push**: bounded, per-player notification channels with a delivery
//!   timeout so one slow client cannot hold up the others
//!
//! ## Core Modules
//!
//! - [`table`]: the table aggregate and everything on it
//! - [`registry`]: users and tables held by a running server
//! - [`persistence`]: the on-disk state file
//! - [`user`]: user identity
//!
//! ## Example
//!
//! ```
//! use vpoker::{Table, user::User};
//! use uuid::Uuid;
//!
//! let table = Table::started(Uuid::new_v4(), 50).unwrap();
//! let alice = User::random("alice");
//! let items = table.update(|t| t.join(&alice)).unwrap().unwrap();
//!
//! // marker plus 26 rack chips
//! assert_eq!(items.len(), 27);
//! ```

/// The table aggregate: items, dealing, seats and push delivery.
pub mod table;
pub use table::{
    Push, PushKind, Table, TableError, TableId, TableItem, TableResult, TableState,
    constants::{self, MAX_SEATS},
};

pub mod persistence;
pub mod registry;
pub mod user;

pub use persistence::{SavedState, StateError, StateFile};
pub use registry::{TableRegistry, UserRegistry};
