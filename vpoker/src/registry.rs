//! In-memory registries of users and tables.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::table::{Table, TableId, TableResult};
use crate::user::{User, UserId};

/// Every registered user, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct UserRegistry {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(users: HashMap<UserId, User>) -> Self {
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }

    /// Register a new user under a fresh id.
    pub async fn register(&self, name: &str) -> User {
        let user = User::random(name.trim());
        self.users.write().await.insert(user.id, user.clone());
        log::info!("Registered user {}", user);
        user
    }

    pub async fn get(&self, id: &UserId) -> Option<User> {
        self.users.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Copy of the whole map, for saving.
    pub async fn snapshot(&self) -> HashMap<UserId, User> {
        self.users.read().await.clone()
    }
}

/// Every live table. Tables are never removed.
#[derive(Debug, Clone)]
pub struct TableRegistry {
    tables: Arc<RwLock<HashMap<TableId, Arc<Table>>>>,
    chips_per_color: usize,
}

impl TableRegistry {
    pub fn new(chips_per_color: usize) -> Self {
        Self::from_tables(HashMap::new(), chips_per_color)
    }

    pub fn from_tables(tables: HashMap<TableId, Table>, chips_per_color: usize) -> Self {
        let tables = tables
            .into_iter()
            .map(|(id, table)| (id, Arc::new(table)))
            .collect();
        Self {
            tables: Arc::new(RwLock::new(tables)),
            chips_per_color,
        }
    }

    /// Start a new game on a fresh table.
    pub async fn create(&self) -> TableResult<Arc<Table>> {
        let table = Arc::new(Table::started(TableId::new_v4(), self.chips_per_color)?);
        self.tables
            .write()
            .await
            .insert(table.id(), Arc::clone(&table));
        log::info!("Created table {}", table.id());
        Ok(table)
    }

    pub async fn get(&self, id: &TableId) -> Option<Arc<Table>> {
        self.tables.read().await.get(id).cloned()
    }

    pub async fn ids(&self) -> Vec<TableId> {
        self.tables.read().await.keys().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.is_empty()
    }

    /// Handles to every table, for saving.
    pub async fn snapshot(&self) -> HashMap<TableId, Arc<Table>> {
        self.tables.read().await.clone()
    }
}
