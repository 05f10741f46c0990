//! Saving and restoring users and tables.
//!
//! The state file holds two JSON documents, one per line: first the users
//! map, then the tables map. Each save writes a sibling temporary file and
//! renames it over the old one, so a crash mid-save leaves the previous
//! state intact. Loading rejects tables whose seats, markers or card owners
//! do not add up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::registry::{TableRegistry, UserRegistry};
use crate::table::{Table, TableId, TableState};
use crate::user::{User, UserId};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("State file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State file JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("State file is corrupt: {0}")]
    Corrupt(String),
}

pub type StateResult<T> = Result<T, StateError>;

/// Everything read back from a state file.
#[derive(Debug, Default)]
pub struct SavedState {
    pub users: HashMap<UserId, User>,
    pub tables: HashMap<TableId, Table>,
}

#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every user and table.
    pub async fn save(&self, users: &UserRegistry, tables: &TableRegistry) -> StateResult<()> {
        let users = users.snapshot().await;
        let tables = tables.snapshot().await;

        let mut buf = serde_json::to_vec(&users)?;
        buf.push(b'\n');
        let tables: HashMap<&TableId, &Table> = tables.iter().map(|(id, t)| (id, t.as_ref())).collect();
        serde_json::to_writer(&mut buf, &tables)?;
        buf.push(b'\n');

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        // Each save gets its own temporary file so overlapping saves never
        // write into each other's buffer.
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &buf).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        log::info!(
            "Saved {} users and {} tables to {}",
            users.len(),
            tables.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read the state file. A missing file is an empty state.
    pub async fn load(&self) -> StateResult<SavedState> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No state file at {}, starting empty", self.path.display());
                return Ok(SavedState::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut lines = contents.lines();
        let users_line = lines
            .next()
            .ok_or_else(|| StateError::Corrupt("missing users line".to_string()))?;
        let tables_line = lines
            .next()
            .ok_or_else(|| StateError::Corrupt("missing tables line".to_string()))?;

        let users: HashMap<UserId, User> = serde_json::from_str(users_line)?;
        let states: HashMap<TableId, TableState> = serde_json::from_str(tables_line)?;

        let mut tables = HashMap::with_capacity(states.len());
        for (key, state) in states {
            if key != state.id {
                return Err(StateError::Corrupt(format!(
                    "table stored under {key} has id {}",
                    state.id
                )));
            }
            let table = Table::restore(state)
                .map_err(|e| StateError::Corrupt(format!("table {key}: {e}")))?;
            tables.insert(key, table);
        }

        log::info!(
            "Loaded {} users and {} tables from {}",
            users.len(),
            tables.len(),
            self.path.display()
        );
        Ok(SavedState { users, tables })
    }
}
