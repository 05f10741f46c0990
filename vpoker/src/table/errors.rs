//! Table error types.

use thiserror::Error;

/// Errors returned from table transactions.
///
/// Every variant is produced inside an `update`/`read_lock` closure and
/// handed back to the caller after the table lock has been released.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// Unknown item id, or an item of the wrong class for the operation
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Acting user is not seated, or does not own the item
    #[error("Forbidden: {0}")]
    Authorization(String),

    /// Every seat is already taken
    #[error("This table is full ({max_seats} seats)")]
    Capacity { max_seats: usize },

    /// Kick target is not at the table
    #[error("Not found: {0}")]
    NotFound(String),
}

impl TableError {
    pub fn item_not_found(id: u64) -> Self {
        TableError::Validation(format!("item {id} not found"))
    }

    pub fn not_at_table() -> Self {
        TableError::Authorization("you are not at the table".to_string())
    }

    /// Message safe to put on the wire.
    pub fn client_message(&self) -> String {
        match self {
            TableError::Validation(msg)
            | TableError::Authorization(msg)
            | TableError::NotFound(msg) => msg.clone(),
            TableError::Capacity { .. } => "this table is full".to_string(),
        }
    }
}

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_detail() {
        let err = TableError::Capacity { max_seats: 3 };
        assert!(err.to_string().contains('3'));

        let err = TableError::item_not_found(42);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_client_message_drops_prefix() {
        assert_eq!(
            TableError::not_at_table().client_message(),
            "you are not at the table"
        );
        assert_eq!(
            TableError::Capacity { max_seats: 3 }.client_message(),
            "this table is full"
        );
    }
}
