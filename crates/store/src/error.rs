use thiserror::Error;

/// Errors that can occur when interacting with a repository or the ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An intermediate variant was handed to `save`.
    ///
    /// This is a programming error in the caller, not a business failure.
    #[error("Cannot save {kind} in non-terminal state {status}")]
    NonTerminal {
        kind: &'static str,
        status: &'static str,
    },

    /// The backing store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            StoreError::NonTerminal { .. }
            | StoreError::Migration(_)
            | StoreError::Serialization(_) => false,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
