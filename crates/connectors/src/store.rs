use crate::error::StoreError;
use async_trait::async_trait;
use model::{
    records::UserRecord,
    table::{TableRef, TableSchema},
};

/// Outcome of an idempotent table-creation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The table was already there; treated as success by callers.
    AlreadyExists,
}

/// A remote analytical table store.
///
/// Implementations own transport and authentication; callers see only
/// idempotent table creation and per-session row loads.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Create `table` with `schema`, classifying an existing table as
    /// [`CreateOutcome::AlreadyExists`] rather than an error.
    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
    ) -> Result<CreateOutcome, StoreError>;

    /// Open a long-lived load session. Each pipeline worker holds exactly one
    /// for its whole lifetime; sessions are never shared.
    async fn open_session(&self) -> Result<Box<dyn StoreSession>, StoreError>;
}

/// One connection-like handle for streaming inserts.
#[async_trait]
pub trait StoreSession: Send + Sync {
    /// Append `rows` to `table` in a single load call.
    async fn insert_rows(&self, table: &TableRef, rows: &[UserRecord]) -> Result<(), StoreError>;

    /// Release the session. Called once, after the owning worker has drained
    /// its input queue.
    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}
