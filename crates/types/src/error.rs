//! Unified error type for the oauthkeep workspace.

use thiserror::Error;

/// Enumerates all error kinds the stores can surface.
///
/// A missing record is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// JSON serialization of a record, or deserialization of a stored blob.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connection or query failure reported by the database.
    #[error("database error: {0}")]
    Database(String),

    /// A store was constructed with options it cannot run with.
    #[error("invalid store option: {0}")]
    InvalidOption(String),

    /// A record with the same primary key already exists.
    #[error("duplicate record: {0}")]
    Duplicate(String),
}

// ── Feature-gated From impls ──────────────────────────────────────────────────

#[cfg(feature = "sea-orm")]
impl From<sea_orm::DbErr> for StoreError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Database(e.to_string())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StoreError>;
