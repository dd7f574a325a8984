use thiserror::Error;

use crate::{AggregateId, Version};

/// Failures of the event and snapshot stores.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Optimistic concurrency rejected the batch; none of it was stored.
    #[error("stream {aggregate_id} is at version {actual}, append expected {expected}")]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The batch handed to `append` was rejected before touching storage.
    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// A persisted row could not be mapped back into an event or snapshot.
    #[error("unreadable stored row: {0}")]
    InvalidRow(String),

    #[error("storage failure: {0}")]
    Database(#[from] sqlx::Error),

    #[error("schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("payload encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, EventStoreError>;
