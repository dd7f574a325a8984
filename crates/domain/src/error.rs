//! Domain error types.

use common::{AggregateType, IdError};
use event_store::EventStoreError;
use thiserror::Error;

use crate::game::GameError;
use crate::inning::InningStateError;
use crate::lineup::TeamLineupError;
use crate::value_objects::ValidationError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A business rule of the game aggregate was violated.
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    /// A business rule of a team lineup was violated.
    #[error("Team lineup error: {0}")]
    TeamLineup(#[from] TeamLineupError),

    /// A business rule of the inning state was violated.
    #[error("Inning state error: {0}")]
    InningState(#[from] InningStateError),

    /// A value object or event failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An identifier failed validation.
    #[error("Invalid identifier: {0}")]
    Id(#[from] IdError),

    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: AggregateType,
        aggregate_id: String,
    },

    /// A historical version was requested that the stream does not have.
    #[error("{aggregate_type} {aggregate_id} has no version {requested} (current {current})")]
    VersionNotFound {
        aggregate_type: AggregateType,
        aggregate_id: String,
        requested: i64,
        current: i64,
    },

    /// A stored stream cannot be folded.
    #[error("Corrupt stream for {aggregate_id}: {reason}")]
    CorruptStream {
        aggregate_id: String,
        reason: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// True when the write lost an optimistic-concurrency race.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, DomainError::EventStore(e) if e.is_concurrency_conflict())
    }

    /// True for rule violations raised before anything was written.
    pub fn is_rule_violation(&self) -> bool {
        matches!(
            self,
            DomainError::Game(_)
                | DomainError::TeamLineup(_)
                | DomainError::InningState(_)
                | DomainError::Validation(_)
                | DomainError::Id(_)
        )
    }
}
