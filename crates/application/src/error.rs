//! Application error types.

use common::{AggregateId, AggregateType, GameId, IdError};
use domain::{DomainError, GameStatus, PlayerId, TeamSide, ValidationError};
use thiserror::Error;

use crate::history::AggregateChange;

/// Errors raised while executing a use case.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Invalid identifier: {0}")]
    Id(#[from] IdError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Game not found: {0}")]
    GameNotFound(GameId),

    #[error("No {side} lineup for game {game_id}")]
    LineupNotFound { game_id: GameId, side: TeamSide },

    #[error("No inning state for game {0}")]
    InningStateNotFound(GameId),

    #[error("Game {game_id} is {status}, not in progress")]
    GameNotInProgress { game_id: GameId, status: GameStatus },

    /// The aggregates of one game disagree, usually after a partial failure.
    #[error("Game {game_id} is out of sync: {reason}")]
    OutOfSync { game_id: GameId, reason: String },

    #[error("Invalid lineup: {0}")]
    InvalidLineup(String),

    #[error("Batting slot {slot} is empty")]
    EmptySlot { slot: u8 },

    #[error("{expected} is due up in slot {slot}, not {actual}")]
    WrongBatter {
        slot: u8,
        expected: PlayerId,
        actual: PlayerId,
    },

    #[error("Nothing to undo for game {0}")]
    NothingToUndo(GameId),

    #[error("Nothing to redo for game {0}")]
    NothingToRedo(GameId),

    /// The aggregate changed after the history entry was recorded.
    #[error("Aggregate {aggregate_id} changed since the action was recorded")]
    HistoryDiverged { aggregate_id: AggregateId },

    /// Some aggregates were persisted before a later save failed.
    #[error("Persisted {} aggregate(s) before {failed} failed: {source}", persisted.len())]
    PartialFailure {
        persisted: Vec<AggregateChange>,
        failed: AggregateType,
        #[source]
        source: DomainError,
    },
}

/// Coarse classification used by outer layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Rejected,
    PartialFailure,
    Internal,
}

impl ApplicationError {
    /// True when retrying the same command may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApplicationError::Domain(e) if e.is_concurrency_conflict())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::Domain(e) if e.is_concurrency_conflict() => ErrorKind::Conflict,
            ApplicationError::Domain(DomainError::AggregateNotFound { .. })
            | ApplicationError::Domain(DomainError::VersionNotFound { .. }) => ErrorKind::NotFound,
            ApplicationError::Domain(DomainError::Validation(_))
            | ApplicationError::Domain(DomainError::Id(_)) => ErrorKind::Validation,
            ApplicationError::Domain(e) if e.is_rule_violation() => ErrorKind::Rejected,
            ApplicationError::Domain(_) => ErrorKind::Internal,
            ApplicationError::Id(_)
            | ApplicationError::Validation(_)
            | ApplicationError::InvalidLineup(_) => ErrorKind::Validation,
            ApplicationError::GameNotFound(_)
            | ApplicationError::LineupNotFound { .. }
            | ApplicationError::InningStateNotFound(_) => ErrorKind::NotFound,
            ApplicationError::GameNotInProgress { .. }
            | ApplicationError::EmptySlot { .. }
            | ApplicationError::WrongBatter { .. }
            | ApplicationError::NothingToUndo(_)
            | ApplicationError::NothingToRedo(_) => ErrorKind::Rejected,
            ApplicationError::OutOfSync { .. } | ApplicationError::HistoryDiverged { .. } => {
                ErrorKind::Conflict
            }
            ApplicationError::PartialFailure { .. } => ErrorKind::PartialFailure,
        }
    }
}

impl From<domain::GameError> for ApplicationError {
    fn from(e: domain::GameError) -> Self {
        ApplicationError::Domain(e.into())
    }
}

impl From<domain::TeamLineupError> for ApplicationError {
    fn from(e: domain::TeamLineupError) -> Self {
        ApplicationError::Domain(e.into())
    }
}

impl From<domain::InningStateError> for ApplicationError {
    fn from(e: domain::InningStateError) -> Self {
        ApplicationError::Domain(e.into())
    }
}

pub type Result<T> = std::result::Result<T, ApplicationError>;
