//! Game aggregate and related types.

mod aggregate;
mod events;
mod state;

pub use aggregate::Game;
pub use events::{
    GameCompletedData, GameCreatedData, GameEvent, GameStartedData, HalfInningAdvancedData,
    ScoreUpdatedData,
};
pub use state::{GameState, GameStreams};

use thiserror::Error;

use crate::value_objects::{GameStatus, ValidationError};

/// Errors that can occur during game operations.
#[derive(Debug, Error)]
pub enum GameError {
    /// A team name is empty, too long or duplicated.
    #[error("Invalid team name: {0}")]
    InvalidTeamName(String),

    /// Game is not in the expected status.
    #[error("Cannot {action} a game that is {status}")]
    InvalidStatus {
        status: GameStatus,
        action: &'static str,
    },

    /// Runs must be positive.
    #[error("Invalid runs: {runs} (must be greater than 0)")]
    InvalidRuns { runs: u32 },

    /// An event failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
