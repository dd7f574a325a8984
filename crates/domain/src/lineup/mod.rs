//! Team lineup aggregate and related types.

mod aggregate;
mod events;
mod state;

pub use aggregate::{IncomingPlayer, TeamLineup};
pub use events::{
    FieldPositionChangedData, PlayerAddedData, PlayerSubstitutedData, TeamLineupCreatedData,
    TeamLineupEvent,
};
pub use state::{PlayerStatus, RosterEntry, SlotOccupant, SubstitutionRecord, TeamLineupState};

use thiserror::Error;

use crate::value_objects::{BattingSlot, JerseyNumber, PlayerId, ValidationError};

/// Errors that can occur during lineup operations.
#[derive(Debug, Error)]
pub enum TeamLineupError {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Batting slot {slot} is already filled")]
    SlotOccupied { slot: BattingSlot },

    #[error("Batting slot {slot} is empty")]
    SlotEmpty { slot: BattingSlot },

    #[error("Player {player_id} is already in the lineup")]
    PlayerAlreadyInLineup { player_id: PlayerId },

    #[error("Player {player_id} is not in the game")]
    PlayerNotActive { player_id: PlayerId },

    #[error("Jersey {jersey_number} is already worn by {holder}")]
    DuplicateJersey {
        jersey_number: JerseyNumber,
        holder: PlayerId,
    },

    /// Only starters may re-enter, once, and only in their starting slot.
    #[error("Player {player_id} is not eligible to re-enter")]
    ReentryNotAllowed { player_id: PlayerId },

    #[error("Invalid inning: {inning} (must be at least 1)")]
    InvalidInning { inning: u32 },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
