//! Inning state aggregate and related types.

mod aggregate;
mod baserunning;
mod events;
mod state;

pub use aggregate::{AtBatOutcome, InningState, OUTS_PER_HALF};
pub use events::{
    AtBatCompletedData, CurrentBatterChangedData, HalfInningEndedData, InningStateCreatedData,
    InningStateEvent, RunScoredData, RunnerAdvancedData, RunnerOutData,
};
pub use state::InningProgress;

use thiserror::Error;

use crate::value_objects::{BattingSlot, PlayerId, ValidationError};

/// Errors that can occur while recording plays.
#[derive(Debug, Error)]
pub enum InningStateError {
    /// The batting side has nobody in its order.
    #[error("The batting team has an empty lineup")]
    EmptyLineup,

    #[error("Batting slot {slot} is outside a lineup of {lineup_len}")]
    SlotOutsideLineup { slot: BattingSlot, lineup_len: u8 },

    /// Batting out of order.
    #[error("Slot {expected} is due up, not slot {actual}")]
    NotBattersTurn {
        expected: BattingSlot,
        actual: BattingSlot,
    },

    #[error("Batter {batter} is already on base")]
    BatterOnBase { batter: PlayerId },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
