//! One type per user-facing action.
//!
//! Every use case loads the aggregates it touches, runs all domain methods
//! in memory, then persists in a fixed order. Each `execute` returns an
//! [`ActionResult`](crate::dto::ActionResult) and never an `Err`.

mod end_inning;
mod record_at_bat;
mod start_new_game;
mod substitute_player;
mod undo_redo;

pub use end_inning::{EndInning, EndInningCommand};
pub use record_at_bat::{RecordAtBat, RecordAtBatCommand};
pub use start_new_game::{LineupEntryInput, PlayerInput, StartNewGame, StartNewGameCommand};
pub use substitute_player::{SubstitutePlayer, SubstitutePlayerCommand};
pub use undo_redo::{RedoLastAction, RedoLastActionCommand, UndoLastAction, UndoLastActionCommand};

use domain::{Game, GameEnding};

use crate::error::Result;

/// Completes the game when the half about to be played cannot change the
/// outcome.
pub(crate) fn complete_if_decided(game: &mut Game, regulation_innings: u32) -> Result<bool> {
    if game.status().is_in_progress() && game.is_decided(regulation_innings) {
        game.complete_game(GameEnding::Regulation)?;
        return Ok(true);
    }
    Ok(false)
}
