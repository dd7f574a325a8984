use std::sync::Arc;
use std::time::Instant;

use common::GameId;
use domain::{AtBatResult, PlayerId};
use event_store::{EventStore, SnapshotStore};
use serde::{Deserialize, Serialize};

use crate::dto::ActionResult;
use crate::error::{ApplicationError, Result};
use crate::history::{ActionEntry, ActionKind};
use crate::services::{Core, UnitOfWork};

use super::complete_if_decided;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordAtBatCommand {
    pub game_id: GameId,
    pub batter_id: PlayerId,
    pub result: AtBatResult,
}

/// Records one plate appearance.
///
/// Reads the batting TeamLineup, then persists InningState before Game.
pub struct RecordAtBat<S, P> {
    core: Arc<Core<S, P>>,
}

impl<S, P> RecordAtBat<S, P>
where
    S: EventStore + 'static,
    P: SnapshotStore + 'static,
{
    pub(crate) fn new(core: Arc<Core<S, P>>) -> Self {
        Self { core }
    }

    #[tracing::instrument(skip(self, command), fields(game_id = %command.game_id, result = ?command.result))]
    pub async fn execute(&self, command: RecordAtBatCommand) -> ActionResult {
        let started = Instant::now();
        let _guard = self.core.locks.acquire(&command.game_id).await;
        let outcome = self.run(&command).await;
        self.core
            .finish("record_at_bat", &command.game_id, started, outcome)
            .await
    }

    async fn run(&self, command: &RecordAtBatCommand) -> Result<()> {
        let game_id = &command.game_id;
        let mut game = self.core.load_game_in_progress(game_id).await?;
        let mut inning = self.core.load_inning(&game).await?;
        Core::<S, P>::ensure_in_sync(&game, &inning)?;

        let side = inning.batting_side();
        let lineup = self.core.load_lineup(&game, side).await?;
        let slot = inning.current_batter_slot(side);
        let due_up = lineup
            .player_at(slot)
            .ok_or(ApplicationError::EmptySlot { slot: slot.value() })?;
        if due_up.player_id != command.batter_id {
            return Err(ApplicationError::WrongBatter {
                slot: slot.value(),
                expected: due_up.player_id.clone(),
                actual: command.batter_id.clone(),
            });
        }

        let outcome = inning.record_at_bat(
            command.batter_id.clone(),
            slot,
            command.result,
            lineup.batting_order_len(),
        )?;
        if outcome.runs_scored > 0 {
            game.add_runs(side, outcome.runs_scored)?;
        }
        if outcome.half_inning_ended {
            game.advance_half_inning()?;
        }
        let completed = complete_if_decided(&mut game, self.core.config.regulation_innings)?;

        let mut work = UnitOfWork::new();
        work.save(&self.core.innings, &mut inning).await?;
        work.save(&self.core.games, &mut game).await?;

        self.core
            .history
            .record(ActionEntry::new(
                game_id.clone(),
                ActionKind::RecordAtBat,
                work.into_changes(),
            ))
            .await;

        tracing::info!(
            %game_id,
            batter = %command.batter_id,
            runs = outcome.runs_scored,
            rbi = outcome.rbi,
            half_inning_ended = outcome.half_inning_ended,
            completed,
            "at-bat recorded"
        );
        Ok(())
    }
}
