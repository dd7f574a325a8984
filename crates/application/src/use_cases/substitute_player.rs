use std::sync::Arc;
use std::time::Instant;

use common::GameId;
use domain::{BattingSlot, TeamSide};
use event_store::{EventStore, SnapshotStore};
use serde::{Deserialize, Serialize};

use crate::dto::ActionResult;
use crate::error::Result;
use crate::history::{ActionEntry, ActionKind};
use crate::services::{Core, UnitOfWork};

use super::PlayerInput;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutePlayerCommand {
    pub game_id: GameId,
    pub side: TeamSide,
    pub batting_slot: u8,
    pub incoming: PlayerInput,
}

/// Replaces the player in one batting slot during the current inning.
///
/// Reads Game, persists the TeamLineup.
pub struct SubstitutePlayer<S, P> {
    core: Arc<Core<S, P>>,
}

impl<S, P> SubstitutePlayer<S, P>
where
    S: EventStore + 'static,
    P: SnapshotStore + 'static,
{
    pub(crate) fn new(core: Arc<Core<S, P>>) -> Self {
        Self { core }
    }

    #[tracing::instrument(skip(self, command), fields(game_id = %command.game_id, side = %command.side))]
    pub async fn execute(&self, command: SubstitutePlayerCommand) -> ActionResult {
        let started = Instant::now();
        let _guard = self.core.locks.acquire(&command.game_id).await;
        let outcome = self.run(&command).await;
        self.core
            .finish("substitute_player", &command.game_id, started, outcome)
            .await
    }

    async fn run(&self, command: &SubstitutePlayerCommand) -> Result<()> {
        let game_id = &command.game_id;
        let slot = BattingSlot::new(command.batting_slot)?;
        let incoming = command.incoming.to_incoming()?;

        let game = self.core.load_game_in_progress(game_id).await?;
        let mut lineup = self.core.load_lineup(&game, command.side).await?;
        lineup.substitute_player(slot, incoming, game.current_inning())?;

        let mut work = UnitOfWork::new();
        work.save(&self.core.lineups, &mut lineup).await?;

        self.core
            .history
            .record(ActionEntry::new(
                game_id.clone(),
                ActionKind::SubstitutePlayer,
                work.into_changes(),
            ))
            .await;
        tracing::info!(%game_id, %slot, incoming = %command.incoming.player_id, "player substituted");
        Ok(())
    }
}
