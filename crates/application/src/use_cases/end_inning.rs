use std::sync::Arc;
use std::time::Instant;

use common::GameId;
use event_store::{EventStore, SnapshotStore};
use serde::{Deserialize, Serialize};

use crate::dto::ActionResult;
use crate::error::Result;
use crate::history::{ActionEntry, ActionKind};
use crate::services::{Core, UnitOfWork};

use super::complete_if_decided;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndInningCommand {
    pub game_id: GameId,
}

/// Ends the half inning in play regardless of outs.
///
/// Persists InningState, then Game.
pub struct EndInning<S, P> {
    core: Arc<Core<S, P>>,
}

impl<S, P> EndInning<S, P>
where
    S: EventStore + 'static,
    P: SnapshotStore + 'static,
{
    pub(crate) fn new(core: Arc<Core<S, P>>) -> Self {
        Self { core }
    }

    #[tracing::instrument(skip(self, command), fields(game_id = %command.game_id))]
    pub async fn execute(&self, command: EndInningCommand) -> ActionResult {
        let started = Instant::now();
        let _guard = self.core.locks.acquire(&command.game_id).await;
        let outcome = self.run(&command.game_id).await;
        self.core
            .finish("end_inning", &command.game_id, started, outcome)
            .await
    }

    async fn run(&self, game_id: &GameId) -> Result<()> {
        let mut game = self.core.load_game_in_progress(game_id).await?;
        let mut inning = self.core.load_inning(&game).await?;
        Core::<S, P>::ensure_in_sync(&game, &inning)?;

        inning.end_half_inning()?;
        game.advance_half_inning()?;
        complete_if_decided(&mut game, self.core.config.regulation_innings)?;

        let mut work = UnitOfWork::new();
        work.save(&self.core.innings, &mut inning).await?;
        work.save(&self.core.games, &mut game).await?;

        self.core
            .history
            .record(ActionEntry::new(
                game_id.clone(),
                ActionKind::EndInning,
                work.into_changes(),
            ))
            .await;
        tracing::info!(%game_id, inning = game.current_inning(), top = game.is_top_half(), "half inning ended");
        Ok(())
    }
}
