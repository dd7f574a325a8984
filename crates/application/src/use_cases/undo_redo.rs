use std::sync::Arc;
use std::time::Instant;

use common::{AggregateType, GameId, InningStateId, TeamLineupId};
use domain::{Aggregate, Game, InningState, Repository, Restoration, TeamLineup};
use event_store::{EventStore, SnapshotStore};
use serde::{Deserialize, Serialize};

use crate::dto::ActionResult;
use crate::error::{ApplicationError, Result};
use crate::history::{ActionEntry, AggregateChange};
use crate::services::{Core, UnitOfWork};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoLastActionCommand {
    pub game_id: GameId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedoLastActionCommand {
    pub game_id: GameId,
}

/// Reverts the most recent action of a game.
///
/// Each aggregate the action touched is rebuilt at its version before the
/// action, and that state is appended as `ActionUndone`. Aggregates are
/// persisted in the reverse of the order the action used.
pub struct UndoLastAction<S, P> {
    core: Arc<Core<S, P>>,
}

/// Re-applies the most recently undone action by appending `ActionRedone`
/// with the state each aggregate had right after it.
pub struct RedoLastAction<S, P> {
    core: Arc<Core<S, P>>,
}

impl<S, P> UndoLastAction<S, P>
where
    S: EventStore + 'static,
    P: SnapshotStore + 'static,
{
    pub(crate) fn new(core: Arc<Core<S, P>>) -> Self {
        Self { core }
    }

    #[tracing::instrument(skip(self, command), fields(game_id = %command.game_id))]
    pub async fn execute(&self, command: UndoLastActionCommand) -> ActionResult {
        let started = Instant::now();
        let _guard = self.core.locks.acquire(&command.game_id).await;
        let outcome = self.run(&command.game_id).await;
        self.core
            .finish("undo_last_action", &command.game_id, started, outcome)
            .await
    }

    async fn run(&self, game_id: &GameId) -> Result<()> {
        let history = &self.core.history;
        let entry = history
            .take_undo(game_id)
            .await
            .ok_or_else(|| ApplicationError::NothingToUndo(game_id.clone()))?;

        match apply_entry(&self.core, &entry, Restoration::Undo).await {
            Ok(()) => {
                tracing::info!(%game_id, action = entry.action.as_str(), "action undone");
                history.push_redo(entry).await;
                Ok(())
            }
            Err(e) => {
                if keeps_entry(&e) {
                    history.push_undo(entry).await;
                }
                Err(e)
            }
        }
    }
}

impl<S, P> RedoLastAction<S, P>
where
    S: EventStore + 'static,
    P: SnapshotStore + 'static,
{
    pub(crate) fn new(core: Arc<Core<S, P>>) -> Self {
        Self { core }
    }

    #[tracing::instrument(skip(self, command), fields(game_id = %command.game_id))]
    pub async fn execute(&self, command: RedoLastActionCommand) -> ActionResult {
        let started = Instant::now();
        let _guard = self.core.locks.acquire(&command.game_id).await;
        let outcome = self.run(&command.game_id).await;
        self.core
            .finish("redo_last_action", &command.game_id, started, outcome)
            .await
    }

    async fn run(&self, game_id: &GameId) -> Result<()> {
        let history = &self.core.history;
        let entry = history
            .take_redo(game_id)
            .await
            .ok_or_else(|| ApplicationError::NothingToRedo(game_id.clone()))?;

        match apply_entry(&self.core, &entry, Restoration::Redo).await {
            Ok(()) => {
                tracing::info!(%game_id, action = entry.action.as_str(), "action redone");
                history.push_undo(entry).await;
                Ok(())
            }
            Err(e) => {
                if keeps_entry(&e) {
                    history.push_redo(entry).await;
                }
                Err(e)
            }
        }
    }
}

/// Whether a failed undo or redo may be attempted again.
///
/// A diverged or half-applied entry no longer describes the log.
fn keeps_entry(error: &ApplicationError) -> bool {
    !matches!(
        error,
        ApplicationError::HistoryDiverged { .. } | ApplicationError::PartialFailure { .. }
    )
}

/// An aggregate with its compensating event pending.
enum Restored {
    Game(Game),
    Lineup(TeamLineup),
    Inning(InningState),
}

async fn apply_entry<S, P>(core: &Core<S, P>, entry: &ActionEntry, kind: Restoration) -> Result<()>
where
    S: EventStore + 'static,
    P: SnapshotStore + 'static,
{
    let ordered: Vec<&AggregateChange> = match kind {
        Restoration::Undo => entry.changes.iter().rev().collect(),
        Restoration::Redo => entry.changes.iter().collect(),
    };

    let mut pending = Vec::with_capacity(ordered.len());
    for change in ordered {
        let restored = match change.aggregate_type {
            AggregateType::Game => {
                let id = GameId::new(change.aggregate_id.as_str())?;
                Restored::Game(prepare(&core.games, id, change, kind).await?)
            }
            AggregateType::TeamLineup => {
                let id = TeamLineupId::new(change.aggregate_id.as_str())?;
                Restored::Lineup(prepare(&core.lineups, id, change, kind).await?)
            }
            AggregateType::InningState => {
                let id = InningStateId::new(change.aggregate_id.as_str())?;
                Restored::Inning(prepare(&core.innings, id, change, kind).await?)
            }
        };
        pending.push(restored);
    }

    let mut work = UnitOfWork::new();
    for restored in &mut pending {
        match restored {
            Restored::Game(game) => work.save(&core.games, game).await?,
            Restored::Lineup(lineup) => work.save(&core.lineups, lineup).await?,
            Restored::Inning(inning) => work.save(&core.innings, inning).await?,
        }
    }
    Ok(())
}

/// Loads the live aggregate and records the compensating event on it.
///
/// Fails with `HistoryDiverged` unless the live state is still the one the
/// entry left behind.
async fn prepare<A, R>(
    repo: &R,
    id: A::Id,
    change: &AggregateChange,
    kind: Restoration,
) -> Result<A>
where
    A: Aggregate + 'static,
    R: Repository<A>,
{
    let (current, target) = match kind {
        Restoration::Undo => (change.version_after, change.version_before),
        Restoration::Redo => (change.version_before, change.version_after),
    };

    let mut live = repo.find_by_id(&id).await?;
    let expected = repo.find_by_id_at_version(&id, current).await?;
    if live.state() != expected.state() {
        return Err(ApplicationError::HistoryDiverged {
            aggregate_id: change.aggregate_id.clone(),
        });
    }

    let restored = repo.find_by_id_at_version(&id, target).await?;
    live.restore(kind, target, restored.state().clone());
    Ok(live)
}
