//! Wiring of repositories, history and configuration shared by the use cases.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use common::GameId;
use domain::{
    Aggregate, DomainError, EventSourcedRepository, Game, InningState, Repository, TeamLineup,
    TeamSide,
};
use event_store::{EventStore, SnapshotStore, StoredEvent};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::CoreConfig;
use crate::dto::{ActionResult, GameStateDto};
use crate::error::{ApplicationError, Result};
use crate::history::{ActionHistory, AggregateChange};
use crate::use_cases::{
    EndInning, RecordAtBat, RedoLastAction, StartNewGame, SubstitutePlayer, UndoLastAction,
};

pub(crate) struct Core<S, P> {
    pub(crate) events: S,
    pub(crate) games: EventSourcedRepository<Game, S, P>,
    pub(crate) lineups: EventSourcedRepository<TeamLineup, S, P>,
    pub(crate) innings: EventSourcedRepository<InningState, S, P>,
    pub(crate) history: ActionHistory,
    pub(crate) locks: GameLocks,
    pub(crate) config: CoreConfig,
}

/// One async mutex per game.
///
/// Every use case holds its game's guard from the first load until the
/// result is built, so saves and history entries of one game never
/// interleave.
#[derive(Debug, Default)]
pub(crate) struct GameLocks {
    games: Mutex<HashMap<GameId, Arc<Mutex<()>>>>,
}

impl GameLocks {
    pub(crate) async fn acquire(&self, game_id: &GameId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut games = self.games.lock().await;
            Arc::clone(games.entry(game_id.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Entry point of the application layer.
///
/// Cloning is cheap; every clone shares the same stores and history.
pub struct GameServices<S, P> {
    core: Arc<Core<S, P>>,
}

impl<S, P> Clone for GameServices<S, P> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<S, P> GameServices<S, P>
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    pub fn new(events: S, snapshots: P, config: CoreConfig) -> Self {
        let policy = config.snapshot_policy();
        let core = Core {
            games: EventSourcedRepository::new(events.clone(), snapshots.clone(), policy),
            lineups: EventSourcedRepository::new(events.clone(), snapshots.clone(), policy),
            innings: EventSourcedRepository::new(events.clone(), snapshots, policy),
            history: ActionHistory::new(config.undo_history_limit),
            locks: GameLocks::default(),
            events,
            config,
        };
        Self {
            core: Arc::new(core),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.core.config
    }

    pub fn history(&self) -> &ActionHistory {
        &self.core.history
    }

    pub fn games(&self) -> &EventSourcedRepository<Game, S, P> {
        &self.core.games
    }

    pub fn lineups(&self) -> &EventSourcedRepository<TeamLineup, S, P> {
        &self.core.lineups
    }

    pub fn innings(&self) -> &EventSourcedRepository<InningState, S, P> {
        &self.core.innings
    }

    pub fn start_new_game(&self) -> StartNewGame<S, P> {
        StartNewGame::new(Arc::clone(&self.core))
    }

    pub fn record_at_bat(&self) -> RecordAtBat<S, P> {
        RecordAtBat::new(Arc::clone(&self.core))
    }

    pub fn substitute_player(&self) -> SubstitutePlayer<S, P> {
        SubstitutePlayer::new(Arc::clone(&self.core))
    }

    pub fn end_inning(&self) -> EndInning<S, P> {
        EndInning::new(Arc::clone(&self.core))
    }

    pub fn undo_last_action(&self) -> UndoLastAction<S, P> {
        UndoLastAction::new(Arc::clone(&self.core))
    }

    pub fn redo_last_action(&self) -> RedoLastAction<S, P> {
        RedoLastAction::new(Arc::clone(&self.core))
    }

    /// Current read model of a game.
    #[tracing::instrument(skip(self))]
    pub async fn game_state(&self, game_id: &GameId) -> Result<GameStateDto> {
        self.core.game_state(game_id).await
    }

    /// Every event of a game across its streams, in global order.
    pub async fn game_events(&self, game_id: &GameId) -> Result<Vec<StoredEvent>> {
        if !self.core.games.exists(game_id).await? {
            return Err(ApplicationError::GameNotFound(game_id.clone()));
        }
        Ok(self
            .core
            .events
            .get_events_by_game_id(game_id)
            .await
            .map_err(DomainError::from)?)
    }

    pub async fn can_undo(&self, game_id: &GameId) -> bool {
        self.core.history.can_undo(game_id).await
    }

    pub async fn can_redo(&self, game_id: &GameId) -> bool {
        self.core.history.can_redo(game_id).await
    }
}

impl<S, P> Core<S, P>
where
    S: EventStore + 'static,
    P: SnapshotStore + 'static,
{
    pub(crate) async fn load_game(&self, game_id: &GameId) -> Result<Game> {
        match self.games.find_by_id(game_id).await {
            Ok(game) => Ok(game),
            Err(DomainError::AggregateNotFound { .. }) => {
                Err(ApplicationError::GameNotFound(game_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Loads a game and fails unless it is being played.
    pub(crate) async fn load_game_in_progress(&self, game_id: &GameId) -> Result<Game> {
        let game = self.load_game(game_id).await?;
        if !game.status().is_in_progress() {
            return Err(ApplicationError::GameNotInProgress {
                game_id: game_id.clone(),
                status: game.status(),
            });
        }
        Ok(game)
    }

    /// The lineup stream recorded on the game for `side`.
    pub(crate) async fn load_lineup(&self, game: &Game, side: TeamSide) -> Result<TeamLineup> {
        match self.lineups.find_by_id(game.streams().lineup(side)).await {
            Ok(lineup) => Ok(lineup),
            Err(DomainError::AggregateNotFound { .. }) => Err(ApplicationError::LineupNotFound {
                game_id: game.id().clone(),
                side,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// The inning stream recorded on the game.
    pub(crate) async fn load_inning(&self, game: &Game) -> Result<InningState> {
        match self.innings.find_by_id(&game.streams().inning_state).await {
            Ok(inning) => Ok(inning),
            Err(DomainError::AggregateNotFound { .. }) => {
                Err(ApplicationError::InningStateNotFound(game.id().clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fails when the game and its inning state disagree on the half in play.
    pub(crate) fn ensure_in_sync(game: &Game, inning: &InningState) -> Result<()> {
        let game_half = (game.current_inning(), game.is_top_half());
        let inning_half = (inning.inning(), inning.is_top_half());
        if game_half != inning_half {
            return Err(ApplicationError::OutOfSync {
                game_id: game.id().clone(),
                reason: format!(
                    "game is at {game_half:?}, inning state at {inning_half:?} (inning, top half)"
                ),
            });
        }
        Ok(())
    }

    /// A fresh read model built from what the stores hold now.
    pub(crate) async fn game_state(&self, game_id: &GameId) -> Result<GameStateDto> {
        let game = self.load_game(game_id).await?;
        let inning = self.load_inning(&game).await?;
        let home = self.load_lineup(&game, TeamSide::Home).await?;
        let away = self.load_lineup(&game, TeamSide::Away).await?;
        Ok(GameStateDto::build(&game, &inning, &home, &away))
    }

    /// Turns a use-case outcome into an [`ActionResult`] and records metrics.
    ///
    /// A committed action whose read model cannot be rebuilt still succeeds,
    /// with no `game_state` and the reason in `warnings`.
    pub(crate) async fn finish(
        &self,
        use_case: &'static str,
        game_id: &GameId,
        started: Instant,
        outcome: Result<()>,
    ) -> ActionResult {
        let state = match outcome {
            Ok(()) => Ok(self.game_state(game_id).await),
            Err(e) => Err(e),
        };
        let depths = self.history.depths(game_id).await;

        let result = match state {
            Ok(Ok(state)) => ActionResult::succeeded(state, depths),
            Ok(Err(e)) => {
                tracing::warn!(use_case, error = %e, "action committed, read model unavailable");
                ActionResult::committed_without_state(&e, depths)
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::info!(use_case, error = %e, "use case lost a concurrency race");
                } else if matches!(e, ApplicationError::PartialFailure { .. }) {
                    tracing::error!(use_case, error = %e, "use case partially persisted");
                } else {
                    tracing::warn!(use_case, error = %e, "use case rejected");
                }
                ActionResult::failed(&e, depths)
            }
        };

        let label = if result.success {
            "success"
        } else if result.partial_failure.is_some() {
            "partial_failure"
        } else {
            "failure"
        };
        metrics::counter!("use_case_executions_total", "use_case" => use_case, "outcome" => label)
            .increment(1);
        metrics::histogram!("use_case_duration_seconds", "use_case" => use_case)
            .record(started.elapsed().as_secs_f64());
        result
    }
}

/// Persists the aggregates of one action in order, remembering what landed.
#[derive(Debug, Default)]
pub(crate) struct UnitOfWork {
    changes: Vec<AggregateChange>,
}

impl UnitOfWork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Saves `aggregate` if it has pending events.
    ///
    /// A failure after an earlier save succeeded is reported as
    /// [`ApplicationError::PartialFailure`]; nothing is rolled back.
    pub(crate) async fn save<A, R>(&mut self, repo: &R, aggregate: &mut A) -> Result<()>
    where
        A: Aggregate + 'static,
        R: Repository<A>,
    {
        if !aggregate.has_uncommitted_events() {
            return Ok(());
        }
        let version_before = aggregate.version();
        match repo.save(aggregate).await {
            Ok(version_after) => {
                self.changes.push(AggregateChange {
                    aggregate_id: aggregate.aggregate_id(),
                    aggregate_type: A::aggregate_type(),
                    version_before,
                    version_after,
                });
                Ok(())
            }
            Err(source) if self.changes.is_empty() => Err(source.into()),
            Err(source) => Err(ApplicationError::PartialFailure {
                persisted: self.changes.clone(),
                failed: A::aggregate_type(),
                source,
            }),
        }
    }

    pub(crate) fn into_changes(self) -> Vec<AggregateChange> {
        self.changes
    }
}
