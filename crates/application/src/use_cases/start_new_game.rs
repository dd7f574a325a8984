use std::sync::Arc;
use std::time::Instant;

use common::{GameId, TeamLineupId};
use domain::{
    BattingSlot, FieldPosition, Game, GameStreams, IncomingPlayer, InningState, JerseyNumber,
    PlayerId, TeamLineup, TeamSide,
};
use event_store::{EventStore, SnapshotStore};
use serde::{Deserialize, Serialize};

use crate::dto::ActionResult;
use crate::error::{ApplicationError, Result};
use crate::services::{Core, UnitOfWork};

/// A player as entered by the scorekeeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub player_id: String,
    pub name: String,
    pub jersey_number: u8,
    pub position: FieldPosition,
}

impl PlayerInput {
    pub(crate) fn to_incoming(&self) -> Result<IncomingPlayer> {
        Ok(IncomingPlayer {
            player_id: PlayerId::new(self.player_id.as_str())?,
            name: self.name.clone(),
            jersey_number: JerseyNumber::new(self.jersey_number)?,
            position: self.position,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupEntryInput {
    pub batting_slot: u8,
    #[serde(flatten)]
    pub player: PlayerInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartNewGameCommand {
    /// Generated when absent.
    #[serde(default)]
    pub game_id: Option<GameId>,
    pub home_team_name: String,
    pub away_team_name: String,
    pub home_lineup: Vec<LineupEntryInput>,
    pub away_lineup: Vec<LineupEntryInput>,
}

/// Creates and starts a game with both batting orders.
///
/// Persists Game, home TeamLineup, away TeamLineup, then InningState. The
/// new game is the base of its history and cannot be undone.
pub struct StartNewGame<S, P> {
    core: Arc<Core<S, P>>,
}

impl<S, P> StartNewGame<S, P>
where
    S: EventStore + 'static,
    P: SnapshotStore + 'static,
{
    pub(crate) fn new(core: Arc<Core<S, P>>) -> Self {
        Self { core }
    }

    #[tracing::instrument(skip(self, command), fields(game_id))]
    pub async fn execute(&self, command: StartNewGameCommand) -> ActionResult {
        let started = Instant::now();
        let game_id = command.game_id.clone().unwrap_or_else(GameId::generate);
        tracing::Span::current().record("game_id", game_id.as_str());
        let _guard = self.core.locks.acquire(&game_id).await;

        let outcome = self.run(&game_id, command).await;
        self.core
            .finish("start_new_game", &game_id, started, outcome)
            .await
    }

    async fn run(&self, game_id: &GameId, command: StartNewGameCommand) -> Result<()> {
        let streams = GameStreams::generate();
        let mut game = Game::create_with_streams(
            game_id.clone(),
            &command.home_team_name,
            &command.away_team_name,
            streams.clone(),
        )?;
        game.start_game()?;

        let mut home = self.build_lineup(
            streams.home_lineup,
            game_id,
            &command.home_team_name,
            TeamSide::Home,
            &command.home_lineup,
        )?;
        let mut away = self.build_lineup(
            streams.away_lineup,
            game_id,
            &command.away_team_name,
            TeamSide::Away,
            &command.away_lineup,
        )?;
        let mut inning = InningState::create_new(streams.inning_state, game_id.clone())?;

        let mut work = UnitOfWork::new();
        work.save(&self.core.games, &mut game).await?;
        work.save(&self.core.lineups, &mut home).await?;
        work.save(&self.core.lineups, &mut away).await?;
        work.save(&self.core.innings, &mut inning).await?;

        tracing::info!(%game_id, "game started");
        Ok(())
    }

    fn build_lineup(
        &self,
        lineup_id: TeamLineupId,
        game_id: &GameId,
        team_name: &str,
        side: TeamSide,
        entries: &[LineupEntryInput],
    ) -> Result<TeamLineup> {
        let minimum = self.core.config.min_batting_order;
        if entries.len() < minimum as usize {
            return Err(ApplicationError::InvalidLineup(format!(
                "{side} lineup lists {} players, at least {minimum} are required",
                entries.len()
            )));
        }

        let mut lineup = TeamLineup::create_new(lineup_id, game_id.clone(), team_name, side)?;
        for entry in entries {
            let slot = BattingSlot::new(entry.batting_slot)?;
            lineup.add_player(entry.player.to_incoming()?, slot)?;
        }
        if !lineup.has_contiguous_batting_order() {
            return Err(ApplicationError::InvalidLineup(format!(
                "{side} batting slots must run from 1 to {} without gaps",
                entries.len()
            )));
        }
        Ok(lineup)
    }
}
