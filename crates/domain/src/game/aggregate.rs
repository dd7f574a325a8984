//! Game aggregate implementation.

use common::{AggregateType, GameId};

use crate::aggregate::{Aggregate, Restoration, Root, StateRestoredData};
use crate::value_objects::{GameEnding, GameStatus, MAX_NAME_LEN, Score, TeamSide};

use super::{GameError, GameEvent, GameState, GameStreams};

/// Game aggregate root.
///
/// Owns the status, the score and the inning being played. Each mutating
/// method validates against the current state and then records exactly the
/// events that describe the change.
#[derive(Debug, Clone)]
pub struct Game {
    root: Root<GameId, GameEvent, GameState>,
}

impl Aggregate for Game {
    type Id = GameId;
    type Event = GameEvent;
    type State = GameState;

    fn aggregate_type() -> AggregateType {
        AggregateType::Game
    }

    fn state_from_creation(event: &GameEvent) -> Option<GameState> {
        match event {
            GameEvent::GameCreated(data) => Some(GameState::new(
                data.game_id.clone(),
                data.home_team_name.clone(),
                data.away_team_name.clone(),
                data.streams.clone(),
            )),
            _ => None,
        }
    }

    fn apply_event(state: &mut GameState, event: &GameEvent) {
        match event {
            GameEvent::GameCreated(data) => {
                *state = GameState::new(
                    data.game_id.clone(),
                    data.home_team_name.clone(),
                    data.away_team_name.clone(),
                    data.streams.clone(),
                );
            }
            GameEvent::GameStarted(_) => {
                state.status = GameStatus::InProgress;
            }
            GameEvent::ScoreUpdated(data) => {
                state.score = data.new_score;
            }
            GameEvent::HalfInningAdvanced(data) => {
                state.current_inning = data.inning;
                state.is_top_half = data.is_top_half;
            }
            GameEvent::GameCompleted(data) => {
                state.status = GameStatus::Completed;
                state.score = data.final_score;
                state.ending = Some(data.ending);
            }
            GameEvent::ActionUndone(data) | GameEvent::ActionRedone(data) => {
                *state = data.state.clone();
            }
        }
    }

    fn restoration_event(kind: Restoration, data: StateRestoredData<GameState>) -> GameEvent {
        match kind {
            Restoration::Undo => GameEvent::ActionUndone(data),
            Restoration::Redo => GameEvent::ActionRedone(data),
        }
    }

    fn from_root(root: Root<GameId, GameEvent, GameState>) -> Self {
        Self { root }
    }

    fn root(&self) -> &Root<GameId, GameEvent, GameState> {
        &self.root
    }

    fn root_mut(&mut self) -> &mut Root<GameId, GameEvent, GameState> {
        &mut self.root
    }

    fn game_id(&self) -> GameId {
        self.root.id().clone()
    }
}

fn validate_team_name(name: &str) -> Result<String, GameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GameError::InvalidTeamName(
            "Team name cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(GameError::InvalidTeamName(format!(
            "Team name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

// Query methods
impl Game {
    pub fn status(&self) -> GameStatus {
        self.root.state().status
    }

    pub fn score(&self) -> Score {
        self.root.state().score
    }

    pub fn current_inning(&self) -> u32 {
        self.root.state().current_inning
    }

    pub fn is_top_half(&self) -> bool {
        self.root.state().is_top_half
    }

    /// Side currently at bat.
    pub fn batting_side(&self) -> TeamSide {
        TeamSide::batting(self.is_top_half())
    }

    pub fn home_team_name(&self) -> &str {
        &self.root.state().home_team_name
    }

    pub fn away_team_name(&self) -> &str {
        &self.root.state().away_team_name
    }

    pub fn ending(&self) -> Option<GameEnding> {
        self.root.state().ending
    }

    pub fn is_decided(&self, regulation_innings: u32) -> bool {
        self.root.state().is_decided(regulation_innings)
    }

    /// The lineup and inning streams that belong to this game.
    pub fn streams(&self) -> &GameStreams {
        &self.root.state().streams
    }
}

// Command methods
impl Game {
    /// Creates a game between two distinct, named teams, with fresh ids for
    /// its lineup and inning streams.
    pub fn create_new(
        id: GameId,
        home_team_name: &str,
        away_team_name: &str,
    ) -> Result<Self, GameError> {
        Self::create_with_streams(id, home_team_name, away_team_name, GameStreams::generate())
    }

    pub fn create_with_streams(
        id: GameId,
        home_team_name: &str,
        away_team_name: &str,
        streams: GameStreams,
    ) -> Result<Self, GameError> {
        let home = validate_team_name(home_team_name)?;
        let away = validate_team_name(away_team_name)?;
        if home.eq_ignore_ascii_case(&away) {
            return Err(GameError::InvalidTeamName(
                "Home and away teams must be different".to_string(),
            ));
        }

        let state = GameState::new(id.clone(), home.clone(), away.clone(), streams.clone());
        let creation = GameEvent::game_created(id.clone(), home, away, streams);
        Ok(Self {
            root: Root::created(id, state, creation),
        })
    }

    pub fn start_game(&mut self) -> Result<(), GameError> {
        if !self.status().can_start() {
            return Err(GameError::InvalidStatus {
                status: self.status(),
                action: "start",
            });
        }
        self.record(GameEvent::game_started(self.game_id()));
        Ok(())
    }

    pub fn add_home_runs(&mut self, runs: u32) -> Result<(), GameError> {
        self.add_runs(TeamSide::Home, runs)
    }

    pub fn add_away_runs(&mut self, runs: u32) -> Result<(), GameError> {
        self.add_runs(TeamSide::Away, runs)
    }

    /// Adds runs for one side. Only an in-progress game can score.
    pub fn add_runs(&mut self, side: TeamSide, runs: u32) -> Result<(), GameError> {
        self.ensure_in_progress("add runs")?;
        if runs == 0 {
            return Err(GameError::InvalidRuns { runs });
        }
        let new_score = self.score().with_runs(side, runs);
        let event = GameEvent::score_updated(self.game_id(), side, runs, new_score)?;
        self.record(event);
        Ok(())
    }

    /// Moves play to the next half: top to bottom, bottom to the next top.
    pub fn advance_half_inning(&mut self) -> Result<(), GameError> {
        self.ensure_in_progress("advance the half inning")?;
        let (inning, is_top_half) = if self.is_top_half() {
            (self.current_inning(), false)
        } else {
            (self.current_inning() + 1, true)
        };
        let event = GameEvent::half_inning_advanced(self.game_id(), inning, is_top_half)?;
        self.record(event);
        Ok(())
    }

    pub fn complete_game(&mut self, ending: GameEnding) -> Result<(), GameError> {
        self.ensure_in_progress("complete")?;
        self.record(GameEvent::game_completed(
            self.game_id(),
            ending,
            self.score(),
        ));
        Ok(())
    }

    fn ensure_in_progress(&self, action: &'static str) -> Result<(), GameError> {
        if self.status().is_in_progress() {
            Ok(())
        } else {
            Err(GameError::InvalidStatus {
                status: self.status(),
                action,
            })
        }
    }

    fn record(&mut self, event: GameEvent) {
        self.root.record(event, Self::apply_event);
    }
}
