//! Read models and result types returned across the application boundary.

use common::GameId;
use domain::{
    Aggregate, BasesState, FieldPosition, Game, GameEnding, GameStatus, InningState, TeamLineup,
    TeamSide,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApplicationError, ErrorKind};

/// Everything a scoreboard shows about one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateDto {
    pub game_id: GameId,
    pub home_team_name: String,
    pub away_team_name: String,
    pub status: GameStatus,
    pub home_runs: u32,
    pub away_runs: u32,
    pub current_inning: u32,
    pub is_top_half: bool,
    pub ending: Option<GameEnding>,
    pub outs: u8,
    pub bases: BasesDto,
    pub current_batter: Option<BatterDto>,
    pub home_lineup: Vec<LineupSlotDto>,
    pub away_lineup: Vec<LineupSlotDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasesDto {
    pub first: Option<String>,
    pub second: Option<String>,
    pub third: Option<String>,
}

impl From<&BasesState> for BasesDto {
    fn from(bases: &BasesState) -> Self {
        let runner = |base| bases.runner_on(base).map(ToString::to_string);
        Self {
            first: runner(domain::Base::First),
            second: runner(domain::Base::Second),
            third: runner(domain::Base::Third),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatterDto {
    pub side: TeamSide,
    pub batting_slot: u8,
    pub player_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupSlotDto {
    pub batting_slot: u8,
    pub player_id: String,
    pub name: String,
    pub jersey_number: u8,
    pub position: FieldPosition,
}

fn lineup_slots(lineup: &TeamLineup) -> Vec<LineupSlotDto> {
    lineup
        .state()
        .slots
        .iter()
        .map(|(slot, occupant)| LineupSlotDto {
            batting_slot: slot.value(),
            player_id: occupant.player_id.to_string(),
            name: occupant.name.clone(),
            jersey_number: occupant.jersey_number.value(),
            position: occupant.position,
        })
        .collect()
}

impl GameStateDto {
    pub fn build(
        game: &Game,
        inning: &InningState,
        home: &TeamLineup,
        away: &TeamLineup,
    ) -> Self {
        let side = inning.batting_side();
        let slot = inning.current_batter_slot(side);
        let batting = match side {
            TeamSide::Home => home,
            TeamSide::Away => away,
        };
        let current_batter = batting.player_at(slot).map(|occupant| BatterDto {
            side,
            batting_slot: slot.value(),
            player_id: occupant.player_id.to_string(),
            name: occupant.name.clone(),
        });

        Self {
            game_id: game.id().clone(),
            home_team_name: game.home_team_name().to_string(),
            away_team_name: game.away_team_name().to_string(),
            status: game.status(),
            home_runs: game.score().get_home_runs(),
            away_runs: game.score().get_away_runs(),
            current_inning: game.current_inning(),
            is_top_half: game.is_top_half(),
            ending: game.ending(),
            outs: inning.outs(),
            bases: inning.bases().into(),
            current_batter,
            home_lineup: lineup_slots(home),
            away_lineup: lineup_slots(away),
        }
    }
}

/// Aggregates already saved when a later save of the same action failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFailureDto {
    pub persisted: Vec<String>,
    pub failed: String,
}

/// Outcome of one use-case execution.
///
/// Failures are reported here rather than as `Err`, so callers always get
/// a value back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub errors: Vec<String>,
    pub error_kind: Option<ErrorKind>,

    /// Retrying the same command may succeed.
    pub retryable: bool,
    pub partial_failure: Option<PartialFailureDto>,
    pub game_state: Option<GameStateDto>,

    /// Problems that did not stop the action from being committed.
    #[serde(default)]
    pub warnings: Vec<String>,
    pub undo_stack_depth: usize,
    pub redo_stack_depth: usize,
}

impl ActionResult {
    pub fn succeeded(game_state: GameStateDto, depths: (usize, usize)) -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            error_kind: None,
            retryable: false,
            partial_failure: None,
            game_state: Some(game_state),
            warnings: Vec::new(),
            undo_stack_depth: depths.0,
            redo_stack_depth: depths.1,
        }
    }

    pub fn failed(error: &ApplicationError, depths: (usize, usize)) -> Self {
        let partial_failure = match error {
            ApplicationError::PartialFailure {
                persisted, failed, ..
            } => Some(PartialFailureDto {
                persisted: persisted.iter().map(ToString::to_string).collect(),
                failed: failed.to_string(),
            }),
            _ => None,
        };
        Self {
            success: false,
            errors: vec![error.to_string()],
            error_kind: Some(error.kind()),
            retryable: error.is_retryable(),
            partial_failure,
            game_state: None,
            warnings: Vec::new(),
            undo_stack_depth: depths.0,
            redo_stack_depth: depths.1,
        }
    }

    /// The action is durable but its read model could not be rebuilt.
    /// Retrying would record it twice.
    pub fn committed_without_state(error: &ApplicationError, depths: (usize, usize)) -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            error_kind: None,
            retryable: false,
            partial_failure: None,
            game_state: None,
            warnings: vec![format!("read model unavailable: {error}")],
            undo_stack_depth: depths.0,
            redo_stack_depth: depths.1,
        }
    }
}
