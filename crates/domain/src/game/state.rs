//! Game state as rebuilt from its events.

use common::{GameId, InningStateId, TeamLineupId};
use serde::{Deserialize, Serialize};

use crate::value_objects::{GameEnding, GameStatus, Score, TeamSide};

/// Ids of the lineup and inning streams a game was created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStreams {
    pub home_lineup: TeamLineupId,
    pub away_lineup: TeamLineupId,
    pub inning_state: InningStateId,
}

impl GameStreams {
    pub fn generate() -> Self {
        Self {
            home_lineup: TeamLineupId::generate(),
            away_lineup: TeamLineupId::generate(),
            inning_state: InningStateId::generate(),
        }
    }

    pub fn lineup(&self, side: TeamSide) -> &TeamLineupId {
        match side {
            TeamSide::Home => &self.home_lineup,
            TeamSide::Away => &self.away_lineup,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: GameId,
    pub home_team_name: String,
    pub away_team_name: String,
    pub streams: GameStreams,
    pub status: GameStatus,
    pub score: Score,

    /// Inning being played, starting at 1.
    pub current_inning: u32,
    pub is_top_half: bool,

    /// Set once the game is completed.
    pub ending: Option<GameEnding>,
}

impl GameState {
    pub(crate) fn new(
        game_id: GameId,
        home_team_name: String,
        away_team_name: String,
        streams: GameStreams,
    ) -> Self {
        Self {
            game_id,
            home_team_name,
            away_team_name,
            streams,
            status: GameStatus::NotStarted,
            score: Score::zero(),
            current_inning: 1,
            is_top_half: true,
            ending: None,
        }
    }

    /// Whether the result is settled for a game of `regulation_innings`.
    ///
    /// The home team never bats in the bottom of the last inning once it
    /// leads, and a lead at the end of any inning from regulation on is
    /// final. A leading home team in the bottom half also covers walk-offs.
    pub fn is_decided(&self, regulation_innings: u32) -> bool {
        if !self.status.is_in_progress() || regulation_innings == 0 {
            return false;
        }
        let home = self.score.get_home_runs();
        let away = self.score.get_away_runs();
        if self.is_top_half {
            self.current_inning > regulation_innings && home != away
        } else {
            self.current_inning >= regulation_innings && home > away
        }
    }
}
