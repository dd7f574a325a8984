//! Game domain events.

use common::GameId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{DomainEvent, StateRestoredData};
use crate::value_objects::{GameEnding, Score, TeamSide, ValidationError};

use super::{GameState, GameStreams};

/// Events that can occur on a game aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GameEvent {
    /// Game was created with its two teams.
    GameCreated(GameCreatedData),

    /// First pitch.
    GameStarted(GameStartedData),

    /// Runs were added for one team.
    ScoreUpdated(ScoreUpdatedData),

    /// Play moved to the next half inning.
    HalfInningAdvanced(HalfInningAdvancedData),

    /// Game reached a final result.
    GameCompleted(GameCompletedData),

    /// State was rolled back to an earlier version.
    ActionUndone(StateRestoredData<GameState>),

    /// A rolled-back state was re-applied.
    ActionRedone(StateRestoredData<GameState>),
}

impl DomainEvent for GameEvent {
    fn event_type(&self) -> &'static str {
        match self {
            GameEvent::GameCreated(_) => "GameCreated",
            GameEvent::GameStarted(_) => "GameStarted",
            GameEvent::ScoreUpdated(_) => "ScoreUpdated",
            GameEvent::HalfInningAdvanced(_) => "HalfInningAdvanced",
            GameEvent::GameCompleted(_) => "GameCompleted",
            GameEvent::ActionUndone(_) => "ActionUndone",
            GameEvent::ActionRedone(_) => "ActionRedone",
        }
    }

    fn game_id(&self) -> &GameId {
        match self {
            GameEvent::GameCreated(data) => &data.game_id,
            GameEvent::GameStarted(data) => &data.game_id,
            GameEvent::ScoreUpdated(data) => &data.game_id,
            GameEvent::HalfInningAdvanced(data) => &data.game_id,
            GameEvent::GameCompleted(data) => &data.game_id,
            GameEvent::ActionUndone(data) | GameEvent::ActionRedone(data) => &data.game_id,
        }
    }
}

/// Data for GameCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameCreatedData {
    pub game_id: GameId,
    pub home_team_name: String,
    pub away_team_name: String,
    pub streams: GameStreams,
}

/// Data for GameStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStartedData {
    pub game_id: GameId,
}

/// Data for ScoreUpdated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreUpdatedData {
    pub game_id: GameId,

    /// Team that scored.
    pub team: TeamSide,

    /// Runs added by this event, at least one.
    pub runs_added: u32,

    /// Score after the runs were added.
    pub new_score: Score,
}

/// Data for HalfInningAdvanced event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalfInningAdvancedData {
    pub game_id: GameId,

    /// Inning now being played.
    pub inning: u32,

    /// Whether play is now in the top half.
    pub is_top_half: bool,
}

/// Data for GameCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameCompletedData {
    pub game_id: GameId,
    pub ending: GameEnding,
    pub final_score: Score,
}

// Convenience constructors
impl GameEvent {
    pub fn game_created(
        game_id: GameId,
        home: String,
        away: String,
        streams: GameStreams,
    ) -> Self {
        GameEvent::GameCreated(GameCreatedData {
            game_id,
            home_team_name: home,
            away_team_name: away,
            streams,
        })
    }

    pub fn game_started(game_id: GameId) -> Self {
        GameEvent::GameStarted(GameStartedData { game_id })
    }

    /// Fails when `runs_added` is zero.
    pub fn score_updated(
        game_id: GameId,
        team: TeamSide,
        runs_added: u32,
        new_score: Score,
    ) -> Result<Self, ValidationError> {
        if runs_added == 0 {
            return Err(ValidationError::new("A score update must add at least one run"));
        }
        Ok(GameEvent::ScoreUpdated(ScoreUpdatedData {
            game_id,
            team,
            runs_added,
            new_score,
        }))
    }

    /// Fails when `inning` is zero.
    pub fn half_inning_advanced(
        game_id: GameId,
        inning: u32,
        is_top_half: bool,
    ) -> Result<Self, ValidationError> {
        if inning == 0 {
            return Err(ValidationError::new("Inning must be at least 1"));
        }
        Ok(GameEvent::HalfInningAdvanced(HalfInningAdvancedData {
            game_id,
            inning,
            is_top_half,
        }))
    }

    pub fn game_completed(game_id: GameId, ending: GameEnding, final_score: Score) -> Self {
        GameEvent::GameCompleted(GameCompletedData {
            game_id,
            ending,
            final_score,
        })
    }
}
