//! Team lineup domain events.

use common::GameId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{DomainEvent, StateRestoredData};
use crate::value_objects::{BattingSlot, FieldPosition, JerseyNumber, PlayerId, TeamSide, ValidationError};

use super::TeamLineupState;

/// Events that can occur on a team lineup aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TeamLineupEvent {
    /// Lineup was created for one side of a game.
    TeamLineupCreated(TeamLineupCreatedData),

    /// A starter was placed in the batting order.
    PlayerAddedToLineup(PlayerAddedData),

    /// A player replaced the occupant of a batting slot.
    PlayerSubstitutedIntoGame(PlayerSubstitutedData),

    /// An active player moved to another defensive position.
    FieldPositionChanged(FieldPositionChangedData),

    /// State was rolled back to an earlier version.
    ActionUndone(StateRestoredData<TeamLineupState>),

    /// A rolled-back state was re-applied.
    ActionRedone(StateRestoredData<TeamLineupState>),
}

impl DomainEvent for TeamLineupEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TeamLineupEvent::TeamLineupCreated(_) => "TeamLineupCreated",
            TeamLineupEvent::PlayerAddedToLineup(_) => "PlayerAddedToLineup",
            TeamLineupEvent::PlayerSubstitutedIntoGame(_) => "PlayerSubstitutedIntoGame",
            TeamLineupEvent::FieldPositionChanged(_) => "FieldPositionChanged",
            TeamLineupEvent::ActionUndone(_) => "ActionUndone",
            TeamLineupEvent::ActionRedone(_) => "ActionRedone",
        }
    }

    fn game_id(&self) -> &GameId {
        match self {
            TeamLineupEvent::TeamLineupCreated(data) => &data.game_id,
            TeamLineupEvent::PlayerAddedToLineup(data) => &data.game_id,
            TeamLineupEvent::PlayerSubstitutedIntoGame(data) => &data.game_id,
            TeamLineupEvent::FieldPositionChanged(data) => &data.game_id,
            TeamLineupEvent::ActionUndone(data) | TeamLineupEvent::ActionRedone(data) => {
                &data.game_id
            }
        }
    }
}

/// Data for TeamLineupCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamLineupCreatedData {
    pub game_id: GameId,
    pub team_name: String,
    pub side: TeamSide,
}

/// Data for PlayerAddedToLineup event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAddedData {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub name: String,
    pub jersey_number: JerseyNumber,
    pub batting_slot: BattingSlot,
    pub position: FieldPosition,
}

/// Data for PlayerSubstitutedIntoGame event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSubstitutedData {
    pub game_id: GameId,
    pub batting_slot: BattingSlot,
    pub outgoing: PlayerId,
    pub incoming: PlayerId,
    pub incoming_name: String,
    pub jersey_number: JerseyNumber,
    pub position: FieldPosition,

    /// Inning the substitution happened in, at least 1.
    pub inning: u32,

    /// True when a starter returns to their original slot.
    pub is_reentry: bool,
}

/// Data for FieldPositionChanged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPositionChangedData {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub from: FieldPosition,
    pub to: FieldPosition,
}

// Convenience constructors
impl TeamLineupEvent {
    pub fn lineup_created(game_id: GameId, team_name: String, side: TeamSide) -> Self {
        TeamLineupEvent::TeamLineupCreated(TeamLineupCreatedData {
            game_id,
            team_name,
            side,
        })
    }

    /// Fails when the substitution is dated before the first inning or the
    /// player would replace themselves.
    pub fn player_substituted(data: PlayerSubstitutedData) -> Result<Self, ValidationError> {
        if data.inning == 0 {
            return Err(ValidationError::new("Substitution inning must be at least 1"));
        }
        if data.incoming == data.outgoing {
            return Err(ValidationError::new("A player cannot substitute for themselves"));
        }
        Ok(TeamLineupEvent::PlayerSubstitutedIntoGame(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn substitution(inning: u32, incoming: &str) -> PlayerSubstitutedData {
        PlayerSubstitutedData {
            game_id: GameId::new("game-1").unwrap(),
            batting_slot: BattingSlot::first(),
            outgoing: PlayerId::new("p1").unwrap(),
            incoming: PlayerId::new(incoming).unwrap(),
            incoming_name: "Sub".to_string(),
            jersey_number: JerseyNumber::new(12).unwrap(),
            position: FieldPosition::Catcher,
            inning,
            is_reentry: false,
        }
    }

    #[test]
    fn substitution_requires_inning() {
        assert!(TeamLineupEvent::player_substituted(substitution(0, "p2")).is_err());
        assert!(TeamLineupEvent::player_substituted(substitution(1, "p2")).is_ok());
    }

    #[test]
    fn substitution_requires_different_player() {
        assert!(TeamLineupEvent::player_substituted(substitution(3, "p1")).is_err());
    }

    #[test]
    fn created_event_carries_side() {
        let event = TeamLineupEvent::lineup_created(
            GameId::new("game-1").unwrap(),
            "Sluggers".into(),
            TeamSide::Away,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TeamLineupCreated");
        assert_eq!(json["data"]["side"], "AWAY");
    }
}
