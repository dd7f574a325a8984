//! Team lineup state as rebuilt from its events.

use std::collections::BTreeMap;

use common::GameId;
use serde::{Deserialize, Serialize};

use crate::value_objects::{BattingSlot, FieldPosition, JerseyNumber, PlayerId, TeamSide};

/// The player currently holding a batting slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOccupant {
    pub player_id: PlayerId,
    pub name: String,
    pub jersey_number: JerseyNumber,
    pub position: FieldPosition,
}

/// Whether a player is currently in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerStatus {
    Active,
    SubstitutedOut { inning: u32 },
}

/// Every player who has appeared for the team this game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub jersey_number: JerseyNumber,

    /// Slot the player started in; None for substitutes.
    pub starting_slot: Option<BattingSlot>,
    pub status: PlayerStatus,
    pub has_reentered: bool,
}

impl RosterEntry {
    pub fn is_active(&self) -> bool {
        matches!(self.status, PlayerStatus::Active)
    }

    pub fn is_starter(&self) -> bool {
        self.starting_slot.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRecord {
    pub batting_slot: BattingSlot,
    pub outgoing: PlayerId,
    pub incoming: PlayerId,
    pub inning: u32,
    pub is_reentry: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamLineupState {
    pub game_id: GameId,
    pub team_name: String,
    pub side: TeamSide,
    pub slots: BTreeMap<BattingSlot, SlotOccupant>,
    pub roster: BTreeMap<PlayerId, RosterEntry>,
    pub substitutions: Vec<SubstitutionRecord>,
}

impl TeamLineupState {
    pub(crate) fn new(game_id: GameId, team_name: String, side: TeamSide) -> Self {
        Self {
            game_id,
            team_name,
            side,
            slots: BTreeMap::new(),
            roster: BTreeMap::new(),
            substitutions: Vec::new(),
        }
    }

    /// Active player wearing `jersey`, if any.
    pub fn active_with_jersey(&self, jersey: JerseyNumber) -> Option<&PlayerId> {
        self.slots
            .values()
            .find(|occupant| occupant.jersey_number == jersey)
            .map(|occupant| &occupant.player_id)
    }

    /// Slot held by `player`, if they are active.
    pub fn slot_of(&self, player: &PlayerId) -> Option<BattingSlot> {
        self.slots
            .iter()
            .find(|(_, occupant)| &occupant.player_id == player)
            .map(|(slot, _)| *slot)
    }
}
