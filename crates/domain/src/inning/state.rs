//! Progress of the current half inning.

use common::GameId;
use serde::{Deserialize, Serialize};

use crate::value_objects::{BasesState, BattingSlot, TeamSide};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningProgress {
    pub game_id: GameId,
    pub inning: u32,
    pub is_top_half: bool,

    /// Outs in the open half, 0 to 2 between plays.
    pub outs: u8,
    pub bases: BasesState,

    /// Next batter for each side; the order carries over between halves.
    pub away_batter_slot: BattingSlot,
    pub home_batter_slot: BattingSlot,

    pub at_bats_in_half: u32,
    pub runs_in_half: u32,
}

impl InningProgress {
    pub(crate) fn new(game_id: GameId, inning: u32, is_top_half: bool) -> Self {
        Self {
            game_id,
            inning,
            is_top_half,
            outs: 0,
            bases: BasesState::empty(),
            away_batter_slot: BattingSlot::first(),
            home_batter_slot: BattingSlot::first(),
            at_bats_in_half: 0,
            runs_in_half: 0,
        }
    }

    pub fn batting_side(&self) -> TeamSide {
        TeamSide::batting(self.is_top_half)
    }

    pub fn batter_slot(&self, side: TeamSide) -> BattingSlot {
        match side {
            TeamSide::Home => self.home_batter_slot,
            TeamSide::Away => self.away_batter_slot,
        }
    }

    pub(crate) fn set_batter_slot(&mut self, side: TeamSide, slot: BattingSlot) {
        match side {
            TeamSide::Home => self.home_batter_slot = slot,
            TeamSide::Away => self.away_batter_slot = slot,
        }
    }

    /// Clears the half and moves to the next one.
    pub(crate) fn turn_over(&mut self, ended_inning: u32, was_top_half: bool) {
        if was_top_half {
            self.inning = ended_inning;
            self.is_top_half = false;
        } else {
            self.inning = ended_inning + 1;
            self.is_top_half = true;
        }
        self.outs = 0;
        self.bases = BasesState::empty();
        self.at_bats_in_half = 0;
        self.runs_in_half = 0;
    }
}
