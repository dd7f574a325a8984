//! Inning state domain events.

use common::GameId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{DomainEvent, StateRestoredData};
use crate::value_objects::{AtBatResult, Base, BattingSlot, PlayerId, TeamSide, ValidationError};

use super::InningProgress;

/// Events that can occur on an inning state aggregate.
///
/// One plate appearance records, in order: `AtBatCompleted`, the runner
/// events of the play, `CurrentBatterChanged`, then `HalfInningEnded` when
/// the play made the third out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InningStateEvent {
    InningStateCreated(InningStateCreatedData),
    AtBatCompleted(AtBatCompletedData),
    RunnerAdvanced(RunnerAdvancedData),
    RunScored(RunScoredData),
    RunnerOut(RunnerOutData),
    CurrentBatterChanged(CurrentBatterChangedData),
    HalfInningEnded(HalfInningEndedData),
    ActionUndone(StateRestoredData<InningProgress>),
    ActionRedone(StateRestoredData<InningProgress>),
}

impl DomainEvent for InningStateEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InningStateEvent::InningStateCreated(_) => "InningStateCreated",
            InningStateEvent::AtBatCompleted(_) => "AtBatCompleted",
            InningStateEvent::RunnerAdvanced(_) => "RunnerAdvanced",
            InningStateEvent::RunScored(_) => "RunScored",
            InningStateEvent::RunnerOut(_) => "RunnerOut",
            InningStateEvent::CurrentBatterChanged(_) => "CurrentBatterChanged",
            InningStateEvent::HalfInningEnded(_) => "HalfInningEnded",
            InningStateEvent::ActionUndone(_) => "ActionUndone",
            InningStateEvent::ActionRedone(_) => "ActionRedone",
        }
    }

    fn game_id(&self) -> &GameId {
        match self {
            InningStateEvent::InningStateCreated(data) => &data.game_id,
            InningStateEvent::AtBatCompleted(data) => &data.game_id,
            InningStateEvent::RunnerAdvanced(data) => &data.game_id,
            InningStateEvent::RunScored(data) => &data.game_id,
            InningStateEvent::RunnerOut(data) => &data.game_id,
            InningStateEvent::CurrentBatterChanged(data) => &data.game_id,
            InningStateEvent::HalfInningEnded(data) => &data.game_id,
            InningStateEvent::ActionUndone(data) | InningStateEvent::ActionRedone(data) => {
                &data.game_id
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningStateCreatedData {
    pub game_id: GameId,
    pub inning: u32,
    pub is_top_half: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtBatCompletedData {
    pub game_id: GameId,
    pub batter: PlayerId,
    pub batting_slot: BattingSlot,
    pub result: AtBatResult,
    pub rbi: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerAdvancedData {
    pub game_id: GameId,
    pub runner: PlayerId,

    /// `Home` when the batter reaches base.
    pub from: Base,
    pub to: Base,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunScoredData {
    pub game_id: GameId,
    pub runner: PlayerId,
    pub batting_team: TeamSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerOutData {
    pub game_id: GameId,
    pub runner: PlayerId,

    /// Base the out was made at; `Home` for the batter.
    pub base: Base,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentBatterChangedData {
    pub game_id: GameId,
    pub side: TeamSide,
    pub batting_slot: BattingSlot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalfInningEndedData {
    pub game_id: GameId,
    pub inning: u32,
    pub was_top_half: bool,
    pub outs: u8,
    pub runs: u32,
}

// Convenience constructors
impl InningStateEvent {
    /// Fails when `inning` is zero.
    pub fn created(game_id: GameId, inning: u32, is_top_half: bool) -> Result<Self, ValidationError> {
        if inning == 0 {
            return Err(ValidationError::new("Inning must be at least 1"));
        }
        Ok(InningStateEvent::InningStateCreated(InningStateCreatedData {
            game_id,
            inning,
            is_top_half,
        }))
    }

    /// Fails when the runner would stay put or move backwards.
    pub fn runner_advanced(
        game_id: GameId,
        runner: PlayerId,
        from: Base,
        to: Base,
    ) -> Result<Self, ValidationError> {
        let forward = match from {
            Base::Home => to != Base::Home,
            _ => to > from && to != Base::Home,
        };
        if !forward {
            return Err(ValidationError::new(format!(
                "Runner {runner} cannot advance from {from:?} to {to:?}"
            )));
        }
        Ok(InningStateEvent::RunnerAdvanced(RunnerAdvancedData {
            game_id,
            runner,
            from,
            to,
        }))
    }

    /// Fails when `inning` is zero or more than three outs are reported.
    pub fn half_inning_ended(
        game_id: GameId,
        inning: u32,
        was_top_half: bool,
        outs: u8,
        runs: u32,
    ) -> Result<Self, ValidationError> {
        if inning == 0 {
            return Err(ValidationError::new("Inning must be at least 1"));
        }
        if outs > 3 {
            return Err(ValidationError::new(format!("A half inning cannot have {outs} outs")));
        }
        Ok(InningStateEvent::HalfInningEnded(HalfInningEndedData {
            game_id,
            inning,
            was_top_half,
            outs,
            runs,
        }))
    }
}
