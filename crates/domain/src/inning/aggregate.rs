//! Inning state aggregate implementation.

use common::{AggregateType, GameId, InningStateId};

use crate::aggregate::{Aggregate, Restoration, Root, StateRestoredData};
use crate::value_objects::{AtBatResult, BasesState, BattingSlot, PlayerId, TeamSide};

use super::{
    InningProgress, InningStateError, InningStateEvent,
    baserunning::{self, Movement},
    events::{
        AtBatCompletedData, CurrentBatterChangedData, RunScoredData, RunnerOutData,
    },
};

/// Outs that end a half inning.
pub const OUTS_PER_HALF: u8 = 3;

/// Outs, runners and due-up batters of the half inning in play.
#[derive(Debug, Clone)]
pub struct InningState {
    root: Root<InningStateId, InningStateEvent, InningProgress>,
}

/// What a recorded plate appearance did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtBatOutcome {
    pub batting_side: TeamSide,
    pub runs_scored: u32,
    pub rbi: u32,
    pub half_inning_ended: bool,
}

impl Aggregate for InningState {
    type Id = InningStateId;
    type Event = InningStateEvent;
    type State = InningProgress;

    fn aggregate_type() -> AggregateType {
        AggregateType::InningState
    }

    fn state_from_creation(event: &InningStateEvent) -> Option<InningProgress> {
        match event {
            InningStateEvent::InningStateCreated(data) => Some(InningProgress::new(
                data.game_id.clone(),
                data.inning,
                data.is_top_half,
            )),
            _ => None,
        }
    }

    fn apply_event(state: &mut InningProgress, event: &InningStateEvent) {
        match event {
            InningStateEvent::InningStateCreated(data) => {
                *state = InningProgress::new(data.game_id.clone(), data.inning, data.is_top_half);
            }
            InningStateEvent::AtBatCompleted(_) => {
                state.at_bats_in_half += 1;
            }
            InningStateEvent::RunnerAdvanced(data) => {
                state.bases.vacate(data.from, &data.runner);
                state.bases.place(data.to, data.runner.clone());
            }
            InningStateEvent::RunScored(data) => {
                state.bases.remove(&data.runner);
                state.runs_in_half += 1;
            }
            InningStateEvent::RunnerOut(data) => {
                state.bases.remove(&data.runner);
                state.outs += 1;
            }
            InningStateEvent::CurrentBatterChanged(data) => {
                state.set_batter_slot(data.side, data.batting_slot);
            }
            InningStateEvent::HalfInningEnded(data) => {
                state.turn_over(data.inning, data.was_top_half);
            }
            InningStateEvent::ActionUndone(data) | InningStateEvent::ActionRedone(data) => {
                *state = data.state.clone();
            }
        }
    }

    fn restoration_event(
        kind: Restoration,
        data: StateRestoredData<InningProgress>,
    ) -> InningStateEvent {
        match kind {
            Restoration::Undo => InningStateEvent::ActionUndone(data),
            Restoration::Redo => InningStateEvent::ActionRedone(data),
        }
    }

    fn from_root(root: Root<InningStateId, InningStateEvent, InningProgress>) -> Self {
        Self { root }
    }

    fn root(&self) -> &Root<InningStateId, InningStateEvent, InningProgress> {
        &self.root
    }

    fn root_mut(&mut self) -> &mut Root<InningStateId, InningStateEvent, InningProgress> {
        &mut self.root
    }

    fn game_id(&self) -> GameId {
        self.root.state().game_id.clone()
    }
}

// Query methods
impl InningState {
    pub fn inning(&self) -> u32 {
        self.root.state().inning
    }

    pub fn is_top_half(&self) -> bool {
        self.root.state().is_top_half
    }

    pub fn outs(&self) -> u8 {
        self.root.state().outs
    }

    pub fn bases(&self) -> &BasesState {
        &self.root.state().bases
    }

    pub fn batting_side(&self) -> TeamSide {
        self.root.state().batting_side()
    }

    /// Slot due up for `side`.
    pub fn current_batter_slot(&self, side: TeamSide) -> BattingSlot {
        self.root.state().batter_slot(side)
    }

    pub fn runs_in_half(&self) -> u32 {
        self.root.state().runs_in_half
    }
}

// Command methods
impl InningState {
    /// Starts tracking a game at the top of the first inning.
    pub fn create_new(id: InningStateId, game_id: GameId) -> Result<Self, InningStateError> {
        let creation = InningStateEvent::created(game_id.clone(), 1, true)?;
        Ok(Self {
            root: Root::created(id, InningProgress::new(game_id, 1, true), creation),
        })
    }

    /// Records one plate appearance by the side at bat.
    ///
    /// `batting_slot` must be the slot due up, and `lineup_len` is the size
    /// of that side's batting order, used to pick the next batter.
    pub fn record_at_bat(
        &mut self,
        batter: PlayerId,
        batting_slot: BattingSlot,
        result: AtBatResult,
        lineup_len: u8,
    ) -> Result<AtBatOutcome, InningStateError> {
        if lineup_len == 0 {
            return Err(InningStateError::EmptyLineup);
        }
        if batting_slot.value() > lineup_len {
            return Err(InningStateError::SlotOutsideLineup {
                slot: batting_slot,
                lineup_len,
            });
        }

        let state = self.root.state();
        let side = state.batting_side();
        let expected = state.batter_slot(side);
        if batting_slot != expected {
            return Err(InningStateError::NotBattersTurn {
                expected,
                actual: batting_slot,
            });
        }
        if state.bases.base_of(&batter).is_some() {
            return Err(InningStateError::BatterOnBase { batter });
        }

        let game_id = self.game_id();
        let movements = baserunning::resolve(&state.bases, state.outs, &batter, result);

        let runs_scored = movements
            .iter()
            .filter(|m| matches!(m, Movement::Score { .. }))
            .count() as u32;
        let outs_made = movements
            .iter()
            .filter(|m| matches!(m, Movement::Out { .. }))
            .count() as u8;
        let rbi = if result.credits_rbi() { runs_scored } else { 0 };
        let half_inning_ended = state.outs + outs_made >= OUTS_PER_HALF;

        let mut events = Vec::with_capacity(movements.len() + 3);
        events.push(InningStateEvent::AtBatCompleted(AtBatCompletedData {
            game_id: game_id.clone(),
            batter,
            batting_slot,
            result,
            rbi,
        }));
        for movement in movements {
            events.push(match movement {
                Movement::Out { runner, base } => InningStateEvent::RunnerOut(RunnerOutData {
                    game_id: game_id.clone(),
                    runner,
                    base,
                }),
                Movement::Advance { runner, from, to } => {
                    InningStateEvent::runner_advanced(game_id.clone(), runner, from, to)?
                }
                Movement::Score { runner, .. } => InningStateEvent::RunScored(RunScoredData {
                    game_id: game_id.clone(),
                    runner,
                    batting_team: side,
                }),
            });
        }
        events.push(InningStateEvent::CurrentBatterChanged(
            CurrentBatterChangedData {
                game_id: game_id.clone(),
                side,
                batting_slot: batting_slot.next_in(lineup_len),
            },
        ));
        if half_inning_ended {
            events.push(InningStateEvent::half_inning_ended(
                game_id,
                state.inning,
                state.is_top_half,
                OUTS_PER_HALF,
                state.runs_in_half + runs_scored,
            )?);
        }

        for event in events {
            self.record(event);
        }

        Ok(AtBatOutcome {
            batting_side: side,
            runs_scored,
            rbi,
            half_inning_ended,
        })
    }

    /// Ends the open half regardless of outs, e.g. on a run-limit rule.
    pub fn end_half_inning(&mut self) -> Result<(), InningStateError> {
        let state = self.root.state();
        let event = InningStateEvent::half_inning_ended(
            self.game_id(),
            state.inning,
            state.is_top_half,
            state.outs,
            state.runs_in_half,
        )?;
        self.record(event);
        Ok(())
    }

    fn record(&mut self, event: InningStateEvent) {
        self.root.record(event, Self::apply_event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DomainEvent;
    use crate::value_objects::Base;

    fn p(id: &str) -> PlayerId {
        PlayerId::new(id).unwrap()
    }

    fn slot(n: u8) -> BattingSlot {
        BattingSlot::new(n).unwrap()
    }

    fn new_inning() -> InningState {
        InningState::create_new(
            InningStateId::new("inning-1").unwrap(),
            GameId::new("game-1").unwrap(),
        )
        .unwrap()
    }

    fn occupies(inning: &InningState, base: Base, player: &str) -> bool {
        inning
            .bases()
            .runner_on(base)
            .is_some_and(|runner| runner.as_str() == player)
    }

    fn event_types(inning: &InningState) -> Vec<&'static str> {
        inning
            .get_uncommitted_events()
            .iter()
            .map(|e| e.event.event_type())
            .collect()
    }

    #[test]
    fn away_team_bats_first() {
        let inning = new_inning();
        assert_eq!(inning.batting_side(), TeamSide::Away);
        assert_eq!(inning.current_batter_slot(TeamSide::Away), slot(1));
    }

    #[test]
    fn single_records_events_in_order() {
        let mut inning = new_inning();
        let outcome = inning
            .record_at_bat(p("a1"), slot(1), AtBatResult::Single, 9)
            .unwrap();

        assert_eq!(outcome.runs_scored, 0);
        assert!(!outcome.half_inning_ended);
        assert!(occupies(&inning, Base::First, "a1"));
        assert_eq!(inning.current_batter_slot(TeamSide::Away), slot(2));
        assert_eq!(
            event_types(&inning),
            vec![
                "InningStateCreated",
                "AtBatCompleted",
                "RunnerAdvanced",
                "CurrentBatterChanged"
            ]
        );
    }

    #[test]
    fn home_run_scores_runner_and_batter() {
        let mut inning = new_inning();
        inning
            .record_at_bat(p("a1"), slot(1), AtBatResult::Double, 9)
            .unwrap();
        let outcome = inning
            .record_at_bat(p("a2"), slot(2), AtBatResult::HomeRun, 9)
            .unwrap();

        assert_eq!(outcome.runs_scored, 2);
        assert_eq!(outcome.rbi, 2);
        assert!(inning.bases().is_empty());
        assert_eq!(inning.runs_in_half(), 2);
    }

    #[test]
    fn wrong_batter_is_rejected_without_events() {
        let mut inning = new_inning();
        let result = inning.record_at_bat(p("a3"), slot(3), AtBatResult::Single, 9);

        assert!(matches!(
            result,
            Err(InningStateError::NotBattersTurn { .. })
        ));
        assert_eq!(inning.get_uncommitted_events().len(), 1);
    }

    #[test]
    fn slot_outside_lineup_is_rejected() {
        let mut inning = new_inning();
        assert!(matches!(
            inning.record_at_bat(p("a1"), slot(1), AtBatResult::Single, 0),
            Err(InningStateError::EmptyLineup)
        ));
    }

    #[test]
    fn three_outs_end_the_half() {
        let mut inning = new_inning();
        for n in 1..=3 {
            inning
                .record_at_bat(p(&format!("a{n}")), slot(n), AtBatResult::Strikeout, 9)
                .unwrap();
        }

        assert!(!inning.is_top_half());
        assert_eq!(inning.inning(), 1);
        assert_eq!(inning.outs(), 0);
        assert_eq!(inning.batting_side(), TeamSide::Home);
        assert_eq!(inning.current_batter_slot(TeamSide::Away), slot(4));
        assert_eq!(event_types(&inning).last(), Some(&"HalfInningEnded"));
    }

    #[test]
    fn batting_order_wraps() {
        let mut inning = new_inning();
        inning
            .record_at_bat(p("a1"), slot(1), AtBatResult::Walk, 2)
            .unwrap();
        inning
            .record_at_bat(p("a2"), slot(2), AtBatResult::Walk, 2)
            .unwrap();
        assert_eq!(inning.current_batter_slot(TeamSide::Away), slot(1));
    }

    #[test]
    fn manual_end_moves_to_next_half() {
        let mut inning = new_inning();
        inning
            .record_at_bat(p("a1"), slot(1), AtBatResult::FlyOut, 9)
            .unwrap();
        inning.end_half_inning().unwrap();
        inning.end_half_inning().unwrap();

        assert_eq!((inning.inning(), inning.is_top_half()), (2, true));
    }

    #[test]
    fn double_play_clears_force() {
        let mut inning = new_inning();
        inning
            .record_at_bat(p("a1"), slot(1), AtBatResult::Single, 9)
            .unwrap();
        let outcome = inning
            .record_at_bat(p("a2"), slot(2), AtBatResult::DoublePlay, 9)
            .unwrap();

        assert_eq!(outcome.runs_scored, 0);
        assert_eq!(inning.outs(), 2);
        assert!(inning.bases().is_empty());
    }
}
