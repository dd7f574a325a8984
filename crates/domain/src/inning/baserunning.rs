//! Runner movement for one plate appearance.

use crate::value_objects::{AtBatResult, Base, BasesState, PlayerId};

/// One consequence of a play, in the order it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Movement {
    Out { runner: PlayerId, base: Base },
    Advance { runner: PlayerId, from: Base, to: Base },
    Score { runner: PlayerId, from: Base },
}

/// Movements for a plate appearance with `outs_before` already recorded.
///
/// Outs come first. Once they reach three the play ends the half and no
/// runner moves.
pub(crate) fn resolve(
    bases: &BasesState,
    outs_before: u8,
    batter: &PlayerId,
    result: AtBatResult,
) -> Vec<Movement> {
    let runners = bases.as_array();
    let mut outs = Vec::new();
    let mut moves = Vec::new();

    match result {
        AtBatResult::Single | AtBatResult::Double | AtBatResult::Triple | AtBatResult::HomeRun => {
            let bases_taken = result.hit_bases().unwrap_or(1) as usize;
            for index in (0..3).rev() {
                if let Some(runner) = &runners[index] {
                    moves.push(advance(runner, index, index + bases_taken));
                }
            }
            moves.push(advance_batter(batter, bases_taken));
        }
        AtBatResult::Walk | AtBatResult::Error => {
            for index in (0..forced_chain(&runners)).rev() {
                if let Some(runner) = &runners[index] {
                    moves.push(advance(runner, index, index + 1));
                }
            }
            moves.push(advance_batter(batter, 1));
        }
        AtBatResult::Strikeout | AtBatResult::GroundOut | AtBatResult::FlyOut => {
            outs.push(batter_out(batter));
        }
        AtBatResult::SacrificeFly => {
            outs.push(batter_out(batter));
            if outs_before < 2
                && let Some(runner) = &runners[2]
            {
                moves.push(advance(runner, 2, 3));
            }
        }
        AtBatResult::FieldersChoice => {
            let chain = forced_chain(&runners);
            if chain > 0 {
                let lead = chain - 1;
                if let Some(runner) = &runners[lead] {
                    outs.push(Movement::Out {
                        runner: runner.clone(),
                        base: Base::from_index(lead + 1),
                    });
                }
                for index in (0..lead).rev() {
                    if let Some(runner) = &runners[index] {
                        moves.push(advance(runner, index, index + 1));
                    }
                }
            }
            moves.push(advance_batter(batter, 1));
        }
        AtBatResult::DoublePlay => {
            let chain = forced_chain(&runners);
            if chain > 0 {
                let lead = chain - 1;
                if let Some(runner) = &runners[lead] {
                    outs.push(Movement::Out {
                        runner: runner.clone(),
                        base: Base::from_index(lead + 1),
                    });
                }
            }
            outs.push(batter_out(batter));
        }
    }

    let remaining = 3u8.saturating_sub(outs_before) as usize;
    if outs.len() >= remaining {
        outs.truncate(remaining);
        return outs;
    }
    outs.extend(moves);
    outs
}

/// Number of consecutive occupied bases starting at first.
fn forced_chain(runners: &[Option<PlayerId>; 3]) -> usize {
    runners.iter().take_while(|runner| runner.is_some()).count()
}

fn advance(runner: &PlayerId, from: usize, to: usize) -> Movement {
    let from = Base::from_index(from);
    if to >= 3 {
        Movement::Score {
            runner: runner.clone(),
            from,
        }
    } else {
        Movement::Advance {
            runner: runner.clone(),
            from,
            to: Base::from_index(to),
        }
    }
}

fn advance_batter(batter: &PlayerId, bases_taken: usize) -> Movement {
    if bases_taken >= 4 {
        Movement::Score {
            runner: batter.clone(),
            from: Base::Home,
        }
    } else {
        Movement::Advance {
            runner: batter.clone(),
            from: Base::Home,
            to: Base::from_index(bases_taken - 1),
        }
    }
}

fn batter_out(batter: &PlayerId) -> Movement {
    Movement::Out {
        runner: batter.clone(),
        base: Base::Home,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: &str) -> PlayerId {
        PlayerId::new(id).unwrap()
    }

    fn bases(first: Option<&str>, second: Option<&str>, third: Option<&str>) -> BasesState {
        let mut bases = BasesState::empty();
        if let Some(r) = first {
            bases.place(Base::First, p(r));
        }
        if let Some(r) = second {
            bases.place(Base::Second, p(r));
        }
        if let Some(r) = third {
            bases.place(Base::Third, p(r));
        }
        bases
    }

    fn runs(moves: &[Movement]) -> usize {
        moves
            .iter()
            .filter(|m| matches!(m, Movement::Score { .. }))
            .count()
    }

    #[test]
    fn single_moves_everyone_one_base() {
        let moves = resolve(&bases(Some("r1"), None, Some("r3")), 0, &p("b"), AtBatResult::Single);
        assert_eq!(
            moves,
            vec![
                Movement::Score { runner: p("r3"), from: Base::Third },
                Movement::Advance { runner: p("r1"), from: Base::First, to: Base::Second },
                Movement::Advance { runner: p("b"), from: Base::Home, to: Base::First },
            ]
        );
    }

    #[test]
    fn grand_slam_scores_four() {
        let loaded = bases(Some("r1"), Some("r2"), Some("r3"));
        let moves = resolve(&loaded, 1, &p("b"), AtBatResult::HomeRun);
        assert_eq!(runs(&moves), 4);
    }

    #[test]
    fn walk_forces_only() {
        let moves = resolve(&bases(None, Some("r2"), Some("r3")), 0, &p("b"), AtBatResult::Walk);
        assert_eq!(
            moves,
            vec![Movement::Advance { runner: p("b"), from: Base::Home, to: Base::First }]
        );

        let loaded = bases(Some("r1"), Some("r2"), Some("r3"));
        assert_eq!(runs(&resolve(&loaded, 0, &p("b"), AtBatResult::Walk)), 1);
    }

    #[test]
    fn sacrifice_fly_scores_from_third_with_less_than_two_outs() {
        let third = bases(None, None, Some("r3"));
        assert_eq!(runs(&resolve(&third, 1, &p("b"), AtBatResult::SacrificeFly)), 1);
        assert_eq!(runs(&resolve(&third, 2, &p("b"), AtBatResult::SacrificeFly)), 0);
    }

    #[test]
    fn fielders_choice_retires_lead_forced_runner() {
        let moves = resolve(
            &bases(Some("r1"), Some("r2"), None),
            0,
            &p("b"),
            AtBatResult::FieldersChoice,
        );
        assert_eq!(
            moves,
            vec![
                Movement::Out { runner: p("r2"), base: Base::Third },
                Movement::Advance { runner: p("r1"), from: Base::First, to: Base::Second },
                Movement::Advance { runner: p("b"), from: Base::Home, to: Base::First },
            ]
        );
    }

    #[test]
    fn double_play_with_one_out_ends_half_without_movement() {
        let moves = resolve(
            &bases(Some("r1"), None, Some("r3")),
            1,
            &p("b"),
            AtBatResult::DoublePlay,
        );
        assert_eq!(
            moves,
            vec![
                Movement::Out { runner: p("r1"), base: Base::Second },
                Movement::Out { runner: p("b"), base: Base::Home },
            ]
        );
    }

    #[test]
    fn double_play_without_force_retires_batter_only() {
        let moves = resolve(&bases(None, Some("r2"), None), 0, &p("b"), AtBatResult::DoublePlay);
        assert_eq!(moves, vec![Movement::Out { runner: p("b"), base: Base::Home }]);
    }

    #[test]
    fn third_out_stops_runs() {
        let loaded = bases(Some("r1"), Some("r2"), Some("r3"));
        let moves = resolve(&loaded, 2, &p("b"), AtBatResult::FieldersChoice);
        assert_eq!(moves.len(), 1);
        assert_eq!(runs(&moves), 0);
    }
}
