//! Conflicts, partial failures and diverged history.

mod support;

use application::{CoreConfig, ErrorKind};
use common::AggregateType;
use domain::{AtBatResult, Repository};
use event_store::InMemorySnapshotStore;
use support::{Fault, FaultyStore, Harness, game_id};

fn faulty_harness() -> Harness<FaultyStore, InMemorySnapshotStore> {
    Harness::with_stores(
        FaultyStore::default(),
        InMemorySnapshotStore::new(),
        CoreConfig::default(),
    )
}

#[tokio::test]
async fn lost_race_is_retryable() {
    let harness = faulty_harness();
    let before = harness.start().await;

    harness.events.arm(AggregateType::InningState, Fault::Conflict);
    let result = harness.at_bat("a1", AtBatResult::Single).await;

    assert!(!result.success);
    assert!(result.retryable);
    assert_eq!(result.error_kind, Some(ErrorKind::Conflict));
    assert!(result.partial_failure.is_none());
    assert_eq!(harness.state().await, before);

    harness.events.disarm();
    let retried = harness.at_bat("a1", AtBatResult::Single).await;
    assert!(retried.success, "{:?}", retried.errors);
    assert_eq!(retried.undo_stack_depth, 1);
}

#[tokio::test]
async fn later_save_failure_reports_what_persisted() {
    let harness = faulty_harness();
    harness.start().await;

    harness.events.arm(AggregateType::Game, Fault::Unavailable);
    let result = harness.at_bat("a1", AtBatResult::HomeRun).await;

    assert!(!result.success);
    assert!(!result.retryable);
    assert_eq!(result.error_kind, Some(ErrorKind::PartialFailure));
    let partial = result.partial_failure.unwrap();
    assert_eq!(partial.failed, "Game");
    assert_eq!(partial.persisted.len(), 1);
    assert!(partial.persisted[0].starts_with("InningState"));

    // Nothing half-applied is offered for undo.
    assert_eq!(result.undo_stack_depth, 0);

    harness.events.disarm();
    let state = harness.state().await;
    assert_eq!(state.away_runs, 0);
    assert_eq!(state.current_batter.unwrap().player_id, "a2");
}

#[tokio::test]
async fn half_inning_mismatch_is_detected() {
    let harness = faulty_harness();
    harness.start().await;
    harness.play("a1", AtBatResult::Strikeout).await;
    harness.play("a2", AtBatResult::Strikeout).await;

    harness.events.arm(AggregateType::Game, Fault::Unavailable);
    let partial = harness.at_bat("a3", AtBatResult::Strikeout).await;
    assert_eq!(partial.error_kind, Some(ErrorKind::PartialFailure));
    harness.events.disarm();

    let result = harness.at_bat("h1", AtBatResult::Single).await;
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Conflict));
    assert!(!result.retryable);
}

#[tokio::test]
async fn first_save_failure_is_not_partial() {
    let harness = faulty_harness();
    harness.start().await;

    harness.events.arm(AggregateType::InningState, Fault::Unavailable);
    let result = harness.at_bat("a1", AtBatResult::Single).await;

    assert_eq!(result.error_kind, Some(ErrorKind::Internal));
    assert!(result.partial_failure.is_none());
}

#[tokio::test]
async fn undo_failure_keeps_the_entry() {
    let harness = faulty_harness();
    harness.start().await;
    harness.play("a1", AtBatResult::Walk).await;

    harness.events.arm(AggregateType::InningState, Fault::Conflict);
    let failed = harness.undo().await;
    assert!(failed.retryable);
    assert_eq!(failed.undo_stack_depth, 1);

    harness.events.disarm();
    let undone = harness.undo().await;
    assert!(undone.success, "{:?}", undone.errors);
    assert_eq!(undone.game_state.unwrap().bases.first, None);
}

#[tokio::test]
async fn external_change_makes_undo_diverge() {
    let harness = Harness::new();
    harness.start().await;
    harness.play("a1", AtBatResult::HomeRun).await;

    let games = harness.services.games();
    let mut game = games.find_by_id(&game_id()).await.unwrap();
    game.add_home_runs(1).unwrap();
    games.save(&mut game).await.unwrap();

    let result = harness.undo().await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Conflict));
    assert_eq!((result.undo_stack_depth, result.redo_stack_depth), (0, 0));
    let state = harness.state().await;
    assert_eq!((state.home_runs, state.away_runs), (1, 1));
}

#[tokio::test]
async fn committed_action_survives_unreadable_state() {
    let harness = faulty_harness();
    harness.start().await;

    harness.events.arm(AggregateType::Game, Fault::BlindAfterCommit);
    let result = harness.at_bat("a1", AtBatResult::Single).await;

    assert!(result.success, "{:?}", result.errors);
    assert!(result.errors.is_empty());
    assert!(result.game_state.is_none());
    assert!(!result.warnings.is_empty());
    assert_eq!(result.undo_stack_depth, 1);

    harness.events.disarm();
    let state = harness.state().await;
    assert_eq!(state.bases.first.as_deref(), Some("a1"));
    assert_eq!(state.current_batter.unwrap().player_id, "a2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_actions_on_one_game_commit_in_order() {
    let harness = Harness::new();
    harness.start().await;

    let (first, second, third) =
        tokio::join!(harness.end_inning(), harness.end_inning(), harness.end_inning());
    for result in [&first, &second, &third] {
        assert!(result.success, "{:?}", result.errors);
    }
    let state = harness.state().await;
    assert_eq!((state.current_inning, state.is_top_half), (2, false));

    for _ in 0..3 {
        let undone = harness.undo().await;
        assert!(undone.success, "{:?}", undone.errors);
    }
    let state = harness.state().await;
    assert_eq!((state.current_inning, state.is_top_half), (1, true));
    assert_eq!(
        (
            harness.services.can_undo(&game_id()).await,
            harness.services.can_redo(&game_id()).await
        ),
        (false, true)
    );
}
