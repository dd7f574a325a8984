//! Shared fixtures for the use-case tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use application::{
    ActionResult, CoreConfig, EndInningCommand, GameServices, GameStateDto, LineupEntryInput,
    PlayerInput, RecordAtBatCommand, RedoLastActionCommand, StartNewGameCommand,
    UndoLastActionCommand,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, AggregateType, GameId};
use domain::{AtBatResult, FieldPosition, PlayerId};
use event_store::{
    EventEnvelope, EventQuery, EventStore, EventStoreError, EventStream, InMemoryEventStore,
    InMemorySnapshotStore, SnapshotStore, StoredEvent, Version,
};

pub const POSITIONS: [FieldPosition; 9] = [
    FieldPosition::Pitcher,
    FieldPosition::Catcher,
    FieldPosition::FirstBase,
    FieldPosition::SecondBase,
    FieldPosition::ThirdBase,
    FieldPosition::Shortstop,
    FieldPosition::LeftField,
    FieldPosition::CenterField,
    FieldPosition::RightField,
];

pub fn game_id() -> GameId {
    GameId::new("game-1").unwrap()
}

pub fn player(id: &str, jersey: u8) -> PlayerInput {
    PlayerInput {
        player_id: id.to_string(),
        name: format!("Player {id}"),
        jersey_number: jersey,
        position: FieldPosition::ExtraHitter,
    }
}

/// Nine players `{prefix}1` to `{prefix}9` batting in jersey order.
pub fn lineup(prefix: &str) -> Vec<LineupEntryInput> {
    (1..=9u8)
        .map(|n| LineupEntryInput {
            batting_slot: n,
            player: PlayerInput {
                position: POSITIONS[usize::from(n - 1)],
                ..player(&format!("{prefix}{n}"), n)
            },
        })
        .collect()
}

pub fn start_command() -> StartNewGameCommand {
    StartNewGameCommand {
        game_id: Some(game_id()),
        home_team_name: "Sluggers".to_string(),
        away_team_name: "Bombers".to_string(),
        home_lineup: lineup("h"),
        away_lineup: lineup("a"),
    }
}

pub struct Harness<S = InMemoryEventStore, P = InMemorySnapshotStore> {
    pub events: S,
    pub snapshots: P,
    pub services: GameServices<S, P>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    pub fn with_config(config: CoreConfig) -> Self {
        Self::with_stores(InMemoryEventStore::new(), InMemorySnapshotStore::new(), config)
    }
}

impl<S, P> Harness<S, P>
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    pub fn with_stores(events: S, snapshots: P, config: CoreConfig) -> Self {
        let services = GameServices::new(events.clone(), snapshots.clone(), config);
        Self {
            events,
            snapshots,
            services,
        }
    }

    /// Starts `game-1` and returns its initial state.
    pub async fn start(&self) -> GameStateDto {
        let result = self.services.start_new_game().execute(start_command()).await;
        assert!(result.success, "start failed: {:?}", result.errors);
        result.game_state.unwrap()
    }

    pub async fn at_bat(&self, batter: &str, result: AtBatResult) -> ActionResult {
        self.services
            .record_at_bat()
            .execute(RecordAtBatCommand {
                game_id: game_id(),
                batter_id: PlayerId::new(batter).unwrap(),
                result,
            })
            .await
    }

    /// Records an at-bat that must succeed.
    pub async fn play(&self, batter: &str, result: AtBatResult) -> GameStateDto {
        let outcome = self.at_bat(batter, result).await;
        assert!(outcome.success, "{batter} {result:?} failed: {:?}", outcome.errors);
        outcome.game_state.unwrap()
    }

    pub async fn end_inning(&self) -> ActionResult {
        self.services
            .end_inning()
            .execute(EndInningCommand { game_id: game_id() })
            .await
    }

    pub async fn undo(&self) -> ActionResult {
        self.services
            .undo_last_action()
            .execute(UndoLastActionCommand { game_id: game_id() })
            .await
    }

    pub async fn redo(&self) -> ActionResult {
        self.services
            .redo_last_action()
            .execute(RedoLastActionCommand { game_id: game_id() })
            .await
    }

    pub async fn state(&self) -> GameStateDto {
        self.services.game_state(&game_id()).await.unwrap()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Appends fail with a concurrency conflict.
    Conflict,
    /// Appends fail outright.
    Unavailable,
    /// Appends succeed, then every stream read fails until disarmed.
    BlindAfterCommit,
}

/// Delegates to the in-memory store, injecting faults for one aggregate
/// type while armed and counting events handed out by game-wide scans.
#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: InMemoryEventStore,
    armed: Arc<Mutex<Option<(AggregateType, Fault)>>>,
    blind: Arc<AtomicBool>,
    game_log_scanned: Arc<AtomicUsize>,
}

impl FaultyStore {
    pub fn arm(&self, aggregate_type: AggregateType, fault: Fault) {
        *self.armed.lock().unwrap() = Some((aggregate_type, fault));
    }

    pub fn disarm(&self) {
        *self.armed.lock().unwrap() = None;
        self.blind.store(false, Ordering::SeqCst);
    }

    /// Events returned by `get_events_by_game_id` so far.
    pub fn game_log_scanned(&self) -> usize {
        self.game_log_scanned.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.game_log_scanned.store(0, Ordering::SeqCst);
        self.inner.reset_read_counter();
    }

    fn check_readable(&self) -> event_store::Result<()> {
        if self.blind.load(Ordering::SeqCst) {
            return Err(EventStoreError::InvalidRow("store unreadable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for FaultyStore {
    async fn append(
        &self,
        aggregate_id: &AggregateId,
        aggregate_type: AggregateType,
        events: Vec<EventEnvelope>,
        expected_version: Option<Version>,
    ) -> event_store::Result<Version> {
        let armed = *self.armed.lock().unwrap();
        match armed {
            Some((target, Fault::Conflict)) if target == aggregate_type => {
                let expected = expected_version.unwrap_or_else(Version::initial);
                Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id: aggregate_id.clone(),
                    expected,
                    actual: expected.next(),
                })
            }
            Some((target, Fault::Unavailable)) if target == aggregate_type => Err(
                EventStoreError::InvalidAppend("store unavailable".to_string()),
            ),
            Some((target, Fault::BlindAfterCommit)) if target == aggregate_type => {
                let version = self
                    .inner
                    .append(aggregate_id, aggregate_type, events, expected_version)
                    .await?;
                self.blind.store(true, Ordering::SeqCst);
                Ok(version)
            }
            _ => {
                self.inner
                    .append(aggregate_id, aggregate_type, events, expected_version)
                    .await
            }
        }
    }

    async fn get_events(
        &self,
        aggregate_id: &AggregateId,
        from_version: Option<Version>,
    ) -> event_store::Result<Vec<StoredEvent>> {
        self.check_readable()?;
        self.inner.get_events(aggregate_id, from_version).await
    }

    async fn query_events(&self, query: EventQuery) -> event_store::Result<Vec<StoredEvent>> {
        self.check_readable()?;
        self.inner.query_events(query).await
    }

    async fn get_all_events(&self) -> event_store::Result<Vec<StoredEvent>> {
        self.inner.get_all_events().await
    }

    async fn get_events_by_type(&self, event_type: &str) -> event_store::Result<Vec<StoredEvent>> {
        self.inner.get_events_by_type(event_type).await
    }

    async fn get_events_by_time_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> event_store::Result<Vec<StoredEvent>> {
        self.inner.get_events_by_time_range(from, to).await
    }

    async fn get_events_by_game_id(&self, game_id: &GameId) -> event_store::Result<Vec<StoredEvent>> {
        let events = self.inner.get_events_by_game_id(game_id).await?;
        self.game_log_scanned
            .fetch_add(events.len(), Ordering::SeqCst);
        Ok(events)
    }

    async fn stream_all_events(&self) -> event_store::Result<EventStream> {
        self.inner.stream_all_events().await
    }

    async fn get_aggregate_version(
        &self,
        aggregate_id: &AggregateId,
    ) -> event_store::Result<Option<Version>> {
        self.inner.get_aggregate_version(aggregate_id).await
    }
}
