//! Aggregate reconstruction and persistence.
//!
//! [`EventSourcedRepository`] is the only code path that turns stored events
//! back into aggregates and the only writer of snapshots.

use std::marker::PhantomData;

use async_trait::async_trait;
use common::{AggregateId, GameId, InningStateId, TeamLineupId};
use event_store::{
    EventQuery, EventStore, EventStoreExt, Snapshot, SnapshotStore, StoredEvent, Version,
};

use crate::aggregate::{Aggregate, RecordedEvent, fold};
use crate::error::DomainError;
use crate::game::Game;
use crate::inning::{InningState, InningStateEvent};
use crate::lineup::{TeamLineup, TeamLineupEvent};
use crate::value_objects::TeamSide;

/// When the repository writes a snapshot.
///
/// A snapshot is written whenever a save carries the stream across a
/// multiple of `interval`. An interval of 0 never snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    pub interval: u64,
}

impl SnapshotPolicy {
    pub fn every(interval: u64) -> Self {
        Self { interval }
    }

    pub fn disabled() -> Self {
        Self { interval: 0 }
    }

    /// True when a save moving the stream from `before` to `after` crosses
    /// an interval boundary.
    pub fn should_snapshot(&self, before: Version, after: Version) -> bool {
        if self.interval == 0 || after <= before {
            return false;
        }
        let boundary = |v: Version| v.as_i64().max(0) as u64 / self.interval;
        boundary(after) > boundary(before)
    }
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self::every(50)
    }
}

/// Lookup and persistence of one aggregate type.
#[async_trait]
pub trait Repository<A: Aggregate + 'static>: Send + Sync {
    /// Rebuilds the aggregate at its latest version.
    async fn find_by_id(&self, id: &A::Id) -> Result<A, DomainError>;

    /// Rebuilds the aggregate as it was right after `version` was stored.
    async fn find_by_id_at_version(&self, id: &A::Id, version: Version)
    -> Result<A, DomainError>;

    /// Appends the pending events and returns the new committed version.
    async fn save(&self, aggregate: &mut A) -> Result<Version, DomainError>;

    async fn exists(&self, id: &A::Id) -> Result<bool, DomainError>;
}

#[async_trait]
pub trait GameRepository: Repository<Game> {}

#[async_trait]
pub trait TeamLineupRepository: Repository<TeamLineup> {
    /// The lineup a game created for `side`, if any.
    async fn find_by_game_id_and_side(
        &self,
        game_id: &GameId,
        side: TeamSide,
    ) -> Result<Option<TeamLineup>, DomainError>;
}

#[async_trait]
pub trait InningStateRepository: Repository<InningState> {
    /// The most recently created inning state of a game, if any.
    async fn find_current_by_game_id(
        &self,
        game_id: &GameId,
    ) -> Result<Option<InningState>, DomainError>;
}

/// Generic repository over an event store and a snapshot store.
pub struct EventSourcedRepository<A, S, P> {
    events: S,
    snapshots: P,
    policy: SnapshotPolicy,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A, S, P> Clone for EventSourcedRepository<A, S, P>
where
    S: Clone,
    P: Clone,
{
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            snapshots: self.snapshots.clone(),
            policy: self.policy,
            _aggregate: PhantomData,
        }
    }
}

impl<A, S, P> EventSourcedRepository<A, S, P>
where
    A: Aggregate,
    S: EventStore,
    P: SnapshotStore,
{
    pub fn new(events: S, snapshots: P, policy: SnapshotPolicy) -> Self {
        Self {
            events,
            snapshots,
            policy,
            _aggregate: PhantomData,
        }
    }

    pub fn event_store(&self) -> &S {
        &self.events
    }

    pub fn snapshot_store(&self) -> &P {
        &self.snapshots
    }

    pub fn policy(&self) -> SnapshotPolicy {
        self.policy
    }

    /// Writes a snapshot of the aggregate's committed state.
    ///
    /// Fails if the aggregate still has pending events, since their state
    /// is not in the log yet.
    pub async fn save_snapshot(&self, aggregate: &A) -> Result<(), DomainError> {
        if aggregate.has_uncommitted_events() {
            return Err(DomainError::CorruptStream {
                aggregate_id: aggregate.aggregate_id().to_string(),
                reason: "cannot snapshot uncommitted state".to_string(),
            });
        }
        let snapshot = Snapshot::capture(
            aggregate.aggregate_id(),
            A::aggregate_type(),
            aggregate.version(),
            aggregate.state(),
        )?;
        self.snapshots.save(snapshot).await?;
        metrics::counter!("snapshots_saved_total", "aggregate_type" => A::aggregate_type().as_str())
            .increment(1);
        Ok(())
    }

    /// Latest usable snapshot at or below `max_version`.
    ///
    /// Any problem reading or decoding the snapshot is logged and treated as
    /// a missing snapshot.
    async fn load_baseline(
        &self,
        aggregate_id: &AggregateId,
        max_version: Option<Version>,
    ) -> Option<(A::State, Version)> {
        let snapshot = match self.snapshots.load(aggregate_id).await {
            Ok(snapshot) => snapshot?,
            Err(e) => {
                tracing::warn!(%aggregate_id, error = %e, "snapshot load failed, replaying");
                return None;
            }
        };
        if snapshot.aggregate_type != A::aggregate_type() {
            tracing::warn!(%aggregate_id, "snapshot has the wrong aggregate type, ignoring");
            return None;
        }
        if max_version.is_some_and(|max| snapshot.version > max) {
            return None;
        }
        let version = snapshot.version;
        match snapshot.decode::<A::State>() {
            Ok(state) => Some((state, version)),
            Err(e) => {
                tracing::warn!(%aggregate_id, %version, error = %e, "snapshot unreadable, replaying");
                None
            }
        }
    }

    /// Folds the stream onto an optional baseline, stopping after
    /// `max_version` when given.
    async fn rebuild(
        &self,
        aggregate_id: &AggregateId,
        baseline: Option<(A::State, Version)>,
        max_version: Option<Version>,
    ) -> Result<Option<(A::State, Version)>, DomainError> {
        let from = baseline.as_ref().map(|(_, version)| *version);
        let stored = match max_version {
            Some(max) => {
                let start = from.map_or_else(Version::first, |v| v.next());
                let query = EventQuery::for_aggregate(aggregate_id.clone()).versions(start..=max);
                self.events.query_events(query).await?
            }
            None => self.events.get_events(aggregate_id, from).await?,
        };
        let events = decode::<A>(stored)?;
        let replayed = events.len();

        let folded = fold::<A, _>(aggregate_id, baseline, events)?;

        let source = if from.is_some() { "snapshot" } else { "replay" };
        metrics::counter!(
            "aggregate_loads_total",
            "aggregate_type" => A::aggregate_type().as_str(),
            "source" => source
        )
        .increment(1);
        metrics::histogram!("aggregate_events_replayed", "aggregate_type" => A::aggregate_type().as_str())
            .record(replayed as f64);
        tracing::debug!(%aggregate_id, replayed, source, "aggregate rebuilt");

        Ok(folded)
    }

    /// Rebuild from the snapshot when it is consistent with the log, from
    /// version 1 otherwise.
    async fn load(
        &self,
        aggregate_id: &AggregateId,
        max_version: Option<Version>,
    ) -> Result<Option<(A::State, Version)>, DomainError> {
        let Some(baseline) = self.load_baseline(aggregate_id, max_version).await else {
            return self.rebuild(aggregate_id, None, max_version).await;
        };
        let snapshot_version = baseline.1;

        match self.rebuild(aggregate_id, Some(baseline), max_version).await {
            Ok(Some((state, version))) if version != snapshot_version => Ok(Some((state, version))),
            Ok(Some((state, version))) => {
                // An empty tail is only trustworthy if the log really ends here.
                let head = self.events.get_aggregate_version(aggregate_id).await?;
                if head.is_some_and(|head| head >= version) {
                    Ok(Some((state, version)))
                } else {
                    tracing::warn!(%aggregate_id, %version, "snapshot is ahead of the log, replaying");
                    self.rebuild(aggregate_id, None, max_version).await
                }
            }
            Ok(None) => self.rebuild(aggregate_id, None, max_version).await,
            Err(DomainError::CorruptStream { reason, .. }) => {
                tracing::warn!(%aggregate_id, %reason, "snapshot does not line up with the log, replaying");
                self.rebuild(aggregate_id, None, max_version).await
            }
            Err(e) => Err(e),
        }
    }

    fn not_found(id: &A::Id) -> DomainError {
        DomainError::AggregateNotFound {
            aggregate_type: A::aggregate_type(),
            aggregate_id: id.to_string(),
        }
    }
}

/// Decodes stored events into numbered domain events.
fn decode<A: Aggregate>(stored: Vec<StoredEvent>) -> Result<Vec<(Version, A::Event)>, DomainError> {
    stored
        .into_iter()
        .map(|event| {
            let version = event.version;
            RecordedEvent::<A::Event>::from_stored(event).map(|recorded| (version, recorded.event))
        })
        .collect()
}

#[async_trait]
impl<A, S, P> Repository<A> for EventSourcedRepository<A, S, P>
where
    A: Aggregate + 'static,
    S: EventStore,
    P: SnapshotStore,
{
    #[tracing::instrument(skip(self), fields(aggregate_type = %A::aggregate_type()))]
    async fn find_by_id(&self, id: &A::Id) -> Result<A, DomainError> {
        let aggregate_id: AggregateId = id.clone().into();
        let (state, version) = self
            .load(&aggregate_id, None)
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        Ok(A::from_snapshot(id.clone(), state, version))
    }

    #[tracing::instrument(skip(self), fields(aggregate_type = %A::aggregate_type()))]
    async fn find_by_id_at_version(
        &self,
        id: &A::Id,
        version: Version,
    ) -> Result<A, DomainError> {
        let aggregate_id: AggregateId = id.clone().into();
        let (state, reached) = self
            .load(&aggregate_id, Some(version))
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        if reached != version {
            return Err(DomainError::VersionNotFound {
                aggregate_type: A::aggregate_type(),
                aggregate_id: id.to_string(),
                requested: version.as_i64(),
                current: reached.as_i64(),
            });
        }
        Ok(A::from_snapshot(id.clone(), state, version))
    }

    #[tracing::instrument(skip(self, aggregate), fields(aggregate_type = %A::aggregate_type(), aggregate_id = %aggregate.id()))]
    async fn save(&self, aggregate: &mut A) -> Result<Version, DomainError> {
        let expected = aggregate.version();
        let pending = aggregate.get_uncommitted_events();
        if pending.is_empty() {
            return Ok(expected);
        }

        let envelopes = pending
            .iter()
            .map(RecordedEvent::to_envelope)
            .collect::<Result<Vec<_>, _>>()?;
        let aggregate_id = aggregate.aggregate_id();

        let new_version = self
            .events
            .append(&aggregate_id, A::aggregate_type(), envelopes, Some(expected))
            .await?;
        aggregate.mark_events_as_committed(new_version);

        tracing::info!(
            %aggregate_id,
            version = %new_version,
            events = pending.len(),
            "aggregate saved"
        );

        if self.policy.should_snapshot(expected, new_version)
            && let Err(e) = self.save_snapshot(aggregate).await
        {
            tracing::warn!(%aggregate_id, version = %new_version, error = %e, "snapshot write failed");
        }

        Ok(new_version)
    }

    async fn exists(&self, id: &A::Id) -> Result<bool, DomainError> {
        let aggregate_id: AggregateId = id.clone().into();
        Ok(self.events.exists(&aggregate_id).await?)
    }
}

#[async_trait]
impl<S, P> GameRepository for EventSourcedRepository<Game, S, P>
where
    S: EventStore,
    P: SnapshotStore,
{
}

#[async_trait]
impl<S, P> TeamLineupRepository for EventSourcedRepository<TeamLineup, S, P>
where
    S: EventStore,
    P: SnapshotStore,
{
    #[tracing::instrument(skip(self))]
    async fn find_by_game_id_and_side(
        &self,
        game_id: &GameId,
        side: TeamSide,
    ) -> Result<Option<TeamLineup>, DomainError> {
        let events = self.events.get_events_by_game_id(game_id).await?;
        for stored in events
            .into_iter()
            .filter(|e| e.event_type == "TeamLineupCreated")
        {
            let aggregate_id = stored.aggregate_id.clone();
            let recorded = RecordedEvent::<TeamLineupEvent>::from_stored(stored)?;
            if let TeamLineupEvent::TeamLineupCreated(data) = recorded.event
                && data.side == side
            {
                let id = TeamLineupId::new(aggregate_id.as_str())?;
                return self.find_by_id(&id).await.map(Some);
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl<S, P> InningStateRepository for EventSourcedRepository<InningState, S, P>
where
    S: EventStore,
    P: SnapshotStore,
{
    #[tracing::instrument(skip(self))]
    async fn find_current_by_game_id(
        &self,
        game_id: &GameId,
    ) -> Result<Option<InningState>, DomainError> {
        let events = self.events.get_events_by_game_id(game_id).await?;
        let latest = events
            .into_iter()
            .rev()
            .find(|e| e.event_type == "InningStateCreated");
        let Some(stored) = latest else {
            return Ok(None);
        };

        let aggregate_id = stored.aggregate_id.clone();
        let recorded = RecordedEvent::<InningStateEvent>::from_stored(stored)?;
        if !matches!(recorded.event, InningStateEvent::InningStateCreated(_)) {
            return Err(DomainError::CorruptStream {
                aggregate_id: aggregate_id.to_string(),
                reason: "InningStateCreated payload does not match its type".to_string(),
            });
        }
        let id = InningStateId::new(aggregate_id.as_str())?;
        self.find_by_id(&id).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::{InMemoryEventStore, InMemorySnapshotStore};

    type Games = EventSourcedRepository<Game, InMemoryEventStore, InMemorySnapshotStore>;

    fn repo(interval: u64) -> Games {
        EventSourcedRepository::new(
            InMemoryEventStore::new(),
            InMemorySnapshotStore::new(),
            SnapshotPolicy::every(interval),
        )
    }

    fn new_game(id: &str) -> Game {
        Game::create_new(GameId::new(id).unwrap(), "Sluggers", "Bombers").unwrap()
    }

    #[test]
    fn policy_fires_on_boundary_crossing() {
        let policy = SnapshotPolicy::every(10);
        assert!(!policy.should_snapshot(Version::new(0), Version::new(9)));
        assert!(policy.should_snapshot(Version::new(9), Version::new(10)));
        assert!(policy.should_snapshot(Version::new(8), Version::new(12)));
        assert!(!policy.should_snapshot(Version::new(10), Version::new(19)));
        assert!(!SnapshotPolicy::disabled().should_snapshot(Version::new(0), Version::new(100)));
    }

    #[tokio::test]
    async fn save_then_find_round_trips() {
        let repo = repo(0);
        let mut game = new_game("g1");
        game.start_game().unwrap();
        game.add_home_runs(2).unwrap();

        let version = repo.save(&mut game).await.unwrap();
        assert_eq!(version, Version::new(3));
        assert!(!game.has_uncommitted_events());
        assert_eq!(game.version(), version);

        let loaded = repo.find_by_id(game.id()).await.unwrap();
        assert_eq!(loaded.state(), game.state());
        assert_eq!(loaded.version(), version);
    }

    #[tokio::test]
    async fn missing_aggregate_is_not_found() {
        let repo = repo(0);
        let err = repo
            .find_by_id(&GameId::new("nope").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AggregateNotFound { .. }));
    }

    #[tokio::test]
    async fn creating_an_existing_id_conflicts() {
        let repo = repo(0);
        repo.save(&mut new_game("g1")).await.unwrap();

        let err = repo.save(&mut new_game("g1")).await.unwrap_err();
        assert!(err.is_concurrency_conflict());
    }

    #[tokio::test]
    async fn snapshot_is_written_at_interval() {
        let repo = repo(2);
        let mut game = new_game("g1");
        repo.save(&mut game).await.unwrap();
        assert!(repo.snapshot_store().is_empty().await);

        game.start_game().unwrap();
        repo.save(&mut game).await.unwrap();

        let snapshot = repo
            .snapshot_store()
            .load(&game.aggregate_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.version, Version::new(2));
    }

    #[tokio::test]
    async fn truncated_replay_sees_the_past() {
        let repo = repo(0);
        let mut game = new_game("g1");
        game.start_game().unwrap();
        game.add_away_runs(1).unwrap();
        game.add_away_runs(4).unwrap();
        repo.save(&mut game).await.unwrap();

        let past = repo
            .find_by_id_at_version(game.id(), Version::new(3))
            .await
            .unwrap();
        assert_eq!(past.score().get_away_runs(), 1);
        assert_eq!(past.version(), Version::new(3));

        let err = repo
            .find_by_id_at_version(game.id(), Version::new(9))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::VersionNotFound { current: 4, .. }));
    }

    #[tokio::test]
    async fn snapshot_newer_than_target_is_ignored() {
        let repo = repo(1);
        let mut game = new_game("g1");
        repo.save(&mut game).await.unwrap();
        game.start_game().unwrap();
        repo.save(&mut game).await.unwrap();

        let past = repo
            .find_by_id_at_version(game.id(), Version::first())
            .await
            .unwrap();
        assert!(past.status().can_start());
    }

    #[tokio::test]
    async fn unreadable_snapshot_falls_back_to_replay() {
        let repo = repo(0);
        let mut game = new_game("g1");
        game.start_game().unwrap();
        repo.save(&mut game).await.unwrap();

        let bogus = Snapshot::new(
            game.aggregate_id(),
            common::AggregateType::Game,
            Version::new(2),
            serde_json::json!({"not": "a game"}),
        );
        repo.snapshot_store().save(bogus).await.unwrap();

        let loaded = repo.find_by_id(game.id()).await.unwrap();
        assert_eq!(loaded.state(), game.state());
    }

    #[tokio::test]
    async fn snapshot_ahead_of_log_is_ignored() {
        let repo = repo(0);
        let mut game = new_game("g1");
        repo.save(&mut game).await.unwrap();

        let mut ahead = game.state().clone();
        ahead.home_team_name = "Ghosts".to_string();
        let snapshot = Snapshot::capture(
            game.aggregate_id(),
            common::AggregateType::Game,
            Version::new(7),
            &ahead,
        )
        .unwrap();
        repo.snapshot_store().save(snapshot).await.unwrap();

        let loaded = repo.find_by_id(game.id()).await.unwrap();
        assert_eq!(loaded.home_team_name(), "Sluggers");
        assert_eq!(loaded.version(), Version::first());
    }

    #[tokio::test]
    async fn saving_nothing_keeps_version() {
        let repo = repo(0);
        let mut game = new_game("g1");
        let v = repo.save(&mut game).await.unwrap();
        assert_eq!(repo.save(&mut game).await.unwrap(), v);
        assert_eq!(repo.event_store().event_count().await, 1);
    }
}
