use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    AggregateId, AggregateType, EventEnvelope, EventQuery, EventStoreError, GameId, Result,
    Snapshot, SnapshotStore, StoredEvent, Version,
    store::{EventStore, EventStream, check_expected_version, validate_events_for_append},
};

/// One aggregate's slice of the log.
#[derive(Debug)]
struct Stream {
    aggregate_type: AggregateType,
    /// Indexes into the log, one per version (index 0 holds version 1).
    positions: Vec<usize>,
}

#[derive(Debug, Default)]
struct Log {
    events: Vec<StoredEvent>,
    streams: HashMap<AggregateId, Stream>,
}

/// In-memory event store implementation for tests and local runs.
///
/// Provides the same guarantees as the PostgreSQL implementation: appends are
/// serialized behind one write lock, so a batch is either fully visible or not
/// at all.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    log: Arc<RwLock<Log>>,
    events_read: Arc<AtomicU64>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.log.read().await.events.len()
    }

    /// Number of stream events handed out by `get_events` and `query_events`
    /// since creation or the last [`reset_read_counter`](Self::reset_read_counter).
    pub fn events_read(&self) -> u64 {
        self.events_read.load(Ordering::Relaxed)
    }

    /// Resets the read counter.
    pub fn reset_read_counter(&self) {
        self.events_read.store(0, Ordering::Relaxed);
    }

    /// Clears all events.
    pub async fn clear(&self) {
        let mut log = self.log.write().await;
        log.events.clear();
        log.streams.clear();
    }

    fn count_read(&self, events: &[StoredEvent]) {
        self.events_read
            .fetch_add(events.len() as u64, Ordering::Relaxed);
    }

    async fn filtered(&self, predicate: impl Fn(&StoredEvent) -> bool) -> Vec<StoredEvent> {
        let log = self.log.read().await;
        log.events.iter().filter(|e| predicate(e)).cloned().collect()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        aggregate_id: &AggregateId,
        aggregate_type: AggregateType,
        events: Vec<EventEnvelope>,
        expected_version: Option<Version>,
    ) -> Result<Version> {
        validate_events_for_append(&events)?;

        let mut log = self.log.write().await;

        let current_version = match log.streams.get(aggregate_id) {
            Some(stream) if stream.aggregate_type != aggregate_type => {
                return Err(EventStoreError::InvalidAppend(format!(
                    "Aggregate {aggregate_id} is a {} stream, not {aggregate_type}",
                    stream.aggregate_type
                )));
            }
            Some(stream) => Version::new(stream.positions.len() as i64),
            None => Version::initial(),
        };

        check_expected_version(aggregate_id, expected_version, current_version)?;

        // Nothing below can fail, so the batch lands whole.
        let stored_at = Utc::now();
        let mut version = current_version;
        let mut positions = Vec::with_capacity(events.len());
        let count = events.len();
        for envelope in events {
            version = version.next();
            let index = log.events.len();
            let stored = StoredEvent::from_envelope(
                envelope,
                aggregate_id.clone(),
                aggregate_type,
                version,
                index as i64 + 1,
                stored_at,
            );
            log.events.push(stored);
            positions.push(index);
        }
        log.streams
            .entry(aggregate_id.clone())
            .or_insert_with(|| Stream {
                aggregate_type,
                positions: Vec::new(),
            })
            .positions
            .extend(positions);

        metrics::counter!("events_appended_total", "aggregate_type" => aggregate_type.as_str())
            .increment(count as u64);

        Ok(version)
    }

    async fn get_events(
        &self,
        aggregate_id: &AggregateId,
        from_version: Option<Version>,
    ) -> Result<Vec<StoredEvent>> {
        let log = self.log.read().await;
        let Some(stream) = log.streams.get(aggregate_id) else {
            return Ok(Vec::new());
        };

        let skip = from_version
            .map(|v| v.as_i64().clamp(0, stream.positions.len() as i64) as usize)
            .unwrap_or(0);
        let events: Vec<StoredEvent> = stream.positions[skip..]
            .iter()
            .map(|&index| log.events[index].clone())
            .collect();

        self.count_read(&events);
        Ok(events)
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<StoredEvent>> {
        let guard = self.log.read().await;
        let log: &Log = &guard;

        // An aggregate filter can walk its own stream instead of the whole log.
        let candidates: Box<dyn Iterator<Item = &StoredEvent> + '_> = match &query.aggregate_id {
            Some(id) => match log.streams.get(id) {
                Some(stream) => Box::new(stream.positions.iter().map(|&i| &log.events[i])),
                None => Box::new(std::iter::empty()),
            },
            None => Box::new(log.events.iter()),
        };

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        let events: Vec<StoredEvent> = candidates
            .filter(|e| query.matches(e))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        self.count_read(&events);
        Ok(events)
    }

    async fn get_all_events(&self) -> Result<Vec<StoredEvent>> {
        Ok(self.log.read().await.events.clone())
    }

    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<StoredEvent>> {
        Ok(self.filtered(|e| e.event_type == event_type).await)
    }

    async fn get_events_by_time_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoredEvent>> {
        Ok(self
            .filtered(|e| e.occurred_at >= from && e.occurred_at <= to)
            .await)
    }

    async fn get_events_by_game_id(&self, game_id: &GameId) -> Result<Vec<StoredEvent>> {
        Ok(self.filtered(|e| &e.game_id == game_id).await)
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.log.read().await.events.clone();
        let stream = stream::iter(events.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }

    async fn get_aggregate_version(&self, aggregate_id: &AggregateId) -> Result<Option<Version>> {
        let log = self.log.read().await;
        Ok(log
            .streams
            .get(aggregate_id)
            .map(|stream| Version::new(stream.positions.len() as i64)))
    }
}

/// In-memory snapshot store.
#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<AggregateId, Snapshot>>>,
}

impl InMemorySnapshotStore {
    /// Creates a new empty snapshot store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored snapshots.
    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    /// Returns true if no snapshots are stored.
    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(snapshot.aggregate_id.clone(), snapshot);
        Ok(())
    }

    async fn load(&self, aggregate_id: &AggregateId) -> Result<Option<Snapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(aggregate_id).cloned())
    }

    async fn delete(&self, aggregate_id: &AggregateId) -> Result<()> {
        self.snapshots.write().await.remove(aggregate_id);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.snapshots.write().await.clear();
        Ok(())
    }
}
