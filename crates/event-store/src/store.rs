use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::Stream;

use crate::{
    AggregateId, AggregateType, EventEnvelope, EventQuery, EventStoreError, GameId, Result,
    StoredEvent, Version,
};

/// A stream of stored events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StoredEvent>> + Send>>;

/// Core trait for event store implementations.
///
/// The log is append-only: events are never updated or removed. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of events to one aggregate stream.
    ///
    /// Each event is assigned the next sequential version. The batch is
    /// atomic: either every event is stored or none are. When
    /// `expected_version` is set and differs from the stream's current
    /// version, the call fails with `ConcurrencyConflict`.
    ///
    /// Returns the version of the last event appended.
    async fn append(
        &self,
        aggregate_id: &AggregateId,
        aggregate_type: AggregateType,
        events: Vec<EventEnvelope>,
        expected_version: Option<Version>,
    ) -> Result<Version>;

    /// Retrieves the events of one aggregate in ascending version order.
    ///
    /// With `from_version = Some(v)` only events with a version greater
    /// than `v` are returned, which is the tail to replay on top of a
    /// snapshot taken at `v`.
    async fn get_events(
        &self,
        aggregate_id: &AggregateId,
        from_version: Option<Version>,
    ) -> Result<Vec<StoredEvent>>;

    /// Retrieves events matching a query.
    async fn query_events(&self, query: EventQuery) -> Result<Vec<StoredEvent>>;

    /// Retrieves every event in the store, in global order.
    async fn get_all_events(&self) -> Result<Vec<StoredEvent>>;

    /// Retrieves events of one type, in global order.
    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<StoredEvent>>;

    /// Retrieves events recorded between `from` and `to` (inclusive).
    async fn get_events_by_time_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoredEvent>>;

    /// Retrieves every event of one game across all of its streams.
    async fn get_events_by_game_id(&self, game_id: &GameId) -> Result<Vec<StoredEvent>>;

    /// Streams all events in the store, in global order.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Gets the current version of an aggregate.
    ///
    /// Returns None if the aggregate has no events.
    async fn get_aggregate_version(&self, aggregate_id: &AggregateId) -> Result<Option<Version>>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends a single event.
    async fn append_event(
        &self,
        aggregate_id: &AggregateId,
        aggregate_type: AggregateType,
        event: EventEnvelope,
        expected_version: Option<Version>,
    ) -> Result<Version> {
        self.append(aggregate_id, aggregate_type, vec![event], expected_version)
            .await
    }

    /// Returns true iff at least one event is stored for the aggregate.
    async fn exists(&self, aggregate_id: &AggregateId) -> Result<bool> {
        Ok(self.get_aggregate_version(aggregate_id).await?.is_some())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Validates a batch before any storage is touched.
pub fn validate_events_for_append(events: &[EventEnvelope]) -> Result<()> {
    if events.is_empty() {
        return Err(EventStoreError::InvalidAppend(
            "Cannot append empty event list".to_string(),
        ));
    }

    let first = &events[0];
    for event in events.iter().skip(1) {
        if event.game_id != first.game_id {
            return Err(EventStoreError::InvalidAppend(
                "All events in a batch must belong to the same game".to_string(),
            ));
        }
    }

    if let Some(event) = events.iter().find(|e| e.event_type.trim().is_empty()) {
        return Err(EventStoreError::InvalidAppend(format!(
            "Event {} has an empty event type",
            event.event_id
        )));
    }

    Ok(())
}

/// Checks the optimistic-concurrency guard for one stream.
pub fn check_expected_version(
    aggregate_id: &AggregateId,
    expected: Option<Version>,
    actual: Version,
) -> Result<()> {
    match expected {
        Some(expected) if expected != actual => {
            metrics::counter!("concurrency_conflicts_total").increment(1);
            tracing::debug!(%aggregate_id, %expected, %actual, "append rejected");
            Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: aggregate_id.clone(),
                expected,
                actual,
            })
        }
        _ => Ok(()),
    }
}
