use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};

use crate::{AggregateId, AggregateType, GameId, StoredEvent, Version};

/// Filter for [`EventStore::query_events`](crate::EventStore::query_events).
///
/// Every `Some` field narrows the result; bounds are inclusive. Results are
/// always ordered by global position, and `offset`/`limit` apply after
/// filtering.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub aggregate_id: Option<AggregateId>,
    pub aggregate_type: Option<AggregateType>,
    pub game_id: Option<GameId>,

    /// Any of these event types.
    pub event_types: Option<Vec<String>>,

    pub from_version: Option<Version>,
    pub to_version: Option<Version>,

    /// Compared against `occurred_at`.
    pub from_timestamp: Option<DateTime<Utc>>,
    pub to_timestamp: Option<DateTime<Utc>>,

    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl EventQuery {
    /// Events of one stream.
    pub fn for_aggregate(aggregate_id: AggregateId) -> Self {
        Self {
            aggregate_id: Some(aggregate_id),
            ..Default::default()
        }
    }

    /// Events of every stream belonging to one game.
    pub fn for_game(game_id: GameId) -> Self {
        Self {
            game_id: Some(game_id),
            ..Default::default()
        }
    }

    pub fn aggregate_type(mut self, aggregate_type: AggregateType) -> Self {
        self.aggregate_type = Some(aggregate_type);
        self
    }

    /// Adds `event_type` to the accepted types.
    pub fn of_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types
            .get_or_insert_with(Vec::new)
            .push(event_type.into());
        self
    }

    pub fn versions(mut self, range: RangeInclusive<Version>) -> Self {
        let (from, to) = range.into_inner();
        self.from_version = Some(from);
        self.to_version = Some(to);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(from);
        self.to_timestamp = Some(to);
        self
    }

    /// Skips `offset` matches, then returns at most `limit`.
    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    /// True if `event` passes every filter; paging is not considered.
    pub fn matches(&self, event: &StoredEvent) -> bool {
        self.aggregate_id
            .as_ref()
            .is_none_or(|id| &event.aggregate_id == id)
            && self
                .aggregate_type
                .is_none_or(|kind| event.aggregate_type == kind)
            && self.game_id.as_ref().is_none_or(|id| &event.game_id == id)
            && self
                .event_types
                .as_ref()
                .is_none_or(|types| types.contains(&event.event_type))
            && self.from_version.is_none_or(|v| event.version >= v)
            && self.to_version.is_none_or(|v| event.version <= v)
            && self.from_timestamp.is_none_or(|t| event.occurred_at >= t)
            && self.to_timestamp.is_none_or(|t| event.occurred_at <= t)
    }
}
