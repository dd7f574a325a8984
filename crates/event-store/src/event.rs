use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AggregateId, AggregateType, GameId};

/// Schema version written for every event produced by this codebase.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Identity assigned to a fact when the domain records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Position of an event inside its aggregate stream.
///
/// Version 0 means "no events yet"; the first stored event is version 1 and
/// every later event increments by exactly one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The version of an empty stream.
    pub fn initial() -> Self {
        Self(0)
    }

    /// The version the first event of a stream receives.
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// An event waiting to be appended.
///
/// The store assigns the aggregate version, the global position and the
/// storage timestamp when the batch is accepted; everything here is fixed by
/// the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier for this event, generated when the fact was recorded.
    pub event_id: EventId,

    /// Discriminant of the domain event (e.g., "ScoreUpdated").
    pub event_type: String,

    /// Payload schema version.
    pub schema_version: u32,

    /// Game the event belongs to, whichever aggregate emitted it.
    pub game_id: GameId,

    /// When the fact was recorded by the domain.
    pub occurred_at: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,

    /// Additional metadata about the event.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EventEnvelope {
    /// A fresh event stamped with a new id, the current time and
    /// [`CURRENT_SCHEMA_VERSION`].
    pub fn new(event_type: impl Into<String>, game_id: GameId, payload: serde_json::Value) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            schema_version: CURRENT_SCHEMA_VERSION,
            game_id,
            occurred_at: Utc::now(),
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Like [`new`](Self::new), serializing `payload` to JSON.
    pub fn from_payload<T: Serialize>(
        event_type: impl Into<String>,
        game_id: GameId,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event_type, game_id, serde_json::to_value(payload)?))
    }

    /// Keeps the id the producer already assigned.
    pub fn with_event_id(mut self, event_id: EventId) -> Self {
        self.event_id = event_id;
        self
    }

    pub fn with_schema_version(mut self, schema_version: u32) -> Self {
        self.schema_version = schema_version;
        self
    }

    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// An event as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: EventId,
    pub event_type: String,
    pub schema_version: u32,

    /// The stream this event belongs to.
    pub aggregate_id: AggregateId,
    pub aggregate_type: AggregateType,

    /// Position inside the stream; gap-free from 1.
    pub version: Version,

    pub game_id: GameId,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub metadata: HashMap<String, serde_json::Value>,

    /// Store-wide insertion order, starting at 1.
    pub global_position: i64,

    /// When the store accepted the event.
    pub stored_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Wraps a pending envelope with the store-assigned fields.
    pub fn from_envelope(
        envelope: EventEnvelope,
        aggregate_id: AggregateId,
        aggregate_type: AggregateType,
        version: Version,
        global_position: i64,
        stored_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: envelope.event_id,
            event_type: envelope.event_type,
            schema_version: envelope.schema_version,
            aggregate_id,
            aggregate_type,
            version,
            game_id: envelope.game_id,
            occurred_at: envelope.occurred_at,
            payload: envelope.payload,
            metadata: envelope.metadata,
            global_position,
            stored_at,
        }
    }
}
