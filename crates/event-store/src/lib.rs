//! Event store for the scorekeeping core.
//!
//! The store owns the durable, append-only log of every aggregate stream.
//! Snapshots live behind a separate [`SnapshotStore`] port and are only ever
//! a replay hint.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod snapshot;
pub mod store;

pub use common::{AggregateId, AggregateType, GameId};
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, StoredEvent, Version};
pub use memory::{InMemoryEventStore, InMemorySnapshotStore};
pub use postgres::{PostgresEventStore, PostgresSnapshotStore};
pub use query::EventQuery;
pub use snapshot::{Snapshot, SnapshotStore};
pub use store::{EventStore, EventStoreExt, EventStream};
