use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{AggregateId, AggregateType, Result, Version};

/// Serialized aggregate state as of `version`.
///
/// Only a valid starting point when every event after `version` is replayed
/// on top of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub aggregate_id: AggregateId,
    pub aggregate_type: AggregateType,
    pub version: Version,
    pub taken_at: DateTime<Utc>,
    pub state: serde_json::Value,
}

impl Snapshot {
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: AggregateType,
        version: Version,
        state: serde_json::Value,
    ) -> Self {
        Self {
            aggregate_id,
            aggregate_type,
            version,
            taken_at: Utc::now(),
            state,
        }
    }

    /// Serializes `state` into a snapshot stamped with the current time.
    pub fn capture<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: AggregateType,
        version: Version,
        state: &T,
    ) -> std::result::Result<Self, serde_json::Error> {
        let state = serde_json::to_value(state)?;
        Ok(Self::new(aggregate_id, aggregate_type, version, state))
    }

    pub fn decode<T: DeserializeOwned>(self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }
}

/// Keyed storage for aggregate snapshots.
///
/// The store holds no policy: the repository decides when to write. Losing
/// every snapshot only makes loads slower.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Stores a snapshot, replacing any earlier one for the same aggregate.
    async fn save(&self, snapshot: Snapshot) -> Result<()>;

    /// Returns the latest snapshot for an aggregate, if any.
    async fn load(&self, aggregate_id: &AggregateId) -> Result<Option<Snapshot>>;

    /// Removes the snapshot for one aggregate.
    async fn delete(&self, aggregate_id: &AggregateId) -> Result<()>;

    /// Removes every snapshot.
    async fn clear(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Tally {
        home_runs: u32,
        team: String,
    }

    #[test]
    fn capture_then_decode() {
        let id = AggregateId::new("game-1").unwrap();
        let tally = Tally {
            home_runs: 4,
            team: "Sluggers".to_string(),
        };

        let snapshot = Snapshot::capture(id.clone(), AggregateType::Game, Version::new(5), &tally)
            .unwrap();
        assert_eq!(snapshot.aggregate_id, id);
        assert_eq!(snapshot.version, Version::new(5));
        assert_eq!(snapshot.state["home_runs"], 4);

        let decoded: Tally = snapshot.decode().unwrap();
        assert_eq!(decoded, tally);
    }

    #[test]
    fn decode_rejects_foreign_shape() {
        let id = AggregateId::new("game-1").unwrap();
        let snapshot = Snapshot::new(
            id,
            AggregateType::InningState,
            Version::new(2),
            serde_json::json!({"outs": 2}),
        );
        assert!(snapshot.decode::<Tally>().is_err());
    }
}
