//! Tunables of the scorekeeping core.

use domain::SnapshotPolicy;
use serde::{Deserialize, Serialize};

/// Core configuration shared by every use case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Snapshot every N events per aggregate; 0 disables snapshots.
    pub snapshot_interval: u64,

    /// Undoable actions kept per game.
    pub undo_history_limit: usize,

    /// Innings after which a game with a leader is over.
    pub regulation_innings: u32,

    /// Players each side must list when a game starts.
    pub min_batting_order: u8,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: 50,
            undo_history_limit: 50,
            regulation_innings: 7,
            min_batting_order: 9,
        }
    }
}

impl CoreConfig {
    pub fn snapshot_policy(&self) -> SnapshotPolicy {
        SnapshotPolicy::every(self.snapshot_interval)
    }
}
