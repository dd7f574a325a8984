//! Per-game undo and redo stacks.
//!
//! An entry remembers which aggregate versions an action moved between. The
//! log itself is never rewritten: undo and redo append compensating events
//! whose state comes from truncated replay at those versions.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use common::{AggregateId, AggregateType, GameId};
use event_store::Version;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// The user-facing action an entry undoes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    RecordAtBat,
    SubstitutePlayer,
    EndInning,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::RecordAtBat => "record_at_bat",
            ActionKind::SubstitutePlayer => "substitute_player",
            ActionKind::EndInning => "end_inning",
        }
    }
}

/// One aggregate moved from `version_before` to `version_after`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateChange {
    pub aggregate_id: AggregateId,
    pub aggregate_type: AggregateType,
    pub version_before: Version,
    pub version_after: Version,
}

impl std::fmt::Display for AggregateChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} v{}->v{}",
            self.aggregate_type, self.aggregate_id, self.version_before, self.version_after
        )
    }
}

/// A completed action, in the order its aggregates were persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub game_id: GameId,
    pub action: ActionKind,
    pub changes: Vec<AggregateChange>,
    pub recorded_at: DateTime<Utc>,
}

impl ActionEntry {
    pub fn new(game_id: GameId, action: ActionKind, changes: Vec<AggregateChange>) -> Self {
        Self {
            game_id,
            action,
            changes,
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct Stacks {
    undo: VecDeque<ActionEntry>,
    redo: Vec<ActionEntry>,
}

/// Bounded undo stack and redo stack for every game.
#[derive(Debug)]
pub struct ActionHistory {
    limit: usize,
    games: Mutex<HashMap<GameId, Stacks>>,
}

impl ActionHistory {
    /// Keeps at most `limit` undoable entries per game; 0 keeps none.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            games: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Records a new action. Any redoable future of the game is discarded.
    pub async fn record(&self, entry: ActionEntry) {
        let mut games = self.games.lock().await;
        let stacks = games.entry(entry.game_id.clone()).or_default();
        stacks.redo.clear();
        stacks.undo.push_back(entry);
        while stacks.undo.len() > self.limit {
            stacks.undo.pop_front();
        }
    }

    /// Pops the most recent undoable entry.
    pub async fn take_undo(&self, game_id: &GameId) -> Option<ActionEntry> {
        self.games.lock().await.get_mut(game_id)?.undo.pop_back()
    }

    /// Pops the most recently undone entry.
    pub async fn take_redo(&self, game_id: &GameId) -> Option<ActionEntry> {
        self.games.lock().await.get_mut(game_id)?.redo.pop()
    }

    /// Makes an undone entry redoable.
    pub async fn push_redo(&self, entry: ActionEntry) {
        let mut games = self.games.lock().await;
        games.entry(entry.game_id.clone()).or_default().redo.push(entry);
    }

    /// Puts an entry back on the undo stack without touching the redo stack.
    pub async fn push_undo(&self, entry: ActionEntry) {
        let mut games = self.games.lock().await;
        let stacks = games.entry(entry.game_id.clone()).or_default();
        stacks.undo.push_back(entry);
        while stacks.undo.len() > self.limit {
            stacks.undo.pop_front();
        }
    }

    pub async fn can_undo(&self, game_id: &GameId) -> bool {
        self.depths(game_id).await.0 > 0
    }

    pub async fn can_redo(&self, game_id: &GameId) -> bool {
        self.depths(game_id).await.1 > 0
    }

    /// `(undo, redo)` stack depths.
    pub async fn depths(&self, game_id: &GameId) -> (usize, usize) {
        self.games
            .lock()
            .await
            .get(game_id)
            .map_or((0, 0), |stacks| (stacks.undo.len(), stacks.redo.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> GameId {
        GameId::new("game-1").unwrap()
    }

    fn entry(action: ActionKind, after: i64) -> ActionEntry {
        ActionEntry::new(
            game(),
            action,
            vec![AggregateChange {
                aggregate_id: AggregateId::new("inning-1").unwrap(),
                aggregate_type: AggregateType::InningState,
                version_before: Version::new(after - 1),
                version_after: Version::new(after),
            }],
        )
    }

    #[tokio::test]
    async fn undo_then_redo_moves_entries() {
        let history = ActionHistory::new(10);
        history.record(entry(ActionKind::RecordAtBat, 2)).await;
        history.record(entry(ActionKind::EndInning, 3)).await;

        let undone = history.take_undo(&game()).await.unwrap();
        assert_eq!(undone.action, ActionKind::EndInning);
        history.push_redo(undone).await;
        assert_eq!(history.depths(&game()).await, (1, 1));

        let redone = history.take_redo(&game()).await.unwrap();
        history.push_undo(redone).await;
        assert_eq!(history.depths(&game()).await, (2, 0));
    }

    #[tokio::test]
    async fn new_action_clears_redo() {
        let history = ActionHistory::new(10);
        history.record(entry(ActionKind::RecordAtBat, 2)).await;
        let undone = history.take_undo(&game()).await.unwrap();
        history.push_redo(undone).await;
        assert!(history.can_redo(&game()).await);

        history.record(entry(ActionKind::SubstitutePlayer, 3)).await;
        assert!(!history.can_redo(&game()).await);
        assert!(history.can_undo(&game()).await);
    }

    #[tokio::test]
    async fn oldest_entries_fall_off() {
        let history = ActionHistory::new(2);
        for after in 2..6 {
            history.record(entry(ActionKind::RecordAtBat, after)).await;
        }
        assert_eq!(history.depths(&game()).await, (2, 0));

        let newest = history.take_undo(&game()).await.unwrap();
        assert_eq!(newest.changes[0].version_after, Version::new(5));
    }

    #[tokio::test]
    async fn unknown_game_has_empty_stacks() {
        let history = ActionHistory::new(5);
        let other = GameId::new("other").unwrap();
        assert!(history.take_undo(&other).await.is_none());
        assert!(!history.can_undo(&other).await);
        assert_eq!(history.depths(&other).await, (0, 0));
    }
}
