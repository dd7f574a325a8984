//! Domain layer for the scorekeeping core.
//!
//! This crate provides:
//! - the `Aggregate` and `DomainEvent` traits and the replay fold
//! - the Game, TeamLineup and InningState aggregates with their events
//! - value objects shared by the aggregates
//! - the event-sourced repository and its typed ports

pub mod aggregate;
pub mod error;
pub mod game;
pub mod inning;
pub mod lineup;
pub mod repository;
pub mod value_objects;

pub use aggregate::{
    Aggregate, DomainEvent, RecordedEvent, Restoration, Root, SCHEMA_VERSION, StateRestoredData,
};
pub use error::DomainError;
pub use game::{Game, GameError, GameEvent, GameState, GameStreams};
pub use inning::{AtBatOutcome, InningProgress, InningState, InningStateError, InningStateEvent};
pub use lineup::{IncomingPlayer, TeamLineup, TeamLineupError, TeamLineupEvent, TeamLineupState};
pub use repository::{
    EventSourcedRepository, GameRepository, InningStateRepository, Repository, SnapshotPolicy,
    TeamLineupRepository,
};
pub use value_objects::{
    AtBatResult, Base, BasesState, BattingSlot, FieldPosition, GameEnding, GameStatus,
    JerseyNumber, PlayerId, Score, TeamSide, ValidationError,
};
