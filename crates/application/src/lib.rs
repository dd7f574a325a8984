//! Application layer for the scorekeeping core.
//!
//! Use cases coordinate the Game, TeamLineup and InningState aggregates,
//! persist them through the event-sourced repositories, and keep the
//! per-game undo/redo history. Every use case reports through
//! [`ActionResult`].

pub mod config;
pub mod dto;
pub mod error;
pub mod history;
pub mod services;
pub mod use_cases;

pub use config::CoreConfig;
pub use dto::{ActionResult, BasesDto, BatterDto, GameStateDto, LineupSlotDto, PartialFailureDto};
pub use error::{ApplicationError, ErrorKind, Result};
pub use history::{ActionEntry, ActionHistory, ActionKind, AggregateChange};
pub use services::GameServices;
pub use use_cases::{
    EndInning, EndInningCommand, LineupEntryInput, PlayerInput, RecordAtBat, RecordAtBatCommand,
    RedoLastAction, RedoLastActionCommand, StartNewGame, StartNewGameCommand, SubstitutePlayer,
    SubstitutePlayerCommand, UndoLastAction, UndoLastActionCommand,
};
