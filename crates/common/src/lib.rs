//! Identifiers shared by every layer of the scorekeeping core.

mod types;

pub use types::{AggregateId, AggregateType, GameId, IdError, InningStateId, TeamLineupId};
