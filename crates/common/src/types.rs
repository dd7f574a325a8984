use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum length, in characters, of any aggregate identifier.
pub const MAX_ID_LEN: usize = 50;

/// Errors raised when an identifier fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The identifier was empty or whitespace.
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },

    /// The identifier exceeded [`MAX_ID_LEN`] characters.
    #[error("{kind} cannot exceed {MAX_ID_LEN} characters (got {len})")]
    TooLong { kind: &'static str, len: usize },

    /// The aggregate type tag was not recognised.
    #[error("Unknown aggregate type: {0}")]
    UnknownAggregateType(String),
}

fn validate(kind: &'static str, value: &str) -> Result<(), IdError> {
    if value.trim().is_empty() {
        return Err(IdError::Empty { kind });
    }
    let len = value.chars().count();
    if len > MAX_ID_LEN {
        return Err(IdError::TooLong { kind, len });
    }
    Ok(())
}

/// Key under which an event stream is stored.
///
/// Every typed identifier converts into an `AggregateId`; the stores never
/// see the typed wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AggregateId(String);

impl AggregateId {
    /// Creates a validated aggregate ID.
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate("AggregateId", &value)?;
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AggregateId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AggregateId> for String {
    fn from(id: AggregateId) -> Self {
        id.0
    }
}

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a validated identifier (non-empty, at most 50 characters).
            pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                validate(stringify!($name), &value)?;
                Ok(Self(value))
            }

            /// Generates a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<&$name> for AggregateId {
            fn from(id: &$name) -> Self {
                AggregateId(id.0.clone())
            }
        }

        impl From<$name> for AggregateId {
            fn from(id: $name) -> Self {
                AggregateId(id.0)
            }
        }
    };
}

typed_id!(
    /// Identity of a Game aggregate.
    GameId
);

typed_id!(
    /// Identity of a TeamLineup aggregate.
    TeamLineupId
);

typed_id!(
    /// Identity of an InningState aggregate.
    InningStateId
);

/// Tag recorded with every stored event naming the stream's aggregate kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateType {
    Game,
    TeamLineup,
    InningState,
}

impl AggregateType {
    /// Returns the tag as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateType::Game => "Game",
            AggregateType::TeamLineup => "TeamLineup",
            AggregateType::InningState => "InningState",
        }
    }
}

impl std::fmt::Display for AggregateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateType {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Game" => Ok(AggregateType::Game),
            "TeamLineup" => Ok(AggregateType::TeamLineup),
            "InningState" => Ok(AggregateType::InningState),
            other => Err(IdError::UnknownAggregateType(other.to_string())),
        }
    }
}
