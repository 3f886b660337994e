use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Approach to a junction. The declaration order is the fixed cyclic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Cyclic successor: `(index + 1) mod 4`.
    pub fn successor(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ControlError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "north" => Ok(Direction::North),
            "east" => Ok(Direction::East),
            "south" => Ok(Direction::South),
            "west" => Ok(Direction::West),
            other => Err(ControlError::Parse(format!("unknown direction `{}`", other))),
        }
    }
}

/// Opaque junction identifier taken from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JunctionId(String);

impl JunctionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog entry: display label plus identifier, with optional per-service aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Junction {
    pub label: String,
    pub id: JunctionId,
    /// Identifier understood by the demand feed service, when it differs from `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_alias: Option<String>,
    /// Identifier understood by the signal authority, when it differs from `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_alias: Option<String>,
}

impl Junction {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: JunctionId::new(id),
            feed_alias: None,
            authority_alias: None,
        }
    }

    pub fn feed_key(&self) -> &str {
        self.feed_alias.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn authority_key(&self) -> &str {
        self.authority_alias.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Opaque bearer token attached to authenticated operations.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Error taxonomy for the control core. None of these is fatal to the process.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed payload: {0}")]
    Parse(String),
    #[error("unknown junction `{0}`")]
    UnknownJunction(String),
    #[error("override rejected: {0}")]
    Unauthorized(String),
    #[error("monitoring session is closed")]
    SessionClosed,
}

impl From<reqwest::Error> for ControlError {
    fn from(err: reqwest::Error) -> Self {
        ControlError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ControlError {
    fn from(err: serde_json::Error) -> Self {
        ControlError::Parse(err.to_string())
    }
}

pub type ControlResult<T> = Result<T, ControlError>;
