//! Block positions and ranges.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("Invalid stop position '{0}': expected a block number or '+<offset>'")]
    InvalidStop(String),

    #[error("Invalid range: start {start} is after stop {stop}")]
    StartAfterStop { start: u64, stop: u64 },
}

/// Where a stream stops: an absolute block number, or an offset relative to
/// the start of the session it is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPosition {
    Absolute(u64),
    Relative(u64),
}

impl StopPosition {
    /// Resolve against the start block of the session being opened
    pub fn resolve(&self, session_start: u64) -> u64 {
        match self {
            StopPosition::Absolute(stop) => *stop,
            StopPosition::Relative(offset) => session_start.saturating_add(*offset),
        }
    }

    /// Shift an absolute stop; relative stops move with their session start
    pub fn shift(&self, by: u64) -> Self {
        match self {
            StopPosition::Absolute(stop) => StopPosition::Absolute(stop.saturating_add(by)),
            StopPosition::Relative(offset) => StopPosition::Relative(*offset),
        }
    }
}

impl fmt::Display for StopPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopPosition::Absolute(stop) => write!(f, "{}", stop),
            StopPosition::Relative(offset) => write!(f, "+{}", offset),
        }
    }
}

impl FromStr for StopPosition {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed.strip_prefix('+') {
            Some(offset) => offset.parse().map(StopPosition::Relative),
            None => trimmed.parse().map(StopPosition::Absolute),
        };
        parsed.map_err(|_| PositionError::InvalidStop(s.to_string()))
    }
}

impl Serialize for StopPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StopPosition::Absolute(stop) => serializer.serialize_u64(*stop),
            StopPosition::Relative(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for StopPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(stop) => Ok(StopPosition::Absolute(stop)),
            Raw::Text(text) => text.parse().map_err(D::Error::custom),
        }
    }
}

/// A window of blocks, `start` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRange {
    pub start: u64,
    pub stop: StopPosition,
}

impl PositionRange {
    pub fn new(start: u64, stop: StopPosition) -> Self {
        Self { start, stop }
    }

    pub fn absolute(start: u64, stop: u64) -> Self {
        Self {
            start,
            stop: StopPosition::Absolute(stop),
        }
    }

    /// Absolute stop block of this range
    pub fn resolved_stop(&self) -> u64 {
        self.stop.resolve(self.start)
    }

    /// Ensure `start <= stop` when both ends are absolute
    pub fn validate(&self) -> Result<(), PositionError> {
        match self.stop {
            StopPosition::Absolute(stop) if self.start > stop => Err(PositionError::StartAfterStop {
                start: self.start,
                stop,
            }),
            _ => Ok(()),
        }
    }

    /// Move both ends forward by `by` blocks
    pub fn shift(&self, by: u64) -> Self {
        Self {
            start: self.start.saturating_add(by),
            stop: self.stop.shift(by),
        }
    }
}

impl fmt::Display for PositionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.resolved_stop())
    }
}
