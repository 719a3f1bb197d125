use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Which coordinate of a position could not be located in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RangeErrorKind {
    Line,
    Character,
}

impl fmt::Display for RangeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeErrorKind::Line => write!(f, "Line"),
            RangeErrorKind::Character => write!(f, "Character"),
        }
    }
}

/// Returned when a position points outside of a text buffer.
///
/// Serializes as `{"kind": "Line", "max": 2, "requested": 5}` so the handler
/// can hand it back to the client verbatim as JSON-RPC error data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[error("{kind} access out of range: max={max} requested={requested}")]
pub struct RangeError {
    pub kind: RangeErrorKind,
    pub max: u32,
    pub requested: u32,
}

impl RangeError {
    pub fn line(max: u32, requested: u32) -> Self {
        Self {
            kind: RangeErrorKind::Line,
            max,
            requested,
        }
    }

    pub fn character(max: u32, requested: u32) -> Self {
        Self {
            kind: RangeErrorKind::Character,
            max,
            requested,
        }
    }
}
