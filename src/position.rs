//! Position and range value types.
//!
//! Positions are zero-based `(line, character)` pairs where the character
//! offset counts UTF-16 code units, matching the convention of the indexers
//! that produce the bundles. Ranges are half-open and ordered `start <= end`.
//!
//! Both types are immutable values: every translation produces a new one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A zero-based position within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    /// Offset within the line, in UTF-16 code units
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// A half-open range between two positions, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width range collapsed onto one position
    pub fn at(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Whether the range covers `position`. The end is exclusive, but a
    /// zero-width range still covers its own start.
    pub fn contains(&self, position: Position) -> bool {
        position >= self.start && (position < self.end || position == self.start)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
