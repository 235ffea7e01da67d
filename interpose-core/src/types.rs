//! Identity types shared across the engine

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;

/// Selective interceptor identifier
///
/// Returned when a pattern-gated handler is added to a registry and used
/// to remove it again. Identifiers are unique within one registry only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectiveId(pub u64);

impl fmt::Display for SelectiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sel:{}", self.0)
    }
}

/// Monotonic id source owned by a single registry
#[derive(Debug)]
pub(crate) struct IdCounter(Cell<u64>);

impl IdCounter {
    pub(crate) fn new() -> Self {
        Self(Cell::new(1))
    }

    pub(crate) fn next(&self) -> SelectiveId {
        let id = self.0.get();
        self.0.set(id + 1);
        SelectiveId(id)
    }
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::new()
    }
}
