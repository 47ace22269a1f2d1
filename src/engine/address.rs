// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::fmt;

/// Identity of one live instance.
///
/// The index names a registry slot; the generation is bumped every time the
/// slot is released, so an id held past its instance's termination never
/// resolves to a newer occupant of the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InstanceId {
    index: u16,
    generation: u16,
}

impl InstanceId {
    pub(crate) fn new(index: u16, generation: u16) -> Self {
        Self { index, generation }
    }

    /// Registry slot this id refers to
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.index, self.generation)
    }
}

/// Where an event is going, or where it came from.
///
/// `Environment` is the embedding application: events addressed to it are
/// handed to the environment handler instead of a process, and events sent
/// from outside the dispatch loop carry it as their sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Address {
    Instance(InstanceId),
    Environment,
}

impl Address {
    pub fn instance(&self) -> Option<InstanceId> {
        match self {
            Address::Instance(id) => Some(*id),
            Address::Environment => None,
        }
    }
}

impl From<InstanceId> for Address {
    fn from(id: InstanceId) -> Self {
        Address::Instance(id)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Instance(id) => write!(f, "{}", id),
            Address::Environment => write!(f, "environment"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_generation() {
        let id = InstanceId::new(3, 7);
        assert_eq!(id.to_string(), "3.7");
        assert_eq!(Address::from(id).to_string(), "3.7");
        assert_eq!(Address::Environment.to_string(), "environment");
    }

    #[test]
    fn test_same_slot_different_generation_is_distinct() {
        let first = InstanceId::new(0, 0);
        let reused = InstanceId::new(0, 1);
        assert_ne!(first, reused);
        assert_eq!(first.index(), reused.index());
    }
}
