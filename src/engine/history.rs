// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded per-instance transition history, kept for post-mortem dumps.

use std::collections::VecDeque;
use std::fmt;

use super::descriptor::StateIndex;

/// What the engine did with one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A state transition handled the event
    Transition(&'static str),
    /// The descriptor's shared fallback handled the event
    Fallback(&'static str),
    /// Deferred to the instance's saved queue
    Saved,
    /// Consumed without action
    Ignored,
    /// Dropped as invalid for the current state
    Invalid,
    /// Consumed and reported as an error by the transition
    Error,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Transition(name) => write!(f, "transition:{}", name),
            Disposition::Fallback(name) => write!(f, "fallback:{}", name),
            Disposition::Saved => write!(f, "saved"),
            Disposition::Ignored => write!(f, "ignored"),
            Disposition::Invalid => write!(f, "invalid"),
            Disposition::Error => write!(f, "error"),
        }
    }
}

/// One recorded dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry<K> {
    pub kind: K,
    pub from_state: StateIndex,
    pub to_state: StateIndex,
    pub disposition: Disposition,
    /// The delivery came out of the saved queue after a state change
    pub replayed: bool,
}

/// Ring buffer of the most recent dispatches.
#[derive(Debug, Clone)]
pub struct History<K> {
    entries: VecDeque<HistoryEntry<K>>,
    depth: usize,
}

impl<K> History<K> {
    pub fn new(depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            depth,
        }
    }

    pub fn record(&mut self, entry: HistoryEntry<K>) {
        if self.depth == 0 {
            return;
        }
        if self.entries.len() == self.depth {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry<K>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: u8) -> HistoryEntry<u8> {
        HistoryEntry {
            kind,
            from_state: 0,
            to_state: 0,
            disposition: Disposition::Ignored,
            replayed: false,
        }
    }

    #[test]
    fn test_ring_keeps_most_recent_entries() {
        let mut history = History::new(3);
        for kind in 0..5 {
            history.record(entry(kind));
        }

        let kinds: Vec<u8> = history.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![2, 3, 4]);
    }

    #[test]
    fn test_zero_depth_records_nothing() {
        let mut history = History::new(0);
        history.record(entry(1));
        assert!(history.is_empty());
    }

    #[test]
    fn test_disposition_display() {
        assert_eq!(Disposition::Transition("start").to_string(), "transition:start");
        assert_eq!(Disposition::Saved.to_string(), "saved");
    }
}
