// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Time-ordered timer list.
//!
//! Timers are kept in a vector sorted by deadline. Insertion is a binary
//! search followed by a shift, which is plenty for the tens of timers a
//! station management entity keeps alive at once, and keeps expiry a simple
//! drain from the front.
//!
//! # Identity
//!
//! A process frequently arms several timers of the same kind for the same
//! destination (retry backoff, periodic polls). Each timer therefore carries a
//! [`TimerId`] made of the kind, the destination and a sequence number that
//! increases with every `set`, so removing one of them never removes another.
//!
//! # Jitter
//!
//! A timer with jitter `j` may fire anywhere in `[deadline, deadline + j]`.
//! [`TimerList::next_wakeup`] reports the earliest `deadline + jitter`, and
//! [`TimerList::pop_due`] releases every timer whose deadline has passed, so
//! timers with overlapping windows are delivered in the same dispatch pass.
//!
//! ```rust
//! use sme_fsm::engine::{Address, TimerList};
//!
//! let mut timers: TimerList<&'static str, ()> = TimerList::new();
//! let first = timers.set("retry", Address::Environment, Address::Environment, 100, 0, ());
//! let second = timers.set("retry", Address::Environment, Address::Environment, 100, 0, ());
//!
//! assert_ne!(first, second);
//! assert!(timers.remove(&first));
//! assert!(!timers.remove(&first));
//! assert_eq!(timers.len(), 1);
//! ```

use serde::Serialize;
use std::fmt;

use super::address::Address;

/// Composite identifier of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimerId<K> {
    pub kind: K,
    pub destination: Address,
    pub sequence: u32,
}

impl<K: fmt::Debug> fmt::Display for TimerId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}#{}", self.kind, self.destination, self.sequence)
    }
}

/// A pending timer.
#[derive(Debug)]
pub struct Timer<K, P> {
    pub id: TimerId<K>,
    pub deadline_ms: u64,
    pub jitter_ms: u64,
    pub sender: Address,
    pub payload: P,
}

impl<K, P> Timer<K, P> {
    /// Latest moment the timer is allowed to fire
    pub fn latest_ms(&self) -> u64 {
        self.deadline_ms.saturating_add(self.jitter_ms)
    }
}

/// Deadline-ordered list of pending timers.
#[derive(Debug)]
pub struct TimerList<K, P> {
    timers: Vec<Timer<K, P>>,
    next_sequence: u32,
}

impl<K: Copy + Eq, P> TimerList<K, P> {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Arm a timer firing `deadline_ms` from the list's point of view.
    ///
    /// `deadline_ms` is absolute; callers add the current time themselves.
    pub fn set(
        &mut self,
        kind: K,
        destination: Address,
        sender: Address,
        deadline_ms: u64,
        jitter_ms: u64,
        payload: P,
    ) -> TimerId<K> {
        let id = TimerId {
            kind,
            destination,
            sequence: self.next_sequence,
        };
        self.next_sequence = self.next_sequence.wrapping_add(1);

        // Equal deadlines keep insertion order
        let position = self
            .timers
            .partition_point(|timer| timer.deadline_ms <= deadline_ms);
        self.timers.insert(
            position,
            Timer {
                id,
                deadline_ms,
                jitter_ms,
                sender,
                payload,
            },
        );
        id
    }

    /// Cancel a timer. Returns `false` if it already fired or was removed.
    pub fn remove(&mut self, id: &TimerId<K>) -> bool {
        match self.timers.iter().position(|timer| timer.id == *id) {
            Some(position) => {
                self.timers.remove(position);
                true
            }
            None => false,
        }
    }

    /// Remove and return the earliest timer whose deadline is at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Timer<K, P>> {
        match self.timers.first() {
            Some(timer) if timer.deadline_ms <= now_ms => Some(self.timers.remove(0)),
            _ => None,
        }
    }

    /// Absolute time by which the host must run the dispatch loop again
    pub fn next_wakeup(&self) -> Option<u64> {
        self.timers.iter().map(Timer::latest_ms).min()
    }

    /// Drop every timer addressed to `destination`, returning how many were dropped
    pub fn remove_for(&mut self, destination: Address) -> usize {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.id.destination != destination);
        before - self.timers.len()
    }

    pub fn contains(&self, id: &TimerId<K>) -> bool {
        self.timers.iter().any(|timer| timer.id == *id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timer<K, P>> {
        self.timers.iter()
    }
}

impl<K: Copy + Eq, P> Default for TimerList<K, P> {
    fn default() -> Self {
        Self::new()
    }
}
