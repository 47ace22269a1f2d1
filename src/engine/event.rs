// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Event envelopes and the FIFO queues that carry them.
//!
//! Everything the dispatch loop moves around is a [`Delivery`]: either an
//! ordinary [`Event`] sent by a process or the environment, or a
//! [`TimerFired`] produced when a timer expires. Queues own their deliveries;
//! ownership moves to the transition function that consumes one.

use std::collections::VecDeque;
use std::fmt::Debug;

use super::address::Address;
use super::timer::TimerId;

/// Application message carried by events.
///
/// Every process sharing a context speaks the same message type. `Kind` is a
/// closed, fieldless enumeration of message kinds that state routes match on.
pub trait Message: 'static {
    type Kind: Copy + Eq + Debug + 'static;

    fn kind(&self) -> Self::Kind;
}

/// An addressed message.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<M> {
    pub destination: Address,
    pub sender: Address,
    pub message: M,
}

/// A timer that reached its deadline, delivered like an event.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerFired<M: Message> {
    pub id: TimerId<M::Kind>,
    pub sender: Address,
    pub message: M,
}

/// Unit of work on every engine queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<M: Message> {
    Event(Event<M>),
    TimerFired(TimerFired<M>),
}

impl<M: Message> Delivery<M> {
    pub fn kind(&self) -> M::Kind {
        self.message().kind()
    }

    pub fn destination(&self) -> Address {
        match self {
            Delivery::Event(event) => event.destination,
            Delivery::TimerFired(fired) => fired.id.destination,
        }
    }

    pub fn sender(&self) -> Address {
        match self {
            Delivery::Event(event) => event.sender,
            Delivery::TimerFired(fired) => fired.sender,
        }
    }

    pub fn message(&self) -> &M {
        match self {
            Delivery::Event(event) => &event.message,
            Delivery::TimerFired(fired) => &fired.message,
        }
    }

    /// Consume the delivery and keep only its payload
    pub fn into_message(self) -> M {
        match self {
            Delivery::Event(event) => event.message,
            Delivery::TimerFired(fired) => fired.message,
        }
    }

    /// Id of the timer that produced this delivery, if any
    pub fn timer(&self) -> Option<TimerId<M::Kind>> {
        match self {
            Delivery::Event(_) => None,
            Delivery::TimerFired(fired) => Some(fired.id),
        }
    }
}

/// FIFO list of deliveries.
///
/// Used for the ready queue, the replay scratch list and every instance's
/// private saved queue.
#[derive(Debug)]
pub struct EventQueue<M: Message> {
    items: VecDeque<Delivery<M>>,
}

impl<M: Message> EventQueue<M> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub fn push(&mut self, delivery: Delivery<M>) {
        self.items.push_back(delivery);
    }

    pub fn pop(&mut self) -> Option<Delivery<M>> {
        self.items.pop_front()
    }

    /// Move every delivery of `other` to the back of this queue, preserving order
    pub fn append(&mut self, other: &mut EventQueue<M>) {
        self.items.append(&mut other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Delivery<M>> {
        self.items.iter()
    }
}

impl<M: Message> Default for EventQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}
