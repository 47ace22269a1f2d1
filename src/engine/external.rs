// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The externally-fed queue: the one engine entry point safe to use from
//! other threads or interrupt-style callbacks.
//!
//! Senders push events into an unbounded tokio channel and then invoke the
//! registered wake-up callback, which tells the host that a dispatch pass is
//! needed. The context owns the receiving half and drains it at the start of
//! every pass.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use super::address::Address;
use super::event::{Delivery, Event, EventQueue, Message};

pub(crate) type Wakeup = Arc<dyn Fn() + Send + Sync>;
type WakeupSlot = Arc<Mutex<Option<Wakeup>>>;

/// Cloneable handle for posting events from outside the dispatch loop.
pub struct ExternalSender<M> {
    tx: mpsc::UnboundedSender<Event<M>>,
    wakeup: WakeupSlot,
}

impl<M> Clone for ExternalSender<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            wakeup: Arc::clone(&self.wakeup),
        }
    }
}

impl<M: Message> ExternalSender<M> {
    /// Queue `message` for `destination` and wake the host.
    ///
    /// The event's sender is the environment. Events posted after the
    /// context is dropped are discarded.
    pub fn send(&self, destination: impl Into<Address>, message: M) {
        let event = Event {
            destination: destination.into(),
            sender: Address::Environment,
            message,
        };
        if self.tx.send(event).is_err() {
            return;
        }

        // Call outside the lock so the callback may post again
        let wakeup = self
            .wakeup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(wakeup) = wakeup {
            wakeup();
        }
    }
}

/// Receiving side of the external channel, owned by the context.
pub(crate) struct ExternalQueue<M> {
    rx: mpsc::UnboundedReceiver<Event<M>>,
    sender: ExternalSender<M>,
}

impl<M: Message> ExternalQueue<M> {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            rx,
            sender: ExternalSender {
                tx,
                wakeup: Arc::new(Mutex::new(None)),
            },
        }
    }

    pub(crate) fn sender(&self) -> ExternalSender<M> {
        self.sender.clone()
    }

    pub(crate) fn set_wakeup(&self, wakeup: Option<Wakeup>) {
        *self
            .sender
            .wakeup
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = wakeup;
    }

    /// Events waiting for the next dispatch pass
    pub(crate) fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Move everything posted so far onto `ready`, in posting order
    pub(crate) fn drain_into(&mut self, ready: &mut EventQueue<M>) -> usize {
        let mut count = 0;
        while let Ok(event) = self.rx.try_recv() {
            ready.push(Delivery::Event(event));
            count += 1;
        }
        count
    }
}
