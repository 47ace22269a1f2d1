// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Cooperative finite-state-machine execution engine.
//!
//! Processes are described by `'static` [`ProcessDescriptor`]s; a [`Context`]
//! owns their running instances, the event and timer queues, and runs every
//! ready event to completion on the calling thread.

pub mod address;
pub mod clock;
pub mod context;
pub mod descriptor;
pub mod dump;
pub mod event;
pub mod external;
pub mod history;
pub(crate) mod instance;
pub mod observer;
pub(crate) mod registry;
pub mod scope;
pub mod timer;
#[cfg(test)]
mod integration_tests;

pub use address::{Address, InstanceId};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use context::{Context, ContextBuilder};
pub use descriptor::{
    Fallback, FallbackHandler, FallbackRoute, Handler, Hook, ProcessDescriptor, Route, StateDef,
    StateIndex, Transition,
};
pub use dump::{HistoryRecord, InstanceDump};
pub use event::{Delivery, Event, EventQueue, Message, TimerFired};
pub use external::ExternalSender;
pub use history::{Disposition, History, HistoryEntry};
pub use observer::{NoopObserver, Observer, Site};
pub use registry::MAX_INSTANCES;
pub use scope::{ParentGuard, Scope};
pub use timer::{Timer, TimerId, TimerList};
