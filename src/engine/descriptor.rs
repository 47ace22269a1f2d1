// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Process descriptors: the immutable definition of one state machine type.
//!
//! A descriptor is plain `'static` data. Each state names a route function
//! that maps a message kind to the transition handling it; process authors
//! write routes as a `match` over their closed kind enumeration, so a state
//! can never list two transitions for one kind and the compiler checks that
//! every kind was considered.
//!
//! ```rust
//! use sme_fsm::engine::{Delivery, Message, ProcessDescriptor, Scope, StateDef, Transition};
//!
//! #[derive(Debug)]
//! enum Msg { Start, Stop }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Kind { Start, Stop }
//!
//! impl Message for Msg {
//!     type Kind = Kind;
//!     fn kind(&self) -> Kind {
//!         match self { Msg::Start => Kind::Start, Msg::Stop => Kind::Stop }
//!     }
//! }
//!
//! const IDLE: usize = 0;
//! const RUNNING: usize = 1;
//!
//! fn start(scope: &mut Scope<'_, Msg>, starts: &mut u32, _event: Delivery<Msg>) {
//!     *starts += 1;
//!     scope.next_state(RUNNING);
//! }
//!
//! fn stop(scope: &mut Scope<'_, Msg>, _starts: &mut u32, _event: Delivery<Msg>) {
//!     scope.next_state(IDLE);
//! }
//!
//! fn idle(kind: Kind) -> Option<Transition<u32, Msg>> {
//!     match kind {
//!         Kind::Start => Some(Transition::new("start", start)),
//!         Kind::Stop => None,
//!     }
//! }
//!
//! fn running(kind: Kind) -> Option<Transition<u32, Msg>> {
//!     match kind {
//!         Kind::Start => None,
//!         Kind::Stop => Some(Transition::new("stop", stop)),
//!     }
//! }
//!
//! static MOTOR: ProcessDescriptor<u32, Msg> = ProcessDescriptor {
//!     name: "motor",
//!     states: &[
//!         StateDef { name: "idle", save_unmatched: false, route: idle },
//!         StateDef { name: "running", save_unmatched: true, route: running },
//!     ],
//!     initial_state: IDLE,
//!     entry: None,
//!     reset: None,
//!     unhandled: None,
//!     trace: None,
//! };
//!
//! assert!(MOTOR.validate().is_ok());
//! ```

use std::collections::HashSet;

use super::event::{Delivery, Message};
use super::scope::Scope;
use crate::errors::DescriptorError;

/// Index of a state within its descriptor's state list
pub type StateIndex = usize;

/// Transition function: runs with the instance current and its data borrowed.
pub type Handler<D, M> = fn(&mut Scope<'_, M>, &mut D, Delivery<M>);

/// Entry and reset hooks
pub type Hook<D, M> = fn(&mut Scope<'_, M>, &mut D);

/// Maps a message kind to the transition that handles it in one state
pub type Route<D, M> = fn(<M as Message>::Kind) -> Option<Transition<D, M>>;

/// Process-independent fallback handler, used for default or diagnostic handling
pub type FallbackHandler<M> = fn(&mut Scope<'_, M>, Delivery<M>);

/// Maps a message kind to the descriptor's shared fallback
pub type FallbackRoute<M> = fn(<M as Message>::Kind) -> Option<Fallback<M>>;

/// A named transition function.
///
/// The name is the transition's identity in history dumps and logs.
pub struct Transition<D, M: Message> {
    pub name: &'static str,
    pub handler: Handler<D, M>,
}

impl<D, M: Message> Transition<D, M> {
    pub const fn new(name: &'static str, handler: Handler<D, M>) -> Self {
        Self { name, handler }
    }
}

impl<D, M: Message> Clone for Transition<D, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D, M: Message> Copy for Transition<D, M> {}

/// A named fallback for events no state handles.
pub struct Fallback<M: Message> {
    pub name: &'static str,
    pub handler: FallbackHandler<M>,
}

impl<M: Message> Fallback<M> {
    pub const fn new(name: &'static str, handler: FallbackHandler<M>) -> Self {
        Self { name, handler }
    }
}

impl<M: Message> Clone for Fallback<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Message> Copy for Fallback<M> {}

/// One state of a process.
pub struct StateDef<D: 'static, M: Message> {
    pub name: &'static str,
    /// Defer events this state has no transition for instead of dropping them
    pub save_unmatched: bool,
    pub route: Route<D, M>,
}

/// Immutable definition of a process type, shared by all of its instances.
pub struct ProcessDescriptor<D: 'static, M: Message> {
    pub name: &'static str,
    pub states: &'static [StateDef<D, M>],
    pub initial_state: StateIndex,
    /// Runs when an instance is created with `run_entry`, and for every sub-instance
    pub entry: Option<Hook<D, M>>,
    /// Runs when an instance is reset back to its initial state
    pub reset: Option<Hook<D, M>>,
    pub unhandled: Option<FallbackRoute<M>>,
    /// Renders instance data for dumps
    pub trace: Option<fn(&D) -> String>,
}

impl<D: 'static, M: Message> ProcessDescriptor<D, M> {
    /// Look up the transition for `kind` in `state`
    pub fn transition(&self, state: StateIndex, kind: M::Kind) -> Option<Transition<D, M>> {
        self.states.get(state).and_then(|def| (def.route)(kind))
    }

    /// Look up the shared fallback for `kind`
    pub fn fallback(&self, kind: M::Kind) -> Option<Fallback<M>> {
        self.unhandled.and_then(|route| route(kind))
    }

    pub fn state_name(&self, state: StateIndex) -> &'static str {
        self.states.get(state).map(|def| def.name).unwrap_or("<invalid>")
    }

    pub fn saves_unmatched(&self, state: StateIndex) -> bool {
        self.states
            .get(state)
            .map(|def| def.save_unmatched)
            .unwrap_or(false)
    }

    /// Check the construction-time invariants, reporting every violation.
    pub fn validate(&self) -> Result<(), Vec<DescriptorError>> {
        let mut errors = Vec::new();

        if self.states.is_empty() {
            errors.push(DescriptorError::NoStates);
        } else if self.initial_state >= self.states.len() {
            errors.push(DescriptorError::InitialStateOutOfRange {
                initial: self.initial_state,
                state_count: self.states.len(),
            });
        }

        let mut seen = HashSet::new();
        for state in self.states {
            if !seen.insert(state.name) {
                errors.push(DescriptorError::DuplicateStateName { name: state.name });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
