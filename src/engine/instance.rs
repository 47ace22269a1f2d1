// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Type erasure between typed descriptors and the heterogeneous registry.
//!
//! The registry holds instances of many process types side by side. Two
//! object-safe traits hide the per-process data type `D`:
//!
//! * [`Shape`] is implemented by the `'static` descriptor itself and answers
//!   questions about states (names, save flag, fallback). The registry keeps a
//!   `&'static dyn Shape` next to each instance so those answers stay
//!   available while the instance is executing.
//! * [`Machine`] owns the typed instance data and runs transitions, entry and
//!   reset hooks against it.
//!
//! The current state index is owned by the registry, not by the machine; the
//! machine receives it for each dispatch.

use super::descriptor::{Fallback, ProcessDescriptor, StateIndex};
use super::event::{Delivery, Message};
use super::scope::Scope;

pub(crate) trait Shape<M: Message> {
    fn process(&self) -> &'static str;
    fn state_count(&self) -> usize;
    fn state_name(&self, state: StateIndex) -> &'static str;
    fn saves_unmatched(&self, state: StateIndex) -> bool;
    fn fallback(&self, kind: M::Kind) -> Option<Fallback<M>>;
    fn initial_state(&self) -> StateIndex;
}

impl<D: 'static, M: Message> Shape<M> for ProcessDescriptor<D, M> {
    fn process(&self) -> &'static str {
        self.name
    }

    fn state_count(&self) -> usize {
        self.states.len()
    }

    fn state_name(&self, state: StateIndex) -> &'static str {
        ProcessDescriptor::state_name(self, state)
    }

    fn saves_unmatched(&self, state: StateIndex) -> bool {
        ProcessDescriptor::saves_unmatched(self, state)
    }

    fn fallback(&self, kind: M::Kind) -> Option<Fallback<M>> {
        ProcessDescriptor::fallback(self, kind)
    }

    fn initial_state(&self) -> StateIndex {
        self.initial_state
    }
}

/// Result of offering a delivery to the current state's route.
pub(crate) enum Dispatch<M: Message> {
    /// A transition ran; carries its name
    Handled(&'static str),
    /// No transition for this kind; the delivery is handed back for routing
    Unmatched(Delivery<M>),
}

pub(crate) trait Machine<M: Message> {
    fn dispatch(
        &mut self,
        state: StateIndex,
        scope: &mut Scope<'_, M>,
        delivery: Delivery<M>,
    ) -> Dispatch<M>;

    fn enter(&mut self, scope: &mut Scope<'_, M>);

    fn reset(&mut self, scope: &mut Scope<'_, M>);

    fn trace(&self) -> Option<String>;
}

/// One running occurrence of a process type.
pub(crate) struct Instance<D: 'static, M: Message> {
    descriptor: &'static ProcessDescriptor<D, M>,
    data: D,
}

impl<D: 'static, M: Message> Instance<D, M> {
    pub(crate) fn new(descriptor: &'static ProcessDescriptor<D, M>, data: D) -> Self {
        Self { descriptor, data }
    }
}

impl<D: 'static, M: Message> Machine<M> for Instance<D, M> {
    fn dispatch(
        &mut self,
        state: StateIndex,
        scope: &mut Scope<'_, M>,
        delivery: Delivery<M>,
    ) -> Dispatch<M> {
        match self.descriptor.transition(state, delivery.kind()) {
            Some(transition) => {
                (transition.handler)(scope, &mut self.data, delivery);
                Dispatch::Handled(transition.name)
            }
            None => Dispatch::Unmatched(delivery),
        }
    }

    fn enter(&mut self, scope: &mut Scope<'_, M>) {
        if let Some(entry) = self.descriptor.entry {
            entry(scope, &mut self.data);
        }
    }

    fn reset(&mut self, scope: &mut Scope<'_, M>) {
        if let Some(reset) = self.descriptor.reset {
            reset(scope, &mut self.data);
        }
    }

    fn trace(&self) -> Option<String> {
        self.descriptor.trace.map(|trace| trace(&self.data))
    }
}
