// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Instance registry and the engine core shared by the context and scopes.
//!
//! `Core` owns everything a transition function may touch through its
//! [`Scope`]: the registry, the ready and replay queues, the timer list, the
//! observer and the list of deferred registry operations. The context wraps
//! it with the parts transitions must never reach (clock, external queue,
//! environment delivery).
//!
//! Registry changes requested from inside a transition (state changes,
//! terminations) are queued as [`PendingOp`]s and applied once the running
//! transition has returned and its instance is back in its slot.

use super::address::{Address, InstanceId};
use super::descriptor::{ProcessDescriptor, StateIndex};
use super::event::{Delivery, EventQueue, Message, TimerFired};
use super::history::{Disposition, History};
use super::instance::{Instance, Machine, Shape};
use super::observer::{Observer, Site};
use super::scope::Scope;
use super::timer::{TimerId, TimerList};
use crate::errors::EngineError;
use crate::observability::messages::engine::{
    DispositionKind, EventDisposed, EventInvalid, InstanceAdded, InstanceTerminated,
    InvalidStateRequest, RegistryFull, SavedEventsReplayed, StateChanged, TimerRemoved, TimerSet,
    UnknownDestination,
};
use crate::observability::messages::StructuredLog;

/// Largest registry the instance index type can address
pub const MAX_INSTANCES: usize = u16::MAX as usize;

/// Registry change deferred until the running transition returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingOp {
    ChangeState {
        instance: InstanceId,
        state: StateIndex,
        replay_saved: bool,
    },
    Terminate {
        instance: InstanceId,
    },
}

pub(crate) struct Live<M: Message> {
    pub id: InstanceId,
    pub shape: &'static dyn Shape<M>,
    pub state: StateIndex,
    /// `None` only while the instance is executing
    pub machine: Option<Box<dyn Machine<M>>>,
    pub owner: Option<InstanceId>,
    pub children: Vec<InstanceId>,
    pub saved: EventQueue<M>,
    pub ignored: Vec<M::Kind>,
    pub history: History<M::Kind>,
}

impl<M: Message> Live<M> {
    pub fn site(&self) -> Site {
        Site {
            instance: self.id,
            process: self.shape.process(),
            state: self.state,
            state_name: self.shape.state_name(self.state),
        }
    }
}

struct Slot<M: Message> {
    generation: u16,
    live: Option<Live<M>>,
}

/// Fixed-capacity slot array.
pub(crate) struct Registry<M: Message> {
    slots: Vec<Slot<M>>,
    live_count: usize,
}

impl<M: Message> Registry<M> {
    fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                live: None,
            })
            .collect();
        Self {
            slots,
            live_count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    pub fn get(&self, id: InstanceId) -> Option<&Live<M>> {
        self.slots
            .get(id.index())
            .and_then(|slot| slot.live.as_ref())
            .filter(|live| live.id == id)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Live<M>> {
        self.slots
            .get_mut(id.index())
            .and_then(|slot| slot.live.as_mut())
            .filter(|live| live.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Live<M>> {
        self.slots.iter().filter_map(|slot| slot.live.as_ref())
    }

    /// Claim the first free slot
    fn allocate(
        &mut self,
        shape: &'static dyn Shape<M>,
        owner: Option<InstanceId>,
        history_depth: usize,
    ) -> Option<InstanceId> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.live.is_none())?;

        let id = InstanceId::new(index as u16, slot.generation);
        slot.live = Some(Live {
            id,
            shape,
            state: shape.initial_state(),
            machine: None,
            owner,
            children: Vec::new(),
            saved: EventQueue::new(),
            ignored: Vec::new(),
            history: History::new(history_depth),
        });
        self.live_count += 1;
        Some(id)
    }

    /// Free a slot; the generation bump invalidates every copy of `id`
    fn release(&mut self, id: InstanceId) -> Option<Live<M>> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.live.as_ref().map(|live| live.id) != Some(id) {
            return None;
        }
        let live = slot.live.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.live_count -= 1;
        live
    }
}

pub(crate) struct Core<M: Message> {
    pub registry: Registry<M>,
    pub ready: EventQueue<M>,
    /// Saved events released by a state change; drained before `ready`
    pub replay: EventQueue<M>,
    pub timers: TimerList<M::Kind, M>,
    pub pending: Vec<PendingOp>,
    /// Disposition chosen explicitly by the running transition, if any
    pub disposition: Option<Disposition>,
    pub observer: Option<Box<dyn Observer<M::Kind>>>,
    pub history_depth: usize,
    /// Host time sampled at the start of the current pass
    pub now_ms: u64,
}

impl<M: Message> Core<M> {
    pub fn new(capacity: usize, history_depth: usize) -> Self {
        Self {
            registry: Registry::new(capacity),
            ready: EventQueue::new(),
            replay: EventQueue::new(),
            timers: TimerList::new(),
            pending: Vec::new(),
            disposition: None,
            observer: None,
            history_depth,
            now_ms: 0,
        }
    }

    pub fn observe(&mut self, notify: impl FnOnce(&mut dyn Observer<M::Kind>)) {
        if let Some(observer) = self.observer.as_deref_mut() {
            notify(observer);
        }
    }

    pub fn site(&self, id: InstanceId) -> Option<Site> {
        self.registry.get(id).map(Live::site)
    }

    /// Create an instance, optionally running its entry hook with it current.
    pub fn spawn<D: 'static>(
        &mut self,
        descriptor: &'static ProcessDescriptor<D, M>,
        data: D,
        owner: Option<InstanceId>,
        run_entry: bool,
    ) -> Result<InstanceId, EngineError> {
        descriptor
            .validate()
            .map_err(|errors| EngineError::InvalidDescriptor {
                process: descriptor.name,
                errors,
            })?;

        let id = match self
            .registry
            .allocate(descriptor, owner, self.history_depth)
        {
            Some(id) => id,
            None => {
                let capacity = self.registry.capacity();
                RegistryFull {
                    process: descriptor.name,
                    capacity,
                }
                .log();
                return Err(EngineError::registry_full(capacity));
            }
        };

        if let Some(parent) = owner.and_then(|owner| self.registry.get_mut(owner)) {
            parent.children.push(id);
        }

        InstanceAdded {
            instance: id,
            process: descriptor.name,
            owner,
        }
        .log();
        if let Some(site) = self.site(id) {
            self.observe(|o| o.instance_created(site, owner));
        }

        let mut machine: Box<dyn Machine<M>> = Box::new(Instance::new(descriptor, data));
        if run_entry {
            let mut scope = Scope::new(self, id);
            machine.enter(&mut scope);
        }
        if let Some(live) = self.registry.get_mut(id) {
            live.machine = Some(machine);
        }
        Ok(id)
    }

    /// Remove an instance and, recursively, every sub-instance it owns.
    pub fn terminate(&mut self, id: InstanceId) -> Result<(), EngineError> {
        let live = self
            .registry
            .release(id)
            .ok_or(EngineError::UnknownDestination { id })?;

        if let Some(parent) = live.owner.and_then(|owner| self.registry.get_mut(owner)) {
            parent.children.retain(|child| *child != id);
        }
        self.timers.remove_for(Address::Instance(id));

        let site = live.site();
        InstanceTerminated {
            instance: id,
            process: site.process,
            children: live.children.len(),
            discarded_saved: live.saved.len(),
        }
        .log();
        self.observe(|o| o.instance_terminated(site));

        for child in live.children {
            // A child may already be gone if it terminated itself earlier in this pass
            let _ = self.terminate(child);
        }
        Ok(())
    }

    /// Move an instance to `state`; with `replay_saved` its saved queue is
    /// released for redelivery in arrival order.
    pub fn change_state(&mut self, id: InstanceId, state: StateIndex, replay_saved: bool) {
        let Some(live) = self.registry.get_mut(id) else {
            UnknownDestination {
                destination: Address::Instance(id),
                kind: &"state change",
            }
            .log();
            return;
        };

        let state_count = live.shape.state_count();
        if state >= state_count {
            InvalidStateRequest {
                instance: id,
                process: live.shape.process(),
                requested: state,
                state_count,
            }
            .log();
            return;
        }

        let from = live.state;
        let from_name = live.shape.state_name(from);
        live.state = state;
        let site = live.site();

        let mut replayed = 0;
        if replay_saved && !live.saved.is_empty() {
            replayed = live.saved.len();
            self.replay.append(&mut live.saved);
        }

        if from != state {
            StateChanged {
                instance: id,
                process: site.process,
                from: from_name,
                to: site.state_name,
            }
            .log();
            self.observe(|o| o.state_changed(site, from, from_name));
        }
        if replayed > 0 {
            SavedEventsReplayed {
                instance: id,
                process: site.process,
                count: replayed,
            }
            .log();
        }
    }

    /// Apply every deferred registry operation, in request order
    pub fn apply_pending(&mut self) {
        while !self.pending.is_empty() {
            let ops = std::mem::take(&mut self.pending);
            for op in ops {
                match op {
                    PendingOp::ChangeState {
                        instance,
                        state,
                        replay_saved,
                    } => self.change_state(instance, state, replay_saved),
                    PendingOp::Terminate { instance } => {
                        if self.terminate(instance).is_err() {
                            UnknownDestination {
                                destination: Address::Instance(instance),
                                kind: &"terminate",
                            }
                            .log();
                        }
                    }
                }
            }
        }
    }

    /// Route an event the current state has no transition for:
    /// ignore list, then the descriptor fallback, then save, else invalid.
    pub fn route_unmatched(&mut self, id: InstanceId, delivery: Delivery<M>) -> Disposition {
        let kind = delivery.kind();
        let Some(live) = self.registry.get_mut(id) else {
            self.unknown_destination(Address::Instance(id), kind);
            return Disposition::Invalid;
        };
        let site = live.site();
        let shape = live.shape;

        if live.ignored.contains(&kind) {
            EventDisposed {
                instance: id,
                process: site.process,
                state: site.state_name,
                kind: &kind,
                disposition: DispositionKind::Ignored,
            }
            .log();
            self.observe(|o| o.ignored(site, kind));
            return Disposition::Ignored;
        }

        if let Some(fallback) = shape.fallback(kind) {
            EventDisposed {
                instance: id,
                process: site.process,
                state: site.state_name,
                kind: &kind,
                disposition: DispositionKind::Fallback,
            }
            .log();
            self.observe(|o| o.fallback(site, kind, fallback.name));
            self.disposition = None;
            let mut scope = Scope::new(self, id);
            (fallback.handler)(&mut scope, delivery);
            return self
                .disposition
                .take()
                .unwrap_or(Disposition::Fallback(fallback.name));
        }

        if shape.saves_unmatched(site.state) {
            live.saved.push(delivery);
            EventDisposed {
                instance: id,
                process: site.process,
                state: site.state_name,
                kind: &kind,
                disposition: DispositionKind::Saved,
            }
            .log();
            self.observe(|o| o.saved(site, kind));
            return Disposition::Saved;
        }

        EventInvalid {
            instance: id,
            process: site.process,
            state: site.state_name,
            kind: &kind,
        }
        .log();
        self.observe(|o| o.invalid(site, kind));
        Disposition::Invalid
    }

    pub fn unknown_destination(&mut self, destination: Address, kind: M::Kind) {
        UnknownDestination {
            destination,
            kind: &kind,
        }
        .log();
        self.observe(|o| o.unknown_destination(destination, kind));
    }

    pub fn set_timer(
        &mut self,
        destination: Address,
        sender: Address,
        delay_ms: u64,
        jitter_ms: u64,
        message: M,
    ) -> TimerId<M::Kind> {
        let deadline_ms = self.now_ms.saturating_add(delay_ms);
        let id = self.timers.set(
            message.kind(),
            destination,
            sender,
            deadline_ms,
            jitter_ms,
            message,
        );
        TimerSet {
            timer: &id,
            deadline_ms,
            jitter_ms,
        }
        .log();
        id
    }

    pub fn remove_timer(&mut self, id: &TimerId<M::Kind>) -> bool {
        let removed = self.timers.remove(id);
        TimerRemoved { timer: id, removed }.log();
        removed
    }

    /// Move every due timer onto the ready queue in deadline order
    pub fn inject_due_timers(&mut self) -> usize {
        let mut fired = 0;
        while let Some(timer) = self.timers.pop_due(self.now_ms) {
            self.ready.push(Delivery::TimerFired(TimerFired {
                id: timer.id,
                sender: timer.sender,
                message: timer.payload,
            }));
            fired += 1;
        }
        fired
    }

    /// Next delivery to run: replayed saved events take precedence
    pub fn next_delivery(&mut self) -> Option<(Delivery<M>, bool)> {
        if let Some(delivery) = self.replay.pop() {
            return Some((delivery, true));
        }
        self.ready.pop().map(|delivery| (delivery, false))
    }
}
