// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The owning context and its dispatch loop.
//!
//! A [`Context`] is the sole mutable state of an engine: the instance
//! registry, the ready and replay queues, the timer list, the observer and the
//! environment outbox. Hosts call [`Context::run_until_idle`] whenever
//! something may have become ready (an external event, a due timer) and sleep
//! until the deadline it returns.
//!
//! # Dispatch
//!
//! Each pass samples the clock, pulls externally posted events, injects due
//! timers in deadline order and then drains replayed saved events ahead of the
//! ready queue. A delivery is offered to its destination's current state
//! route; a matched transition runs exactly once, an unmatched one is routed
//! through the ignore list, the descriptor fallback, the state's save flag and
//! finally the `invalid` diagnostic. Transition functions receive a
//! [`Scope`], never the context, so they can only enqueue work.

use std::collections::VecDeque;
use std::sync::Arc;

use super::address::{Address, InstanceId};
use super::clock::{Clock, MonotonicClock};
use super::descriptor::{ProcessDescriptor, StateIndex};
use super::dump::{HistoryRecord, InstanceDump};
use super::event::{Delivery, Event, Message};
use super::external::{ExternalQueue, ExternalSender};
use super::history::{Disposition, History, HistoryEntry};
use super::instance::Dispatch;
use super::observer::Observer;
use super::registry::{Core, Live, MAX_INSTANCES};
use super::scope::Scope;
use super::timer::{Timer, TimerId};
use crate::config::consts::{DEFAULT_HISTORY_DEPTH, MAX_HISTORY_DEPTH};
use crate::config::{EngineOptions, SmeConfig};
use crate::errors::EngineError;
use crate::observability::messages::engine::{
    ContextCreated, DispatchPassCompleted, EnvironmentDelivery, InstanceReset, TransitionExecuted,
};
use crate::observability::messages::StructuredLog;

type EnvironmentHandler<M> = Box<dyn FnMut(Delivery<M>)>;

pub struct Context<M: Message> {
    core: Core<M>,
    clock: Box<dyn Clock>,
    external: ExternalQueue<M>,
    environment: Option<EnvironmentHandler<M>>,
    outbox: VecDeque<Delivery<M>>,
    /// Deliveries dispatched over the context's lifetime
    dispatched: u64,
}

impl<M: Message> Context<M> {
    /// Create a context with room for `max_instances` live instances, the
    /// default history depth and a monotonic clock.
    pub fn new(max_instances: usize) -> Result<Self, EngineError> {
        ContextBuilder::new(max_instances).build()
    }

    pub fn builder(max_instances: usize) -> ContextBuilder<M> {
        ContextBuilder::new(max_instances)
    }

    /// Create an instance of `descriptor` owning `data`.
    ///
    /// With `run_entry` the descriptor's entry hook runs immediately with the
    /// new instance current. Fails with [`EngineError::Capacity`] when every
    /// slot is taken, leaving the registry untouched.
    pub fn add_instance<D: 'static>(
        &mut self,
        descriptor: &'static ProcessDescriptor<D, M>,
        data: D,
        run_entry: bool,
    ) -> Result<InstanceId, EngineError> {
        self.core.now_ms = self.clock.now_ms();
        let id = self.core.spawn(descriptor, data, None, run_entry)?;
        self.core.apply_pending();
        Ok(id)
    }

    /// Remove an instance and every sub-instance it owns.
    ///
    /// Its pending timers are cancelled and its saved events discarded. Events
    /// still queued for it are dropped when dequeued.
    pub fn terminate_instance(&mut self, id: InstanceId) -> Result<(), EngineError> {
        self.core.terminate(id)
    }

    /// Return an instance to its descriptor's initial state.
    ///
    /// Saved events and the ignore list are cleared, then the reset hook runs
    /// with the instance current. History is kept.
    pub fn reset_instance(&mut self, id: InstanceId) -> Result<(), EngineError> {
        self.core.now_ms = self.clock.now_ms();
        let live = self
            .core
            .registry
            .get_mut(id)
            .ok_or(EngineError::UnknownDestination { id })?;

        let initial = live.shape.initial_state();
        let discarded_saved = live.saved.len();
        live.saved.clear();
        live.ignored.clear();
        let machine = live.machine.take();
        InstanceReset {
            instance: id,
            process: live.shape.process(),
            discarded_saved,
        }
        .log();

        self.core.change_state(id, initial, false);
        if let Some(mut machine) = machine {
            let mut scope = Scope::new(&mut self.core, id);
            machine.reset(&mut scope);
            if let Some(live) = self.core.registry.get_mut(id) {
                live.machine = Some(machine);
            }
        }
        self.core.apply_pending();
        Ok(())
    }

    /// Silently consume unmatched events of `kind` for `id`
    pub fn ignore(&mut self, id: InstanceId, kind: M::Kind) -> Result<(), EngineError> {
        let live = self
            .core
            .registry
            .get_mut(id)
            .ok_or(EngineError::UnknownDestination { id })?;
        if !live.ignored.contains(&kind) {
            live.ignored.push(kind);
        }
        Ok(())
    }

    /// Queue an event from the environment; it is delivered by the next
    /// `run_until_idle`.
    pub fn send(&mut self, destination: impl Into<Address>, message: M) {
        self.core.ready.push(Delivery::Event(Event {
            destination: destination.into(),
            sender: Address::Environment,
            message,
        }));
    }

    /// Arm a timer on behalf of the environment
    pub fn set_timer(
        &mut self,
        destination: impl Into<Address>,
        delay_ms: u64,
        jitter_ms: u64,
        message: M,
    ) -> TimerId<M::Kind> {
        self.core.now_ms = self.clock.now_ms();
        self.core.set_timer(
            destination.into(),
            Address::Environment,
            delay_ms,
            jitter_ms,
            message,
        )
    }

    /// Cancel a timer; `false` when it already fired or was removed
    pub fn remove_timer(&mut self, id: &TimerId<M::Kind>) -> bool {
        self.core.remove_timer(id)
    }

    /// Dispatch until nothing is ready.
    ///
    /// Returns the absolute time (in clock milliseconds) at which the host
    /// should call again for the next timer, or `None` when no timer is
    /// pending.
    pub fn run_until_idle(&mut self) -> Option<u64> {
        let mut delivered = 0;
        let mut timers_fired = 0;

        loop {
            self.core.now_ms = self.clock.now_ms();
            self.external.drain_into(&mut self.core.ready);
            timers_fired += self.core.inject_due_timers();

            if self.core.replay.is_empty() && self.core.ready.is_empty() {
                break;
            }
            while let Some((delivery, replayed)) = self.core.next_delivery() {
                self.deliver(delivery, replayed);
                delivered += 1;
                self.dispatched += 1;
            }
        }

        let next_wakeup_ms = self.core.timers.next_wakeup();
        DispatchPassCompleted {
            delivered,
            timers_fired,
            next_wakeup_ms,
        }
        .log();
        next_wakeup_ms
    }

    fn deliver(&mut self, delivery: Delivery<M>, replayed: bool) {
        let destination = delivery.destination();
        let id = match destination {
            Address::Instance(id) => id,
            Address::Environment => {
                self.deliver_to_environment(delivery);
                return;
            }
        };

        let kind = delivery.kind();
        let Some(live) = self.core.registry.get_mut(id) else {
            self.core.unknown_destination(destination, kind);
            return;
        };
        let Some(mut machine) = live.machine.take() else {
            self.core.unknown_destination(destination, kind);
            return;
        };
        let from_state = live.state;
        let site = live.site();

        self.core.disposition = None;
        let outcome = {
            let mut scope = Scope::new(&mut self.core, id);
            machine.dispatch(from_state, &mut scope, delivery)
        };

        let disposition = match outcome {
            Dispatch::Handled(name) => {
                TransitionExecuted {
                    instance: id,
                    process: site.process,
                    state: site.state_name,
                    kind: &kind,
                    transition: name,
                }
                .log();
                self.core.observe(|o| o.transition(site, kind, name));
                self.core
                    .disposition
                    .take()
                    .unwrap_or(Disposition::Transition(name))
            }
            Dispatch::Unmatched(delivery) => self.core.route_unmatched(id, delivery),
        };

        if let Some(live) = self.core.registry.get_mut(id) {
            live.machine = Some(machine);
        }
        self.core.apply_pending();

        if let Some(live) = self.core.registry.get_mut(id) {
            let to_state = live.state;
            live.history.record(HistoryEntry {
                kind,
                from_state,
                to_state,
                disposition,
                replayed,
            });
        }
    }

    fn deliver_to_environment(&mut self, delivery: Delivery<M>) {
        let kind = delivery.kind();
        EnvironmentDelivery {
            sender: delivery.sender(),
            kind: &kind,
            handled: self.environment.is_some(),
        }
        .log();
        match self.environment.as_mut() {
            Some(handler) => handler(delivery),
            None => self.outbox.push_back(delivery),
        }
    }

    /// Route environment deliveries to `handler` instead of the outbox
    pub fn set_environment_handler(&mut self, handler: impl FnMut(Delivery<M>) + 'static) {
        self.environment = Some(Box::new(handler));
    }

    /// Drain the environment outbox, oldest first
    pub fn take_environment_events(&mut self) -> Vec<Delivery<M>> {
        self.outbox.drain(..).collect()
    }

    pub fn set_observer(&mut self, observer: impl Observer<M::Kind> + 'static) {
        self.core.observer = Some(Box::new(observer));
    }

    /// Handle for posting events from other threads or callbacks
    pub fn external_sender(&self) -> ExternalSender<M> {
        self.external.sender()
    }

    /// Called after every [`ExternalSender::send`]; hosts use it to schedule
    /// a dispatch pass.
    pub fn set_wakeup(&mut self, wakeup: impl Fn() + Send + Sync + 'static) {
        self.external.set_wakeup(Some(Arc::new(wakeup)));
    }

    pub fn clear_wakeup(&mut self) {
        self.external.set_wakeup(None);
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Earliest `deadline + jitter` of all pending timers
    pub fn next_deadline(&self) -> Option<u64> {
        self.core.timers.next_wakeup()
    }

    pub fn pending_timers(&self) -> impl Iterator<Item = &Timer<M::Kind, M>> {
        self.core.timers.iter()
    }

    /// Whether any event is waiting for a dispatch pass
    pub fn has_pending_events(&self) -> bool {
        !self.core.ready.is_empty() || !self.core.replay.is_empty() || self.external.pending() > 0
    }

    /// Total deliveries dispatched since the context was created
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn live_count(&self) -> usize {
        self.core.registry.live_count()
    }

    pub fn capacity(&self) -> usize {
        self.core.registry.capacity()
    }

    pub fn is_live(&self, id: InstanceId) -> bool {
        self.core.registry.get(id).is_some()
    }

    /// Current state index and name of `id`
    pub fn state_of(&self, id: InstanceId) -> Option<(StateIndex, &'static str)> {
        self.core
            .registry
            .get(id)
            .map(|live| (live.state, live.shape.state_name(live.state)))
    }

    pub fn owner_of(&self, id: InstanceId) -> Option<InstanceId> {
        self.core.registry.get(id).and_then(|live| live.owner)
    }

    pub fn children_of(&self, id: InstanceId) -> Vec<InstanceId> {
        self.core
            .registry
            .get(id)
            .map(|live| live.children.clone())
            .unwrap_or_default()
    }

    pub fn history(&self, id: InstanceId) -> Option<&History<M::Kind>> {
        self.core.registry.get(id).map(|live| &live.history)
    }

    /// Serialisable snapshot of one instance
    pub fn dump(&self, id: InstanceId) -> Option<InstanceDump> {
        self.core.registry.get(id).map(dump_live)
    }

    /// Snapshots of every live instance in slot order
    pub fn dump_all(&self) -> Vec<InstanceDump> {
        self.core.registry.iter().map(dump_live).collect()
    }
}

fn dump_live<M: Message>(live: &Live<M>) -> InstanceDump {
    let shape = live.shape;
    let history = live
        .history
        .iter()
        .map(|entry| HistoryRecord {
            kind: format!("{:?}", entry.kind),
            from: shape.state_name(entry.from_state),
            to: shape.state_name(entry.to_state),
            disposition: entry.disposition.to_string(),
            replayed: entry.replayed,
        })
        .collect();

    InstanceDump {
        instance: live.id,
        process: shape.process(),
        state: live.state,
        state_name: shape.state_name(live.state),
        owner: live.owner,
        children: live.children.clone(),
        saved_events: live.saved.len(),
        ignored_kinds: live.ignored.iter().map(|kind| format!("{:?}", kind)).collect(),
        history,
        trace: live.machine.as_ref().and_then(|machine| machine.trace()),
    }
}

/// Builder for a [`Context`] with non-default history depth, clock or observer.
///
/// ```
/// use sme_fsm::engine::{Context, ContextBuilder, ManualClock, Message};
///
/// #[derive(Debug)]
/// struct Ping;
///
/// impl Message for Ping {
///     type Kind = ();
///     fn kind(&self) {}
/// }
///
/// let clock = ManualClock::new(0);
/// let ctx: Context<Ping> = ContextBuilder::new(8)
///     .history_depth(4)
///     .clock(clock.clone())
///     .build()
///     .unwrap();
///
/// assert_eq!(ctx.capacity(), 8);
/// assert_eq!(ctx.live_count(), 0);
/// ```
pub struct ContextBuilder<M: Message> {
    max_instances: usize,
    history_depth: usize,
    clock: Option<Box<dyn Clock>>,
    observer: Option<Box<dyn Observer<M::Kind>>>,
}

impl<M: Message> ContextBuilder<M> {
    pub fn new(max_instances: usize) -> Self {
        Self {
            max_instances,
            history_depth: DEFAULT_HISTORY_DEPTH,
            clock: None,
            observer: None,
        }
    }

    pub fn from_options(options: &EngineOptions) -> Self {
        Self::new(options.max_instances).history_depth(options.history_depth)
    }

    pub fn from_config(cfg: &SmeConfig) -> Self {
        Self::from_options(&cfg.engine)
    }

    pub fn history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn observer(mut self, observer: impl Observer<M::Kind> + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn build(self) -> Result<Context<M>, EngineError> {
        if self.max_instances == 0 {
            return Err(EngineError::Capacity {
                reason: "a context needs room for at least one instance".to_string(),
            });
        }
        if self.max_instances > MAX_INSTANCES {
            return Err(EngineError::unrepresentable(
                self.max_instances,
                MAX_INSTANCES,
            ));
        }

        if self.history_depth == 0 || self.history_depth > MAX_HISTORY_DEPTH {
            return Err(EngineError::HistoryDepth {
                requested: self.history_depth,
                maximum: MAX_HISTORY_DEPTH,
            });
        }

        let mut core = Core::new(self.max_instances, self.history_depth);
        core.observer = self.observer;
        ContextCreated {
            capacity: self.max_instances,
            history_depth: self.history_depth,
        }
        .log();

        Ok(Context {
            core,
            clock: self
                .clock
                .unwrap_or_else(|| Box::new(MonotonicClock::new())),
            external: ExternalQueue::new(),
            environment: None,
            outbox: VecDeque::new(),
            dispatched: 0,
        })
    }
}
