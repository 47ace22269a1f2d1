// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for registry, dispatch and timer events.
//!
//! This module contains message types for logging events related to:
//! * Context creation and instance lifecycle
//! * Transition execution and state changes
//! * Save / ignore / fallback / invalid / error dispositions
//! * Timer arming, cancellation and dispatch passes

use crate::engine::{Address, InstanceId};
use crate::observability::messages::StructuredLog;
use std::fmt::{Debug, Display, Formatter};
use tracing::Span;

/// Context created with a fixed registry capacity.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ContextCreated {
    pub capacity: usize,
    pub history_depth: usize,
}

impl Display for ContextCreated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "FSM context created: capacity={} instances, history_depth={}",
            self.capacity, self.history_depth
        )
    }
}

impl StructuredLog for ContextCreated {
    fn log(&self) {
        tracing::info!(
            capacity = self.capacity,
            history_depth = self.history_depth,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "context",
            span_name = name,
            capacity = self.capacity,
            history_depth = self.history_depth,
        )
    }
}

/// Instance added to the registry.
///
/// # Log Level
/// `debug!` - Lifecycle detail
///
/// # Example
/// ```
/// use sme_fsm::demo::{self, SmeMessage};
/// use sme_fsm::engine::Context;
/// use sme_fsm::observability::messages::engine::InstanceAdded;
///
/// let mut ctx: Context<SmeMessage> = Context::new(2)?;
/// let station = demo::install(&mut ctx, 0, 100)?;
///
/// let msg = InstanceAdded {
///     instance: station.connection,
///     process: "connection_manager",
///     owner: None,
/// };
/// assert_eq!(msg.to_string(), "Added connection_manager instance 1.0");
/// # Ok::<(), sme_fsm::errors::EngineError>(())
/// ```
pub struct InstanceAdded<'a> {
    pub instance: InstanceId,
    pub process: &'a str,
    pub owner: Option<InstanceId>,
}

impl Display for InstanceAdded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match &self.owner {
            Some(owner) => write!(
                f,
                "Added {} sub-instance {} owned by {}",
                self.process, self.instance, owner
            ),
            None => write!(f, "Added {} instance {}", self.process, self.instance),
        }
    }
}

impl StructuredLog for InstanceAdded<'_> {
    fn log(&self) {
        tracing::debug!(
            instance = %self.instance,
            process = self.process,
            owner = ?self.owner.as_ref().map(|o| o.to_string()),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "instance_added",
            span_name = name,
            instance = %self.instance,
            process = self.process,
        )
    }
}

/// `add_instance` refused because every slot is occupied.
///
/// # Log Level
/// `warn!` - Capacity problem the caller must handle
pub struct RegistryFull<'a> {
    pub process: &'a str,
    pub capacity: usize,
}

impl Display for RegistryFull<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cannot add {} instance: all {} registry slots are in use",
            self.process, self.capacity
        )
    }
}

impl StructuredLog for RegistryFull<'_> {
    fn log(&self) {
        tracing::warn!(process = self.process, capacity = self.capacity, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "registry_full",
            span_name = name,
            process = self.process,
            capacity = self.capacity,
        )
    }
}

/// Instance removed from the registry.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct InstanceTerminated<'a> {
    pub instance: InstanceId,
    pub process: &'a str,
    pub children: usize,
    pub discarded_saved: usize,
}

impl Display for InstanceTerminated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Terminated {} instance {} ({} sub-instances, {} saved events discarded)",
            self.process, self.instance, self.children, self.discarded_saved
        )
    }
}

impl StructuredLog for InstanceTerminated<'_> {
    fn log(&self) {
        tracing::debug!(
            instance = %self.instance,
            process = self.process,
            children = self.children,
            discarded_saved = self.discarded_saved,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "instance_terminated",
            span_name = name,
            instance = %self.instance,
            process = self.process,
        )
    }
}

/// Transition function matched and executed.
///
/// # Log Level
/// `trace!` - Emitted for every dispatched event
pub struct TransitionExecuted<'a> {
    pub instance: InstanceId,
    pub process: &'a str,
    pub state: &'a str,
    pub kind: &'a dyn Debug,
    pub transition: &'a str,
}

impl Display for TransitionExecuted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {} in '{}' handled {:?} via '{}'",
            self.process, self.instance, self.state, self.kind, self.transition
        )
    }
}

impl StructuredLog for TransitionExecuted<'_> {
    fn log(&self) {
        tracing::trace!(
            instance = %self.instance,
            process = self.process,
            state = self.state,
            kind = ?self.kind,
            transition = self.transition,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "transition",
            span_name = name,
            instance = %self.instance,
            process = self.process,
            state = self.state,
            kind = ?self.kind,
            transition = self.transition,
        )
    }
}

/// Instance moved to another state.
///
/// # Log Level
/// `debug!` - State machine progress
pub struct StateChanged<'a> {
    pub instance: InstanceId,
    pub process: &'a str,
    pub from: &'a str,
    pub to: &'a str,
}

impl Display for StateChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {} changed state '{}' -> '{}'",
            self.process, self.instance, self.from, self.to
        )
    }
}

impl StructuredLog for StateChanged<'_> {
    fn log(&self) {
        tracing::debug!(
            instance = %self.instance,
            process = self.process,
            from = self.from,
            to = self.to,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "state_changed",
            span_name = name,
            instance = %self.instance,
            process = self.process,
            from = self.from,
            to = self.to,
        )
    }
}

/// How an event that no transition consumed was disposed of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispositionKind {
    Saved,
    Ignored,
    Fallback,
}

impl Display for DispositionKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            DispositionKind::Saved => write!(f, "saved"),
            DispositionKind::Ignored => write!(f, "ignored"),
            DispositionKind::Fallback => write!(f, "handled by fallback"),
        }
    }
}

/// Event saved, ignored or handed to the descriptor's fallback.
///
/// # Log Level
/// `debug!` - Expected protocol behaviour, useful when tracing deferrals
pub struct EventDisposed<'a> {
    pub instance: InstanceId,
    pub process: &'a str,
    pub state: &'a str,
    pub kind: &'a dyn Debug,
    pub disposition: DispositionKind,
}

impl Display for EventDisposed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {} in '{}' {} {:?}",
            self.process, self.instance, self.state, self.disposition, self.kind
        )
    }
}

impl StructuredLog for EventDisposed<'_> {
    fn log(&self) {
        tracing::debug!(
            instance = %self.instance,
            process = self.process,
            state = self.state,
            kind = ?self.kind,
            disposition = %self.disposition,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "event_disposed",
            span_name = name,
            instance = %self.instance,
            process = self.process,
            disposition = %self.disposition,
        )
    }
}

/// Event dropped: no transition, fallback or save applied in the current state.
///
/// # Log Level
/// `warn!` - Usually a protocol bug in the sending process
pub struct EventInvalid<'a> {
    pub instance: InstanceId,
    pub process: &'a str,
    pub state: &'a str,
    pub kind: &'a dyn Debug,
}

impl Display for EventInvalid<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {} dropped {:?}: not handled in state '{}'",
            self.process, self.instance, self.kind, self.state
        )
    }
}

impl StructuredLog for EventInvalid<'_> {
    fn log(&self) {
        tracing::warn!(
            instance = %self.instance,
            process = self.process,
            state = self.state,
            kind = ?self.kind,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "event_invalid",
            span_name = name,
            instance = %self.instance,
            process = self.process,
            state = self.state,
        )
    }
}

/// A transition consumed an event and reported it as an error.
///
/// # Log Level
/// `error!` - The instance stays alive, but something is wrong
pub struct EventError<'a> {
    pub instance: InstanceId,
    pub process: &'a str,
    pub state: &'a str,
    pub kind: &'a dyn Debug,
    pub reason: &'a str,
}

impl Display for EventError<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {} in '{}' rejected {:?}: {}",
            self.process, self.instance, self.state, self.kind, self.reason
        )
    }
}

impl StructuredLog for EventError<'_> {
    fn log(&self) {
        tracing::error!(
            instance = %self.instance,
            process = self.process,
            state = self.state,
            kind = ?self.kind,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "event_error",
            span_name = name,
            instance = %self.instance,
            process = self.process,
            reason = self.reason,
        )
    }
}

/// Event addressed to an instance that is not live.
///
/// # Log Level
/// `warn!` - Dropped, never fatal
///
/// # Example
/// ```
/// use sme_fsm::engine::Address;
/// use sme_fsm::observability::messages::engine::UnknownDestination;
///
/// let msg = UnknownDestination {
///     destination: Address::Environment,
///     kind: &"ConnectCfm",
/// };
///
/// assert!(msg.to_string().contains("environment"));
/// ```
pub struct UnknownDestination<'a> {
    pub destination: Address,
    pub kind: &'a dyn Debug,
}

impl Display for UnknownDestination<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dropped {:?} addressed to {}: no such live instance",
            self.kind, self.destination
        )
    }
}

impl StructuredLog for UnknownDestination<'_> {
    fn log(&self) {
        tracing::warn!(
            destination = %self.destination,
            kind = ?self.kind,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "unknown_destination",
            span_name = name,
            destination = %self.destination,
        )
    }
}

/// Saved events moved back onto the run queue after a state change.
///
/// # Log Level
/// `debug!`
pub struct SavedEventsReplayed<'a> {
    pub instance: InstanceId,
    pub process: &'a str,
    pub count: usize,
}

impl Display for SavedEventsReplayed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Replaying {} saved events for {} {}",
            self.count, self.process, self.instance
        )
    }
}

impl StructuredLog for SavedEventsReplayed<'_> {
    fn log(&self) {
        tracing::debug!(
            instance = %self.instance,
            process = self.process,
            count = self.count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "saved_replay",
            span_name = name,
            instance = %self.instance,
            count = self.count,
        )
    }
}

/// A transition asked for a state index the descriptor does not declare.
///
/// # Log Level
/// `warn!` - Request ignored, instance keeps its state
pub struct InvalidStateRequest<'a> {
    pub instance: InstanceId,
    pub process: &'a str,
    pub requested: usize,
    pub state_count: usize,
}

impl Display for InvalidStateRequest<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {} requested state {} but only {} states exist; request ignored",
            self.process, self.instance, self.requested, self.state_count
        )
    }
}

impl StructuredLog for InvalidStateRequest<'_> {
    fn log(&self) {
        tracing::warn!(
            instance = %self.instance,
            process = self.process,
            requested = self.requested,
            state_count = self.state_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "invalid_state_request",
            span_name = name,
            instance = %self.instance,
            requested = self.requested,
        )
    }
}

/// `call_as_parent` used by an instance that has no owner.
///
/// # Log Level
/// `warn!`
pub struct NotASubInstance<'a> {
    pub instance: InstanceId,
    pub process: &'a str,
}

impl Display for NotASubInstance<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {} tried to act as its parent but has no owner",
            self.process, self.instance
        )
    }
}

impl StructuredLog for NotASubInstance<'_> {
    fn log(&self) {
        tracing::warn!(instance = %self.instance, process = self.process, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "not_a_sub_instance",
            span_name = name,
            instance = %self.instance,
            process = self.process,
        )
    }
}

/// Timer armed.
///
/// # Log Level
/// `trace!`
pub struct TimerSet<'a> {
    pub timer: &'a dyn Display,
    pub deadline_ms: u64,
    pub jitter_ms: u64,
}

impl Display for TimerSet<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Timer {} armed for t={}ms (+{}ms jitter)",
            self.timer, self.deadline_ms, self.jitter_ms
        )
    }
}

impl StructuredLog for TimerSet<'_> {
    fn log(&self) {
        tracing::trace!(
            timer = %self.timer,
            deadline_ms = self.deadline_ms,
            jitter_ms = self.jitter_ms,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!("timer_set", span_name = name, timer = %self.timer)
    }
}

/// Timer cancellation requested; `removed` is false when the id was unknown.
///
/// # Log Level
/// `trace!` when removed, `debug!` when the timer had already fired or been removed
pub struct TimerRemoved<'a> {
    pub timer: &'a dyn Display,
    pub removed: bool,
}

impl Display for TimerRemoved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.removed {
            write!(f, "Timer {} cancelled", self.timer)
        } else {
            write!(
                f,
                "Timer {} not pending (already fired or cancelled); nothing to remove",
                self.timer
            )
        }
    }
}

impl StructuredLog for TimerRemoved<'_> {
    fn log(&self) {
        if self.removed {
            tracing::trace!(timer = %self.timer, removed = self.removed, "{}", self);
        } else {
            tracing::debug!(timer = %self.timer, removed = self.removed, "{}", self);
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "timer_removed",
            span_name = name,
            timer = %self.timer,
            removed = self.removed,
        )
    }
}

/// Instance returned to its initial state.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct InstanceReset<'a> {
    pub instance: InstanceId,
    pub process: &'a str,
    pub discarded_saved: usize,
}

impl Display for InstanceReset<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reset {} instance {} ({} saved events discarded)",
            self.process, self.instance, self.discarded_saved
        )
    }
}

impl StructuredLog for InstanceReset<'_> {
    fn log(&self) {
        tracing::debug!(
            instance = %self.instance,
            process = self.process,
            discarded_saved = self.discarded_saved,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "instance_reset",
            span_name = name,
            instance = %self.instance,
            process = self.process,
        )
    }
}

/// Event addressed to the embedding application.
///
/// # Log Level
/// `debug!`
pub struct EnvironmentDelivery<'a> {
    pub sender: Address,
    pub kind: &'a dyn Debug,
    /// Passed to a registered handler rather than queued in the outbox
    pub handled: bool,
}

impl Display for EnvironmentDelivery<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let target = if self.handled { "handler" } else { "outbox" };
        write!(
            f,
            "{:?} from {} delivered to the environment {}",
            self.kind, self.sender, target
        )
    }
}

impl StructuredLog for EnvironmentDelivery<'_> {
    fn log(&self) {
        tracing::debug!(
            sender = %self.sender,
            kind = ?self.kind,
            handled = self.handled,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "environment_delivery",
            span_name = name,
            sender = %self.sender,
            kind = ?self.kind,
        )
    }
}

/// `run_until_idle` drained every queue.
///
/// # Log Level
/// `trace!`
pub struct DispatchPassCompleted {
    pub delivered: usize,
    pub timers_fired: usize,
    pub next_wakeup_ms: Option<u64>,
}

impl Display for DispatchPassCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.next_wakeup_ms {
            Some(at) => write!(
                f,
                "Dispatch idle after {} deliveries ({} timers fired); next wakeup at t={}ms",
                self.delivered, self.timers_fired, at
            ),
            None => write!(
                f,
                "Dispatch idle after {} deliveries ({} timers fired); no timers pending",
                self.delivered, self.timers_fired
            ),
        }
    }
}

impl StructuredLog for DispatchPassCompleted {
    fn log(&self) {
        tracing::trace!(
            delivered = self.delivered,
            timers_fired = self.timers_fired,
            next_wakeup_ms = ?self.next_wakeup_ms,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "dispatch_pass",
            span_name = name,
            delivered = self.delivered,
            timers_fired = self.timers_fired,
        )
    }
}
