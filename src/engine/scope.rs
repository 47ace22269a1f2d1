// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The handle transition functions use to act on the engine.
//!
//! A [`Scope`] is created for every transition, entry, reset and fallback
//! invocation. It identifies the *current* instance and exposes everything a
//! transition may do: send events, arm and cancel timers, request state
//! changes, choose a disposition for the delivery it was given, and spawn or
//! terminate instances. It deliberately does not expose the dispatch loop, so
//! a transition can only enqueue work, never run it.
//!
//! # Acting as the parent
//!
//! A sub-instance can temporarily make its owner the current instance with
//! [`Scope::as_parent`] (a guard restored on drop) or
//! [`Scope::call_as_parent`]. Anything done through the guard, including
//! state-change requests and the sender address of outgoing events, is
//! attributed to the parent. This is what lets a small request/response
//! sub-process complete on behalf of whichever parent spawned it.

use std::ops::{Deref, DerefMut};

use super::address::{Address, InstanceId};
use super::descriptor::{ProcessDescriptor, StateIndex};
use super::event::{Delivery, Event, Message};
use super::history::Disposition;
use super::registry::{Core, PendingOp};
use super::timer::TimerId;
use crate::errors::EngineError;
use crate::observability::messages::engine::{
    DispositionKind, EventDisposed, EventError, EventInvalid, NotASubInstance,
};
use crate::observability::messages::StructuredLog;

pub struct Scope<'a, M: Message> {
    core: &'a mut Core<M>,
    current: InstanceId,
}

impl<'a, M: Message> Scope<'a, M> {
    pub(crate) fn new(core: &'a mut Core<M>, current: InstanceId) -> Self {
        Self { core, current }
    }

    /// The instance currently executing (or being acted for)
    pub fn id(&self) -> InstanceId {
        self.current
    }

    /// Owner of the current instance, if it is a sub-instance
    pub fn owner(&self) -> Option<InstanceId> {
        self.core
            .registry
            .get(self.current)
            .and_then(|live| live.owner)
    }

    /// Current state of the current instance
    pub fn state(&self) -> Option<StateIndex> {
        self.core.registry.get(self.current).map(|live| live.state)
    }

    /// Host time sampled at the start of this dispatch pass
    pub fn now_ms(&self) -> u64 {
        self.core.now_ms
    }

    pub fn send(&mut self, destination: impl Into<Address>, message: M) {
        self.core.ready.push(Delivery::Event(Event {
            destination: destination.into(),
            sender: Address::Instance(self.current),
            message,
        }));
    }

    pub fn send_to_self(&mut self, message: M) {
        self.send(self.current, message);
    }

    /// Deliver a result to the embedding application
    pub fn send_to_environment(&mut self, message: M) {
        self.send(Address::Environment, message);
    }

    /// Arm a timer that fires back at the current instance
    pub fn set_timer(&mut self, delay_ms: u64, jitter_ms: u64, message: M) -> TimerId<M::Kind> {
        self.set_timer_for(self.current, delay_ms, jitter_ms, message)
    }

    pub fn set_timer_for(
        &mut self,
        destination: impl Into<Address>,
        delay_ms: u64,
        jitter_ms: u64,
        message: M,
    ) -> TimerId<M::Kind> {
        self.core.set_timer(
            destination.into(),
            Address::Instance(self.current),
            delay_ms,
            jitter_ms,
            message,
        )
    }

    /// Cancel a timer; `false` when it already fired or was removed
    pub fn remove_timer(&mut self, id: &TimerId<M::Kind>) -> bool {
        self.core.remove_timer(id)
    }

    /// Change state once the transition returns and replay the saved queue
    /// against the new state.
    pub fn next_state(&mut self, state: StateIndex) {
        self.core.pending.push(PendingOp::ChangeState {
            instance: self.current,
            state,
            replay_saved: true,
        });
    }

    /// Change state without releasing saved events
    pub fn set_state(&mut self, state: StateIndex) {
        self.core.pending.push(PendingOp::ChangeState {
            instance: self.current,
            state,
            replay_saved: false,
        });
    }

    /// Defer `delivery` until the current instance next changes state
    pub fn save(&mut self, delivery: Delivery<M>) {
        let kind = delivery.kind();
        let Some(live) = self.core.registry.get_mut(self.current) else {
            self.core.unknown_destination(Address::Instance(self.current), kind);
            return;
        };
        let site = live.site();
        live.saved.push(delivery);
        EventDisposed {
            instance: site.instance,
            process: site.process,
            state: site.state_name,
            kind: &kind,
            disposition: DispositionKind::Saved,
        }
        .log();
        self.core.disposition = Some(Disposition::Saved);
        self.core.observe(|o| o.saved(site, kind));
    }

    /// Consume `delivery` without acting on it
    pub fn ignore_event(&mut self, delivery: Delivery<M>) {
        let kind = delivery.kind();
        if let Some(site) = self.core.site(self.current) {
            EventDisposed {
                instance: site.instance,
                process: site.process,
                state: site.state_name,
                kind: &kind,
                disposition: DispositionKind::Ignored,
            }
            .log();
            self.core.observe(|o| o.ignored(site, kind));
        }
        self.core.disposition = Some(Disposition::Ignored);
    }

    /// Consume `delivery` and report it as invalid in the current state
    pub fn invalid(&mut self, delivery: Delivery<M>) {
        let kind = delivery.kind();
        if let Some(site) = self.core.site(self.current) {
            EventInvalid {
                instance: site.instance,
                process: site.process,
                state: site.state_name,
                kind: &kind,
            }
            .log();
            self.core.observe(|o| o.invalid(site, kind));
        }
        self.core.disposition = Some(Disposition::Invalid);
    }

    /// Consume `delivery` and report an error; the instance stays alive
    pub fn error(&mut self, delivery: Delivery<M>, reason: &str) {
        let kind = delivery.kind();
        if let Some(site) = self.core.site(self.current) {
            EventError {
                instance: site.instance,
                process: site.process,
                state: site.state_name,
                kind: &kind,
                reason,
            }
            .log();
            self.core.observe(|o| o.error(site, kind, reason));
        }
        self.core.disposition = Some(Disposition::Error);
    }

    /// Consume events of `kind` silently whenever no transition matches them
    pub fn ignore(&mut self, kind: M::Kind) {
        if let Some(live) = self.core.registry.get_mut(self.current) {
            if !live.ignored.contains(&kind) {
                live.ignored.push(kind);
            }
        }
    }

    pub fn unignore(&mut self, kind: M::Kind) {
        if let Some(live) = self.core.registry.get_mut(self.current) {
            live.ignored.retain(|ignored| *ignored != kind);
        }
    }

    /// Spawn a sub-instance owned by the current instance.
    ///
    /// The child's entry hook runs immediately with the child current. The
    /// child is terminated together with its owner.
    pub fn add_sub_instance<D: 'static>(
        &mut self,
        descriptor: &'static ProcessDescriptor<D, M>,
        data: D,
    ) -> Result<InstanceId, EngineError> {
        self.core.spawn(descriptor, data, Some(self.current), true)
    }

    /// Terminate an instance once the running transition returns
    pub fn terminate(&mut self, id: InstanceId) {
        self.core.pending.push(PendingOp::Terminate { instance: id });
    }

    pub fn terminate_self(&mut self) {
        self.terminate(self.current);
    }

    /// Make the owner of the current instance current until the guard drops.
    ///
    /// Returns `None` when the current instance has no live owner.
    pub fn as_parent(&mut self) -> Option<ParentGuard<'_, 'a, M>> {
        let owner = self.owner().filter(|owner| self.core.registry.get(*owner).is_some());
        match owner {
            Some(owner) => {
                let restore = self.current;
                self.current = owner;
                Some(ParentGuard {
                    scope: self,
                    restore,
                })
            }
            None => {
                if let Some(site) = self.core.site(self.current) {
                    NotASubInstance {
                        instance: site.instance,
                        process: site.process,
                    }
                    .log();
                }
                None
            }
        }
    }

    /// Run `body` with the owner of the current instance as current.
    pub fn call_as_parent<R>(&mut self, body: impl FnOnce(&mut Scope<'a, M>) -> R) -> Option<R> {
        let mut guard = self.as_parent()?;
        Some(body(&mut *guard))
    }
}

/// Restores the previously current instance when dropped.
pub struct ParentGuard<'s, 'a, M: Message> {
    scope: &'s mut Scope<'a, M>,
    restore: InstanceId,
}

impl<'a, M: Message> Deref for ParentGuard<'_, 'a, M> {
    type Target = Scope<'a, M>;

    fn deref(&self) -> &Self::Target {
        self.scope
    }
}

impl<'a, M: Message> DerefMut for ParentGuard<'_, 'a, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.scope
    }
}

impl<M: Message> Drop for ParentGuard<'_, '_, M> {
    fn drop(&mut self) {
        self.scope.current = self.restore;
    }
}
