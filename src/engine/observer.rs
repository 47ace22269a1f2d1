// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Injected instrumentation callbacks.
//!
//! An [`Observer`] sees every registry change and every dispatch disposition.
//! All methods default to doing nothing, so an observer only implements what
//! it cares about. Observers cannot influence dispatch: they get ids, names
//! and kinds, never the context.

use super::address::{Address, InstanceId};
use super::descriptor::StateIndex;

/// Where something happened: the instance, its process type and current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub instance: InstanceId,
    pub process: &'static str,
    pub state: StateIndex,
    pub state_name: &'static str,
}

pub trait Observer<K> {
    fn instance_created(&mut self, _site: Site, _owner: Option<InstanceId>) {}

    fn instance_terminated(&mut self, _site: Site) {}

    /// A state transition matched and ran
    fn transition(&mut self, _site: Site, _kind: K, _transition: &'static str) {}

    fn state_changed(&mut self, _site: Site, _from: StateIndex, _from_name: &'static str) {}

    fn ignored(&mut self, _site: Site, _kind: K) {}

    fn saved(&mut self, _site: Site, _kind: K) {}

    fn fallback(&mut self, _site: Site, _kind: K, _fallback: &'static str) {}

    /// No transition, no fallback and no save: the event was dropped
    fn invalid(&mut self, _site: Site, _kind: K) {}

    fn error(&mut self, _site: Site, _kind: K, _reason: &str) {}

    fn unknown_destination(&mut self, _destination: Address, _kind: K) {}
}

/// Observer that records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl<K> Observer<K> for NoopObserver {}
