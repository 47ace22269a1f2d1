// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Reusable "fetch one configuration item" sub-process.
//!
//! A parent spawns it with [`fetch`]. The child asks the MIB for one
//! attribute, arms a timeout, and when either the confirm or the timeout
//! arrives it runs the parent's completion callback *as the parent* and
//! terminates itself. The parent never sees the request/confirm traffic.

use super::messages::{MibAttribute, SmeKind, SmeMessage};
use crate::engine::{
    Delivery, InstanceId, ProcessDescriptor, Scope, StateDef, TimerId, Transition,
};
use crate::errors::EngineError;

pub const WAITING: usize = 0;

/// Runs with the parent current; `None` means the fetch timed out.
pub type Completion = fn(&mut Scope<'_, SmeMessage>, MibAttribute, Option<u32>);

pub struct ConfigFetch {
    pub attribute: MibAttribute,
    pub mib: InstanceId,
    pub timeout_ms: u64,
    pub on_complete: Completion,
    timeout: Option<TimerId<SmeKind>>,
}

/// Spawn a fetch of `attribute` owned by the current instance.
pub fn fetch(
    scope: &mut Scope<'_, SmeMessage>,
    mib: InstanceId,
    attribute: MibAttribute,
    timeout_ms: u64,
    on_complete: Completion,
) -> Result<InstanceId, EngineError> {
    scope.add_sub_instance(
        &CONFIG_FETCH,
        ConfigFetch {
            attribute,
            mib,
            timeout_ms,
            on_complete,
            timeout: None,
        },
    )
}

fn start(scope: &mut Scope<'_, SmeMessage>, fetch: &mut ConfigFetch) {
    scope.send(
        fetch.mib,
        SmeMessage::MibGetRequest {
            attribute: fetch.attribute,
        },
    );
    fetch.timeout = Some(scope.set_timer(fetch.timeout_ms, 0, SmeMessage::FetchTimeout));
}

/// Hand the result to the owner and retire; an ownerless fetch reports
/// the completing event as an error instead.
fn finish(
    scope: &mut Scope<'_, SmeMessage>,
    fetch: &ConfigFetch,
    event: Delivery<SmeMessage>,
    value: Option<u32>,
) {
    let (attribute, on_complete) = (fetch.attribute, fetch.on_complete);
    if scope
        .call_as_parent(|parent| on_complete(parent, attribute, value))
        .is_none()
    {
        scope.error(event, "config fetch has no owner to complete");
    }
    scope.terminate_self();
}

fn confirmed(
    scope: &mut Scope<'_, SmeMessage>,
    fetch: &mut ConfigFetch,
    event: Delivery<SmeMessage>,
) {
    let (attribute, value) = match event.message() {
        SmeMessage::MibGetConfirm { attribute, value } => (*attribute, *value),
        _ => return,
    };
    if attribute != fetch.attribute {
        scope.invalid(event);
        return;
    }
    if let Some(timeout) = fetch.timeout.take() {
        scope.remove_timer(&timeout);
    }
    finish(scope, fetch, event, value);
}

fn timed_out(
    scope: &mut Scope<'_, SmeMessage>,
    fetch: &mut ConfigFetch,
    event: Delivery<SmeMessage>,
) {
    fetch.timeout = None;
    finish(scope, fetch, event, None);
}

fn waiting(kind: SmeKind) -> Option<Transition<ConfigFetch, SmeMessage>> {
    match kind {
        SmeKind::MibGetConfirm => Some(Transition::new("confirmed", confirmed)),
        SmeKind::FetchTimeout => Some(Transition::new("timed_out", timed_out)),
        _ => None,
    }
}

fn trace(fetch: &ConfigFetch) -> String {
    format!(
        "{:?} from mib {} (timer armed: {})",
        fetch.attribute,
        fetch.mib,
        fetch.timeout.is_some()
    )
}

pub static CONFIG_FETCH: ProcessDescriptor<ConfigFetch, SmeMessage> = ProcessDescriptor {
    name: "config_fetch",
    states: &[StateDef {
        name: "waiting",
        save_unmatched: false,
        route: waiting,
    }],
    initial_state: WAITING,
    entry: Some(start),
    reset: None,
    unhandled: None,
    trace: Some(trace),
};
