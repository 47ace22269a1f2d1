// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Simulated firmware MIB responder.
//!
//! Answers every `MibGetRequest` with a `MibGetConfirm` addressed to the
//! requester. With a non-zero latency the confirm is delivered through a timer,
//! which is how the firmware's asynchronous confirm path looks to the SME.

use std::collections::HashMap;

use super::messages::{MibAttribute, SmeKind, SmeMessage};
use crate::engine::{Delivery, ProcessDescriptor, Scope, StateDef, Transition};

pub const SERVING: usize = 0;

#[derive(Debug, Clone, Default)]
pub struct MibStore {
    pub values: HashMap<MibAttribute, u32>,
    /// Delay before a confirm is delivered
    pub latency_ms: u64,
    pub served: u32,
}

impl MibStore {
    /// Store preloaded with typical station defaults
    pub fn with_defaults(latency_ms: u64) -> Self {
        let values = HashMap::from([
            (MibAttribute::RtsThreshold, 2347),
            (MibAttribute::FragmentationThreshold, 2346),
        ]);
        Self {
            values,
            latency_ms,
            served: 0,
        }
    }
}

fn get(scope: &mut Scope<'_, SmeMessage>, store: &mut MibStore, event: Delivery<SmeMessage>) {
    let requester = event.sender();
    let SmeMessage::MibGetRequest { attribute } = event.into_message() else {
        return;
    };
    store.served += 1;

    let confirm = SmeMessage::MibGetConfirm {
        attribute,
        value: store.values.get(&attribute).copied(),
    };
    if store.latency_ms == 0 {
        scope.send(requester, confirm);
    } else {
        scope.set_timer_for(requester, store.latency_ms, 0, confirm);
    }
}

fn serving(kind: SmeKind) -> Option<Transition<MibStore, SmeMessage>> {
    match kind {
        SmeKind::MibGetRequest => Some(Transition::new("get", get)),
        _ => None,
    }
}

fn trace(store: &MibStore) -> String {
    format!("served={} latency_ms={}", store.served, store.latency_ms)
}

pub static MIB: ProcessDescriptor<MibStore, SmeMessage> = ProcessDescriptor {
    name: "mib",
    states: &[StateDef {
        name: "serving",
        save_unmatched: false,
        route: serving,
    }],
    initial_state: SERVING,
    entry: None,
    reset: None,
    unhandled: None,
    trace: Some(trace),
};
