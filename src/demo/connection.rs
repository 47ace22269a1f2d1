// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Connection manager.
//!
//! `Idle` accepts a connect request and fetches the RTS threshold through a
//! [`config_fetch`](super::config_fetch) sub-instance. While `Configuring`,
//! every request except a second connect is saved, so a disconnect that
//! arrives mid-configuration is replayed once the connection is up and tears
//! it down in order. A second connect is rejected by the shared fallback.

use super::config_fetch;
use super::messages::{MibAttribute, SmeKind, SmeMessage};
use crate::engine::{Delivery, Fallback, InstanceId, ProcessDescriptor, Scope, StateDef, Transition};

pub const IDLE: usize = 0;
pub const CONFIGURING: usize = 1;
pub const CONNECTED: usize = 2;

#[derive(Debug, Clone)]
pub struct Connection {
    pub mib: InstanceId,
    pub fetch_timeout_ms: u64,
    pub ssid: Option<String>,
    pub rts_threshold: Option<u32>,
}

impl Connection {
    pub fn new(mib: InstanceId, fetch_timeout_ms: u64) -> Self {
        Self {
            mib,
            fetch_timeout_ms,
            ssid: None,
            rts_threshold: None,
        }
    }
}

/// Completion of the RTS fetch, run as the connection manager
fn rts_fetched(parent: &mut Scope<'_, SmeMessage>, attribute: MibAttribute, value: Option<u32>) {
    parent.send_to_self(SmeMessage::ConfigFetched { attribute, value });
}

fn connect(scope: &mut Scope<'_, SmeMessage>, conn: &mut Connection, event: Delivery<SmeMessage>) {
    let SmeMessage::ConnectRequest { ssid } = event.into_message() else {
        return;
    };
    conn.ssid = Some(ssid.clone());

    match config_fetch::fetch(
        scope,
        conn.mib,
        MibAttribute::RtsThreshold,
        conn.fetch_timeout_ms,
        rts_fetched,
    ) {
        Ok(_) => scope.next_state(CONFIGURING),
        Err(_) => {
            conn.ssid = None;
            scope.send_to_environment(SmeMessage::ConnectRejected { ssid });
        }
    }
}

fn configured(scope: &mut Scope<'_, SmeMessage>, conn: &mut Connection, event: Delivery<SmeMessage>) {
    let SmeMessage::ConfigFetched { attribute, value } = event.into_message() else {
        return;
    };
    match value {
        Some(rts_threshold) => {
            conn.rts_threshold = Some(rts_threshold);
            let ssid = conn.ssid.clone().unwrap_or_default();
            scope.send_to_environment(SmeMessage::Connected {
                ssid,
                rts_threshold,
            });
            scope.next_state(CONNECTED);
        }
        None => {
            conn.ssid = None;
            scope.send_to_environment(SmeMessage::ConfigurationFailed { attribute });
            scope.next_state(IDLE);
        }
    }
}

fn disconnect(scope: &mut Scope<'_, SmeMessage>, conn: &mut Connection, _event: Delivery<SmeMessage>) {
    conn.ssid = None;
    conn.rts_threshold = None;
    scope.send_to_environment(SmeMessage::Disconnected);
    scope.next_state(IDLE);
}

fn already_idle(scope: &mut Scope<'_, SmeMessage>, _conn: &mut Connection, _event: Delivery<SmeMessage>) {
    scope.send_to_environment(SmeMessage::Disconnected);
}

fn idle(kind: SmeKind) -> Option<Transition<Connection, SmeMessage>> {
    match kind {
        SmeKind::ConnectRequest => Some(Transition::new("connect", connect)),
        SmeKind::DisconnectRequest => Some(Transition::new("already_idle", already_idle)),
        _ => None,
    }
}

fn configuring(kind: SmeKind) -> Option<Transition<Connection, SmeMessage>> {
    match kind {
        SmeKind::ConfigFetched => Some(Transition::new("configured", configured)),
        _ => None,
    }
}

fn connected(kind: SmeKind) -> Option<Transition<Connection, SmeMessage>> {
    match kind {
        SmeKind::DisconnectRequest => Some(Transition::new("disconnect", disconnect)),
        _ => None,
    }
}

fn reject_connect(scope: &mut Scope<'_, SmeMessage>, event: Delivery<SmeMessage>) {
    if let SmeMessage::ConnectRequest { ssid } = event.into_message() {
        scope.send_to_environment(SmeMessage::ConnectRejected { ssid });
    }
}

fn unhandled(kind: SmeKind) -> Option<Fallback<SmeMessage>> {
    match kind {
        SmeKind::ConnectRequest => Some(Fallback::new("reject_connect", reject_connect)),
        _ => None,
    }
}

fn reset(_scope: &mut Scope<'_, SmeMessage>, conn: &mut Connection) {
    conn.ssid = None;
    conn.rts_threshold = None;
}

fn trace(conn: &Connection) -> String {
    format!("ssid={:?} rts_threshold={:?}", conn.ssid, conn.rts_threshold)
}

pub static CONNECTION: ProcessDescriptor<Connection, SmeMessage> = ProcessDescriptor {
    name: "connection_manager",
    states: &[
        StateDef {
            name: "idle",
            save_unmatched: false,
            route: idle,
        },
        StateDef {
            name: "configuring",
            save_unmatched: true,
            route: configuring,
        },
        StateDef {
            name: "connected",
            save_unmatched: false,
            route: connected,
        },
    ],
    initial_state: IDLE,
    entry: None,
    reset: Some(reset),
    unhandled: Some(unhandled),
    trace: Some(trace),
};
