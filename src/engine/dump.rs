// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;

use super::address::InstanceId;
use super::descriptor::StateIndex;

/// Post-mortem snapshot of one instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceDump {
    pub instance: InstanceId,
    pub process: &'static str,
    pub state: StateIndex,
    pub state_name: &'static str,
    pub owner: Option<InstanceId>,
    pub children: Vec<InstanceId>,
    pub saved_events: usize,
    pub ignored_kinds: Vec<String>,
    /// Oldest first
    pub history: Vec<HistoryRecord>,
    /// Output of the descriptor's trace hook
    pub trace: Option<String>,
}

/// History entry with kinds and states rendered for display.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub kind: String,
    pub from: &'static str,
    pub to: &'static str,
    pub disposition: String,
    pub replayed: bool,
}
