// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::Message;

/// Management information base attributes the demo firmware exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MibAttribute {
    RtsThreshold,
    FragmentationThreshold,
    BeaconPeriod,
}

/// Messages exchanged between the station management processes, the
/// simulated firmware and the host application.
#[derive(Debug, Clone, PartialEq)]
pub enum SmeMessage {
    ConnectRequest { ssid: String },
    DisconnectRequest,
    MibGetRequest { attribute: MibAttribute },
    MibGetConfirm { attribute: MibAttribute, value: Option<u32> },
    FetchTimeout,
    ConfigFetched { attribute: MibAttribute, value: Option<u32> },
    Connected { ssid: String, rts_threshold: u32 },
    ConnectRejected { ssid: String },
    ConfigurationFailed { attribute: MibAttribute },
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmeKind {
    ConnectRequest,
    DisconnectRequest,
    MibGetRequest,
    MibGetConfirm,
    FetchTimeout,
    ConfigFetched,
    Connected,
    ConnectRejected,
    ConfigurationFailed,
    Disconnected,
}

impl Message for SmeMessage {
    type Kind = SmeKind;

    fn kind(&self) -> SmeKind {
        match self {
            SmeMessage::ConnectRequest { .. } => SmeKind::ConnectRequest,
            SmeMessage::DisconnectRequest => SmeKind::DisconnectRequest,
            SmeMessage::MibGetRequest { .. } => SmeKind::MibGetRequest,
            SmeMessage::MibGetConfirm { .. } => SmeKind::MibGetConfirm,
            SmeMessage::FetchTimeout => SmeKind::FetchTimeout,
            SmeMessage::ConfigFetched { .. } => SmeKind::ConfigFetched,
            SmeMessage::Connected { .. } => SmeKind::Connected,
            SmeMessage::ConnectRejected { .. } => SmeKind::ConnectRejected,
            SmeMessage::ConfigurationFailed { .. } => SmeKind::ConfigurationFailed,
            SmeMessage::Disconnected => SmeKind::Disconnected,
        }
    }
}
