// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Demonstration station management processes.
//!
//! A simulated firmware [`mib`] responder, the reusable
//! [`config_fetch`] sub-process, and a [`connection`] manager that ties them
//! together. They are sample consumers of the engine API used by the binary
//! and the tests, not 802.11 business logic.

pub mod config_fetch;
pub mod connection;
pub mod messages;
pub mod mib;

pub use messages::{MibAttribute, SmeKind, SmeMessage};

use crate::engine::{Context, InstanceId};
use crate::errors::EngineError;

/// Instances created by [`install`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Station {
    pub mib: InstanceId,
    pub connection: InstanceId,
}

/// Create the MIB responder and a connection manager bound to it.
pub fn install(
    ctx: &mut Context<SmeMessage>,
    mib_latency_ms: u64,
    fetch_timeout_ms: u64,
) -> Result<Station, EngineError> {
    let mib = ctx.add_instance(&mib::MIB, mib::MibStore::with_defaults(mib_latency_ms), true)?;
    let connection = ctx.add_instance(
        &connection::CONNECTION,
        connection::Connection::new(mib, fetch_timeout_ms),
        true,
    )?;
    Ok(Station { mib, connection })
}

/// Queue the demonstration requests: connect, disconnect while still
/// configuring, and a second connect that arrives too early.
pub fn script(ctx: &mut Context<SmeMessage>, station: &Station, ssid: &str) {
    ctx.send(
        station.connection,
        SmeMessage::ConnectRequest {
            ssid: ssid.to_string(),
        },
    );
    ctx.send(station.connection, SmeMessage::DisconnectRequest);
    ctx.send(
        station.connection,
        SmeMessage::ConnectRequest {
            ssid: format!("{}-again", ssid),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ContextBuilder, Disposition, ManualClock};

    fn station(latency_ms: u64, timeout_ms: u64) -> (Context<SmeMessage>, ManualClock, Station) {
        let clock = ManualClock::new(0);
        let mut ctx = ContextBuilder::new(8).clock(clock.clone()).build().unwrap();
        let station = install(&mut ctx, latency_ms, timeout_ms).unwrap();
        (ctx, clock, station)
    }

    fn environment(ctx: &mut Context<SmeMessage>) -> Vec<SmeMessage> {
        ctx.take_environment_events()
            .into_iter()
            .map(|delivery| delivery.into_message())
            .collect()
    }

    #[test]
    fn test_disconnect_is_deferred_until_configured() {
        let (mut ctx, clock, station) = station(10, 500);
        script(&mut ctx, &station, "lab");

        assert_eq!(ctx.run_until_idle(), Some(10));
        assert_eq!(
            ctx.state_of(station.connection),
            Some((connection::CONFIGURING, "configuring"))
        );
        assert_eq!(ctx.dump(station.connection).unwrap().saved_events, 1);
        assert_eq!(
            environment(&mut ctx),
            vec![SmeMessage::ConnectRejected {
                ssid: "lab-again".to_string()
            }]
        );

        clock.set(10);
        assert_eq!(ctx.run_until_idle(), None);
        assert_eq!(
            environment(&mut ctx),
            vec![
                SmeMessage::Connected {
                    ssid: "lab".to_string(),
                    rts_threshold: 2347,
                },
                SmeMessage::Disconnected,
            ]
        );
        assert_eq!(
            ctx.state_of(station.connection),
            Some((connection::IDLE, "idle"))
        );
        assert!(ctx.children_of(station.connection).is_empty());
        assert_eq!(ctx.live_count(), 2);

        let history: Vec<_> = ctx
            .history(station.connection)
            .unwrap()
            .iter()
            .copied()
            .collect();
        assert_eq!(
            history
                .iter()
                .filter(|entry| entry.disposition == Disposition::Saved)
                .count(),
            1
        );
        assert!(history
            .iter()
            .any(|entry| entry.replayed && entry.kind == SmeKind::DisconnectRequest));
    }

    #[test]
    fn test_fetch_timeout_reports_failure_and_replays() {
        let (mut ctx, clock, station) = station(0, 200);
        ctx.terminate_instance(station.mib).unwrap();

        ctx.send(
            station.connection,
            SmeMessage::ConnectRequest {
                ssid: "lab".to_string(),
            },
        );
        ctx.send(station.connection, SmeMessage::DisconnectRequest);
        assert_eq!(ctx.run_until_idle(), Some(200));

        clock.set(200);
        assert_eq!(ctx.run_until_idle(), None);
        assert_eq!(
            environment(&mut ctx),
            vec![
                SmeMessage::ConfigurationFailed {
                    attribute: MibAttribute::RtsThreshold
                },
                SmeMessage::Disconnected,
            ]
        );
        assert_eq!(ctx.live_count(), 1);
    }

    #[test]
    fn test_reset_clears_connection() {
        let (mut ctx, _clock, station) = station(0, 200);
        ctx.send(
            station.connection,
            SmeMessage::ConnectRequest {
                ssid: "lab".to_string(),
            },
        );
        ctx.run_until_idle();
        assert_eq!(
            ctx.state_of(station.connection),
            Some((connection::CONNECTED, "connected"))
        );

        ctx.reset_instance(station.connection).unwrap();
        let dump = ctx.dump(station.connection).unwrap();
        assert_eq!(dump.state_name, "idle");
        assert_eq!(dump.trace.as_deref(), Some("ssid=None rts_threshold=None"));
    }
}
