// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Async host loop for a [`Context`].
//!
//! The engine itself never sleeps or spawns; something has to call
//! `run_until_idle` whenever work may be ready. [`drive`] does that on a tokio
//! runtime: it runs a pass, then waits for whichever comes first of the next
//! timer deadline, an [`ExternalSender`](crate::engine::ExternalSender)
//! wake-up, cancellation, or the idle timeout.
//!
//! The context is borrowed for the whole run and is not `Send`, so the
//! returned future must be awaited on the task that owns the context (for
//! example directly from `#[tokio::main]`).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::HostOptions;
use crate::engine::{Context, Message};
use crate::observability::messages::host::{HostSleeping, HostStarted, HostStopped};
use crate::observability::messages::StructuredLog;

/// Why [`drive`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No events and no timers were left
    Quiescent,
    /// Nothing was delivered for `idle_timeout_ms`
    IdleTimeout,
    /// The cancellation token fired
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Quiescent => "quiescent",
            StopReason::IdleTimeout => "idle timeout",
            StopReason::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostReport {
    pub stop: StopReason,
    /// Number of `run_until_idle` calls made
    pub passes: usize,
}

/// Drive `ctx` until it goes quiescent, idles out or `cancel` fires.
pub async fn drive<M: Message>(
    ctx: &mut Context<M>,
    options: &HostOptions,
    cancel: CancellationToken,
) -> HostReport {
    let notify = Arc::new(Notify::new());
    let waker = Arc::clone(&notify);
    ctx.set_wakeup(move || waker.notify_one());

    HostStarted {
        live_instances: ctx.live_count(),
        stop_when_quiescent: options.stop_when_quiescent,
        idle_timeout_ms: options.idle_timeout_ms,
    }
    .log();

    let mut passes = 0;
    let mut last_activity = Instant::now();
    let stop = loop {
        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }

        let before = ctx.dispatched();
        let next_wakeup = ctx.run_until_idle();
        passes += 1;
        if ctx.dispatched() > before {
            last_activity = Instant::now();
        }
        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }

        if options.stop_when_quiescent && next_wakeup.is_none() && !ctx.has_pending_events() {
            break StopReason::Quiescent;
        }

        let now_ms = ctx.now_ms();
        HostSleeping {
            until_ms: next_wakeup,
            now_ms,
        }
        .log();
        let timer_delay = next_wakeup.map(|at| Duration::from_millis(at.saturating_sub(now_ms)));
        let idle_deadline = options
            .idle_timeout_ms
            .map(|ms| last_activity + Duration::from_millis(ms));

        tokio::select! {
            _ = cancel.cancelled() => break StopReason::Cancelled,
            _ = notify.notified() => {}
            _ = sleep_for(timer_delay) => {}
            _ = sleep_until(idle_deadline) => break StopReason::IdleTimeout,
        }
    };

    ctx.clear_wakeup();
    HostStopped {
        reason: stop.as_str(),
        passes,
    }
    .log();
    HostReport { stop, passes }
}

async fn sleep_for(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
