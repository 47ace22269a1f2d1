// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the async host driver.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Host loop started driving a context.
///
/// # Log Level
/// `info!`
pub struct HostStarted {
    pub live_instances: usize,
    pub stop_when_quiescent: bool,
    pub idle_timeout_ms: Option<u64>,
}

impl Display for HostStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Host driving {} instances (stop_when_quiescent={}, idle_timeout_ms={:?})",
            self.live_instances, self.stop_when_quiescent, self.idle_timeout_ms
        )
    }
}

impl StructuredLog for HostStarted {
    fn log(&self) {
        tracing::info!(
            live_instances = self.live_instances,
            stop_when_quiescent = self.stop_when_quiescent,
            idle_timeout_ms = ?self.idle_timeout_ms,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "host",
            span_name = name,
            live_instances = self.live_instances,
        )
    }
}

/// Host sleeping until the next timer or an external wakeup.
///
/// # Log Level
/// `trace!`
pub struct HostSleeping {
    pub until_ms: Option<u64>,
    pub now_ms: u64,
}

impl Display for HostSleeping {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.until_ms {
            Some(until) => write!(
                f,
                "Host sleeping {}ms until next timer",
                until.saturating_sub(self.now_ms)
            ),
            None => write!(f, "Host waiting for an external event"),
        }
    }
}

impl StructuredLog for HostSleeping {
    fn log(&self) {
        tracing::trace!(until_ms = ?self.until_ms, now_ms = self.now_ms, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!("host_sleep", span_name = name, now_ms = self.now_ms)
    }
}

/// Host loop returned control to its caller.
///
/// # Log Level
/// `info!`
///
/// # Example
/// ```
/// use sme_fsm::observability::messages::host::HostStopped;
///
/// let msg = HostStopped { reason: "quiescent", passes: 4 };
/// assert_eq!(msg.to_string(), "Host stopped after 4 dispatch passes: quiescent");
/// ```
pub struct HostStopped<'a> {
    pub reason: &'a str,
    pub passes: usize,
}

impl Display for HostStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Host stopped after {} dispatch passes: {}",
            self.passes, self.reason
        )
    }
}

impl StructuredLog for HostStopped<'_> {
    fn log(&self) {
        tracing::info!(reason = self.reason, passes = self.passes, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "host_stopped",
            span_name = name,
            reason = self.reason,
            passes = self.passes,
        )
    }
}
