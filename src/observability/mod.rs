// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging.
//!
//! Every log line the crate emits comes from a message struct in
//! [`messages`]. Each struct implements `Display` for the human readable text
//! and [`messages::StructuredLog`] to emit it at a fixed level with its fields
//! attached, so the wording of a diagnostic lives in exactly one place.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - registry, dispatch and timer events
//! * `messages::host` - async host driver lifecycle
//! * `messages::config` - configuration loading and validation
//!
//! The engine's [`Observer`](crate::engine::Observer) hook is separate: it
//! is for programmatic instrumentation, these messages are for humans.
//!
//! # Usage
//!
//! ```rust
//! use sme_fsm::observability::messages::host::HostStopped;
//! use sme_fsm::observability::messages::StructuredLog;
//!
//! let msg = HostStopped {
//!     reason: "cancelled",
//!     passes: 12,
//! };
//!
//! msg.log();
//! tracing::info!("{}", msg);
//! ```

pub mod messages;
