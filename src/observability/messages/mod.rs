// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human readable line and
//! [`StructuredLog`] to emit it at its documented level with structured
//! fields attached.
//!
//! # Organization
//!
//! * `engine` - registry, dispatch and timer events
//! * `host` - host driver lifecycle
//! * `config` - configuration loading
//!
//! # Usage Pattern
//!
//! ```rust
//! use sme_fsm::observability::messages::engine::ContextCreated;
//! use sme_fsm::observability::messages::StructuredLog;
//!
//! let msg = ContextCreated {
//!     capacity: 16,
//!     history_depth: 10,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod config;
pub mod engine;
pub mod host;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a tracing event
    fn log(&self);

    /// Build a span carrying the message's fields
    fn span(&self, name: &str) -> Span;
}
