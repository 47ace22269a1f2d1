// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors returned by the engine's registry operations.
//!
//! Only registry-level conditions are reported as errors. Dispatch anomalies
//! (unmatched events, removal of unknown timers) are diagnostics delivered to
//! the observer and the log; they never surface as `Err` values.

use thiserror::Error;

use crate::engine::InstanceId;
use crate::errors::DescriptorError;

/// Errors produced by context creation and instance management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The registry cannot hold another instance, or the requested capacity
    /// cannot be represented by the instance index type.
    #[error("instance registry capacity exceeded: {reason}")]
    Capacity {
        /// Human readable description of the capacity violation
        reason: String,
    },

    /// The requested per-instance history depth is outside `1..=maximum`.
    #[error("history depth must be between 1 and {maximum}, got {requested}")]
    HistoryDepth { requested: usize, maximum: usize },

    /// An operation addressed an instance that is not (or no longer) live.
    #[error("no live instance with id {id}")]
    UnknownDestination {
        /// The id that could not be resolved
        id: InstanceId,
    },

    /// A process descriptor failed its construction-time checks.
    #[error("process descriptor '{process}' is invalid: {errors:?}")]
    InvalidDescriptor {
        /// Name of the offending process type
        process: &'static str,
        /// Every check the descriptor failed
        errors: Vec<DescriptorError>,
    },
}

impl EngineError {
    pub(crate) fn registry_full(capacity: usize) -> Self {
        EngineError::Capacity {
            reason: format!("all {} instance slots are in use", capacity),
        }
    }

    pub(crate) fn unrepresentable(requested: usize, maximum: usize) -> Self {
        EngineError::Capacity {
            reason: format!(
                "requested {} instances, supported range is 1..={}",
                requested, maximum
            ),
        }
    }
}
