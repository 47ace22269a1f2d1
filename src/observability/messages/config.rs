// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for configuration loading and validation.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Configuration file parsed successfully.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use sme_fsm::observability::messages::config::ConfigLoaded;
///
/// let msg = ConfigLoaded {
///     path: "configs/demo.yaml",
///     max_instances: 64,
///     history_depth: 10,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Loaded configuration from configs/demo.yaml (max_instances=64, history_depth=10)"
/// );
/// ```
pub struct ConfigLoaded<'a> {
    pub path: &'a str,
    pub max_instances: usize,
    pub history_depth: usize,
}

impl Display for ConfigLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded configuration from {} (max_instances={}, history_depth={})",
            self.path, self.max_instances, self.history_depth
        )
    }
}

impl StructuredLog for ConfigLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            path = self.path,
            max_instances = self.max_instances,
            history_depth = self.history_depth,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("config_loaded", span_name = name, path = self.path)
    }
}

/// Loaded configuration violates one or more rules.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ConfigValidationFailed<'a> {
    pub path: &'a str,
    pub failures: &'a [String],
}

impl Display for ConfigValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Configuration {} failed validation: {}",
            self.path,
            self.failures.join("; ")
        )
    }
}

impl StructuredLog for ConfigValidationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            path = self.path,
            failure_count = self.failures.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "config_validation_failed",
            span_name = name,
            path = self.path,
            failure_count = self.failures.len(),
        )
    }
}
