// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// A single configuration rule that a loaded configuration violates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    /// `engine.max_instances` is outside the supported range
    #[error("engine.max_instances must be between 1 and {maximum}, got {value}")]
    MaxInstancesOutOfRange { value: usize, maximum: usize },

    /// `engine.history_depth` is outside the supported range
    #[error("engine.history_depth must be between 1 and {maximum}, got {value}")]
    HistoryDepthOutOfRange { value: usize, maximum: usize },

    /// `host.idle_timeout_ms` was given as zero, which would stop the host immediately
    #[error("host.idle_timeout_ms must be greater than zero when set")]
    ZeroIdleTimeout,
}

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// One or more validation rules failed; every failure is reported.
    #[error("Configuration validation failed:\n{}", format_failures(.0))]
    Invalid(Vec<ConfigValidationError>),
}

fn format_failures(failures: &[ConfigValidationError]) -> String {
    failures
        .iter()
        .map(|failure| failure.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
