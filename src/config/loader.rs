// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_HISTORY_DEPTH, DEFAULT_LOG_FILTER, DEFAULT_MAX_INSTANCES};
use crate::config::validate_config;
use crate::errors::ConfigError;
use crate::observability::messages::config::{ConfigLoaded, ConfigValidationFailed};
use crate::observability::messages::StructuredLog;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level configuration for an engine and the host that drives it.
///
/// Every section is optional; missing sections and fields take their
/// defaults. It is typically loaded from a YAML file.
///
/// # Fields
/// * `engine` - Registry capacity and diagnostics depth
/// * `host` - When the async host loop returns
/// * `logging` - Default tracing filter for the binary
///
/// # Example
/// ```yaml
/// engine:
///   max_instances: 16
///   history_depth: 20
/// host:
///   stop_when_quiescent: true
///   idle_timeout_ms: 5000
/// logging:
///   filter: "sme_fsm=debug"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SmeConfig {
    #[serde(default)]
    pub engine: EngineOptions,
    #[serde(default)]
    pub host: HostOptions,
    #[serde(default)]
    pub logging: LoggingOptions,
}

/// Context sizing options.
///
/// # Fields
/// * `max_instances` - Registry capacity, fixed for the context's lifetime (defaults to 64)
/// * `history_depth` - Dispatches remembered per instance for dumps (defaults to 10)
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineOptions {
    #[serde(default = "default_max_instances")]
    pub max_instances: usize,
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

fn default_max_instances() -> usize {
    DEFAULT_MAX_INSTANCES
}

fn default_history_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

/// Host driver options.
///
/// # Fields
/// * `stop_when_quiescent` - Return once no events and no timers are pending
/// * `idle_timeout_ms` - Return after this long without any delivery (optional)
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HostOptions {
    #[serde(default)]
    pub stop_when_quiescent: bool,
    pub idle_timeout_ms: Option<u64>,
}

/// Logging options for the binary. `RUST_LOG` overrides `filter`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingOptions {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            ansi: default_ansi(),
        }
    }
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_ansi() -> bool {
    true
}

/// Load a config from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SmeConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let cfg: SmeConfig = serde_yaml::from_str(&content)?;
    Ok(cfg)
}

/// Load a config from a YAML file and check every validation rule.
///
/// All failures are collected and returned together in
/// [`ConfigError::Invalid`].
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<SmeConfig, ConfigError> {
    let display_path = path.as_ref().display().to_string();
    let cfg = load_config(&path)?;

    let failures = validate_config(&cfg);
    if !failures.is_empty() {
        let messages: Vec<String> = failures.iter().map(|e| e.to_string()).collect();
        ConfigValidationFailed {
            path: &display_path,
            failures: &messages,
        }
        .log();
        return Err(ConfigError::Invalid(failures));
    }

    ConfigLoaded {
        path: &display_path,
        max_instances: cfg.engine.max_instances,
        history_depth: cfg.engine.history_depth,
    }
    .log();
    Ok(cfg)
}
