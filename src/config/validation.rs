// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Every rule is checked independently and all violations are returned, so a
//! user fixing a configuration file sees every problem at once rather than
//! one per run.
//!
//! # Rules
//!
//! 1. `engine.max_instances` must be addressable by an instance id
//!    (`1..=MAX_INSTANCES`).
//! 2. `engine.history_depth` must be in `1..=MAX_HISTORY_DEPTH`.
//! 3. `host.idle_timeout_ms`, when given, must be non-zero.
//!
//! ```rust
//! use sme_fsm::config::{validate_config, SmeConfig};
//! use sme_fsm::errors::ConfigValidationError;
//!
//! let mut config = SmeConfig::default();
//! assert!(validate_config(&config).is_empty());
//!
//! config.host.idle_timeout_ms = Some(0);
//! assert_eq!(validate_config(&config), vec![ConfigValidationError::ZeroIdleTimeout]);
//! ```

use crate::config::consts::MAX_HISTORY_DEPTH;
use crate::config::SmeConfig;
use crate::engine::MAX_INSTANCES;
use crate::errors::ConfigValidationError;

/// Check `cfg` against every rule, returning all violations (empty when valid).
pub fn validate_config(cfg: &SmeConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    let max_instances = cfg.engine.max_instances;
    if max_instances == 0 || max_instances > MAX_INSTANCES {
        errors.push(ConfigValidationError::MaxInstancesOutOfRange {
            value: max_instances,
            maximum: MAX_INSTANCES,
        });
    }

    let history_depth = cfg.engine.history_depth;
    if history_depth == 0 || history_depth > MAX_HISTORY_DEPTH {
        errors.push(ConfigValidationError::HistoryDepthOutOfRange {
            value: history_depth,
            maximum: MAX_HISTORY_DEPTH,
        });
    }

    if cfg.host.idle_timeout_ms == Some(0) {
        errors.push(ConfigValidationError::ZeroIdleTimeout);
    }

    errors
}
