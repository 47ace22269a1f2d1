// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod descriptor;
mod engine;

pub use config::{ConfigError, ConfigValidationError};
pub use descriptor::DescriptorError;
pub use engine::EngineError;
