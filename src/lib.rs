// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;        // YAML configuration
pub mod demo;          // sample station management processes
pub mod engine;        // FSM registry and dispatch loop
pub mod errors;        // error handling
pub mod host;          // async host driver
pub mod observability;
