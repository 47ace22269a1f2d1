// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Construction-time problems with a process descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The descriptor declares no states at all
    #[error("descriptor declares no states")]
    NoStates,

    /// The initial state index does not name a declared state
    #[error("initial state {initial} is out of range for {state_count} states")]
    InitialStateOutOfRange {
        initial: usize,
        state_count: usize,
    },

    /// Two states share the same name, which makes dumps and logs ambiguous
    #[error("state name '{name}' is declared more than once")]
    DuplicateStateName { name: &'static str },
}
