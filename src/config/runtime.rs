// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{HostOptions, SmeConfig};
use crate::engine::{Context, ContextBuilder, Message};
use crate::errors::EngineError;

/// Engine runtime builder - turns a loaded configuration into a ready context.
///
/// The `RuntimeBuilder` sizes the context from the `engine` section and hands
/// back the `host` section for the async driver, so callers never have to
/// read option structs themselves.
///
/// # Examples
///
/// ```
/// use sme_fsm::config::{RuntimeBuilder, SmeConfig};
/// use sme_fsm::engine::{Context, Message};
///
/// #[derive(Debug)]
/// struct Ping;
///
/// impl Message for Ping {
///     type Kind = ();
///     fn kind(&self) {}
/// }
///
/// let config = SmeConfig::default();
/// let (ctx, host): (Context<Ping>, _) = RuntimeBuilder::from_config(&config).unwrap();
///
/// assert_eq!(ctx.capacity(), config.engine.max_instances);
/// assert!(!host.stop_when_quiescent);
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build a context and its host options from configuration.
    ///
    /// Uses the monotonic clock and no observer; callers needing either start
    /// from [`RuntimeBuilder::context_builder`] instead.
    pub fn from_config<M: Message>(
        cfg: &SmeConfig,
    ) -> Result<(Context<M>, HostOptions), EngineError> {
        let ctx = Self::context_builder(cfg).build()?;
        Ok((ctx, cfg.host.clone()))
    }

    pub fn context_builder<M: Message>(cfg: &SmeConfig) -> ContextBuilder<M> {
        ContextBuilder::from_config(cfg)
    }
}
