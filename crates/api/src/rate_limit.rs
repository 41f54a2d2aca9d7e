//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Guards the configuration and reset endpoints with tower_governor. The
//! dashboard is a single client on a local link, so one global bucket is
//! shared by all callers instead of keying on peer addresses.

use axum::routing::MethodRouter;
use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::GlobalKeyExtractor;
use tower_governor::GovernorLayer;
use tracing::warn;

/// Governor config with X-RateLimit-* headers and a single global key
pub type MutationGovernorConfig =
    tower_governor::governor::GovernorConfig<GlobalKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Max requests that can be made immediately
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 1,
            burst_size: 10,
        }
    }
}

/// Build the governor config, or `None` when disabled or the quota is zero
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<MutationGovernorConfig>> {
    if !config.enabled {
        return None;
    }
    let governor = GovernorConfigBuilder::default()
        .key_extractor(GlobalKeyExtractor)
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish();
    if governor.is_none() {
        warn!(
            "Rate limit disabled: invalid quota ({} s, burst {})",
            config.per_second, config.burst_size
        );
    }
    governor.map(Arc::new)
}

/// Wrap a method router in the limiter when one is configured
pub fn limited<S>(
    route: MethodRouter<S>,
    governor: Option<&Arc<MutationGovernorConfig>>,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    match governor {
        Some(config) => route.layer(GovernorLayer {
            config: Arc::clone(config),
        }),
        None => route,
    }
}
