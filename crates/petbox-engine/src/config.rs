//! Engine tunables, filled in by the server from its validated config.

use std::time::Duration;

use petbox_core::lifecycle::BundleDiscount;
use petbox_core::DEFAULT_DRAFT_TTL_HOURS;

/// Default period of both background workers (24 h).
pub const DEFAULT_WORKER_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Lifetime of a draft before the sweeper may delete it.
    pub draft_ttl: chrono::Duration,
    pub bundle_discount: BundleDiscount,
    pub sweep_interval: Duration,
    pub renewal_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            draft_ttl: chrono::Duration::hours(DEFAULT_DRAFT_TTL_HOURS),
            bundle_discount: BundleDiscount::default(),
            sweep_interval: DEFAULT_WORKER_INTERVAL,
            renewal_interval: DEFAULT_WORKER_INTERVAL,
        }
    }
}
