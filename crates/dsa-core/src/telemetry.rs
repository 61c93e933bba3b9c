//! Logging and metrics setup
//!
//! The library only emits `tracing` events and `metrics` counters. Hosts
//! call [`init`] once at startup to get a subscriber; installing a metrics
//! exporter is left to them.

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Metric names emitted by the orchestrator
pub mod metric_names {
    /// Orchestrated calls, labelled by `operation` and `mode`
    pub const CALLS_TOTAL: &str = "dsa_calls_total";
    /// Swallowed non-mandatory backend failures, labelled by `operation` and `source`
    pub const SHADOW_FAILURES_TOTAL: &str = "dsa_shadow_failures_total";
    /// Comparator divergences, labelled by `operation`
    pub const DIVERGENCES_TOTAL: &str = "dsa_divergences_total";
    /// Cross-references written, labelled by `operation`
    pub const REFERENCES_RECORDED_TOTAL: &str = "dsa_references_recorded_total";
    /// Cross-reference conflicts, labelled by `operation`
    pub const REFERENCE_CONFLICTS_TOTAL: &str = "dsa_reference_conflicts_total";
}

/// Logging profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output, debug level
    Development,
    /// JSON output, info level
    Production,
    /// Registry without output, for tests
    Test,
}

static INIT_ONCE: Once = Once::new();

/// Install the global tracing subscriber
///
/// Only the first call has an effect. `RUST_LOG` overrides the profile's
/// default filter.
///
/// # Example
///
/// ```
/// use dsa_core::telemetry::{init, Profile};
///
/// init(Profile::Test);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        // A subscriber installed by the host wins; ignore the error
        let _ = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new("dsa=debug")),
                )
                .finish()
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new("dsa=info")),
                )
                .finish()
                .try_init(),
            Profile::Test => tracing_subscriber::registry().try_init(),
        };
    });
}
