//! Orchestrator statistics
//!
//! In-process counters kept alongside the `metrics` facade, so hosts and
//! tests can inspect an orchestrator without installing a recorder.

use crate::types::Source;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one orchestrator
#[derive(Debug, Default)]
pub struct OrchestratorStats {
    calls: AtomicU64,
    single_source_calls: AtomicU64,
    dual_source_calls: AtomicU64,
    primary_invocations: AtomicU64,
    secondary_invocations: AtomicU64,
    shadow_failures: AtomicU64,
    divergences: AtomicU64,
    references_recorded: AtomicU64,
    hook_panics: AtomicU64,
}

/// Point-in-time copy of [`OrchestratorStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Calls started
    pub calls: u64,
    /// Calls that consulted only the active source
    pub single_source_calls: u64,
    /// Calls that consulted both systems
    pub dual_source_calls: u64,
    /// Primary backend invocations
    pub primary_invocations: u64,
    /// Secondary backend invocations
    pub secondary_invocations: u64,
    /// Non-mandatory backend failures swallowed
    pub shadow_failures: u64,
    /// Comparator divergences
    pub divergences: u64,
    /// Cross-references written
    pub references_recorded: u64,
    /// Comparator panics caught
    pub hook_panics: u64,
}

impl OrchestratorStats {
    pub(crate) fn record_call(&self, dual: bool) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if dual {
            self.dual_source_calls.fetch_add(1, Ordering::Relaxed);
        } else {
            self.single_source_calls.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_invocation(&self, source: Source) {
        let counter = match source {
            Source::Primary => &self.primary_invocations,
            Source::Secondary => &self.secondary_invocations,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_shadow_failure(&self) {
        self.shadow_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_divergence(&self) {
        self.divergences.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reference(&self) {
        self.references_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hook_panic(&self) {
        self.hook_panics.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            single_source_calls: self.single_source_calls.load(Ordering::Relaxed),
            dual_source_calls: self.dual_source_calls.load(Ordering::Relaxed),
            primary_invocations: self.primary_invocations.load(Ordering::Relaxed),
            secondary_invocations: self.secondary_invocations.load(Ordering::Relaxed),
            shadow_failures: self.shadow_failures.load(Ordering::Relaxed),
            divergences: self.divergences.load(Ordering::Relaxed),
            references_recorded: self.references_recorded.load(Ordering::Relaxed),
            hook_panics: self.hook_panics.load(Ordering::Relaxed),
        }
    }
}
