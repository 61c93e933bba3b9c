//! Migration Orchestrator
//!
//! Runs one logical operation end-to-end against one or both backend
//! systems:
//! - Snapshots the policy and plans which systems to call
//! - Calls them in the operation's order, adapting the second request from
//!   the first result
//! - Compares, reconciles and, for creates, records the cross-reference
//!
//! # Failure model
//!
//! A failure of a mandatory system (active source or identifier space)
//! surfaces unchanged. Any other backend failure becomes a failed envelope:
//! it is logged, counted and shown to the hooks, and the call carries on.
//! A request adapter error surfaces when the system it feeds is mandatory
//! and is treated as a failure of that system otherwise. Cross-reference
//! conflicts while recording always surface.

use crate::backend::BackendOp;
use crate::envelope::{Outcome, PrimaryResult, SecondaryResult};
use crate::error::{BackendError, BackendErrorKind, MigrationError};
use crate::hooks::{Comparison, Hooks};
use crate::policy::{PolicyHandle, ValidatedPolicy};
use crate::stats::{OrchestratorStats, StatsSnapshot};
use crate::telemetry::metric_names;
use crate::types::{CallContext, CallOrder, OperationKind, Source};
use dsa_xref::{CrossReferenceStore, XrefError};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::Instrument;

/// Writes `(secondary id, primary id)` from the two created values
type ReferenceRecorder<Res> =
    Arc<dyn Fn(&Res, &Res) -> Result<(), XrefError> + Send + Sync>;

/// How the two systems are sequenced for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sequence {
    /// One after the other, starting with the given system
    Leading(Source),
    /// Both at once
    Concurrent,
}

/// Engine for one logical operation
///
/// Built once per operation (e.g. "create customer") and shared across
/// calls; each call is independent and takes no global lock.
pub struct MigrationOrchestrator<Req, Res> {
    operation: Arc<str>,
    kind: OperationKind,
    call_order: CallOrder,
    policy: PolicyHandle,
    primary: BackendOp<Req, Res>,
    secondary: BackendOp<Req, Res>,
    hooks: Hooks<Req, Res>,
    recorder: Option<ReferenceRecorder<Res>>,
    stats: Arc<OrchestratorStats>,
}

impl<Req, Res> MigrationOrchestrator<Req, Res>
where
    Req: Clone + Send + 'static,
    Res: Clone + Send + Sync + 'static,
{
    /// Start building an orchestrator
    #[must_use]
    pub fn builder(
        operation: impl Into<Arc<str>>,
        kind: OperationKind,
        primary: BackendOp<Req, Res>,
        secondary: BackendOp<Req, Res>,
    ) -> OrchestratorBuilder<Req, Res> {
        OrchestratorBuilder {
            operation: operation.into(),
            kind,
            call_order: None,
            primary,
            secondary,
            hooks: Hooks::new(),
            recorder: None,
        }
    }

    /// Execute with the handle's current policy
    ///
    /// # Errors
    /// - `MigrationError::Backend` if a mandatory system fails
    /// - `MigrationError::ReferenceNotFound` if a request adapter cannot
    ///   resolve an identifier
    /// - `MigrationError::ReferenceConflict` if the created pair is already
    ///   (partly) mapped
    pub async fn execute(&self, request: Req) -> Result<Option<Res>, MigrationError> {
        self.execute_with(self.policy.current(), request).await
    }

    /// Execute with an explicit policy for this call only
    ///
    /// # Errors
    /// Same as [`MigrationOrchestrator::execute`]
    pub async fn execute_with(
        &self,
        policy: Arc<ValidatedPolicy>,
        request: Req,
    ) -> Result<Option<Res>, MigrationError> {
        let ctx = CallContext::new(Arc::clone(&self.operation), self.kind, policy);
        let span = tracing::info_span!(
            "migration_call",
            call_id = %ctx.call_id,
            operation = %self.operation,
            kind = self.kind.as_str(),
        );

        self.run(ctx, request).instrument(span).await
    }

    /// Statistics for this orchestrator
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Operation name
    #[inline]
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Operation kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Policy handle this orchestrator reads from
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }

    async fn run(&self, ctx: CallContext, request: Req) -> Result<Option<Res>, MigrationError> {
        let plan = ctx.policy().plan();
        let dual = plan.len() > 1;
        self.stats.record_call(dual);
        metrics::counter!(
            metric_names::CALLS_TOTAL,
            "operation" => self.operation.to_string(),
            "mode" => if dual { "dual" } else { "single" }
        )
        .increment(1);

        let result = match plan.as_slice() {
            [only] => self.run_single(*only, request).await,
            _ => self.run_dual(&ctx, request).await,
        };

        match &result {
            Ok(value) => tracing::info!(found = value.is_some(), "Migration call completed"),
            Err(e) => tracing::error!(error = %e, "Migration call failed"),
        }

        result
    }

    /// Cut-over path: only the active source, value returned unchanged
    async fn run_single(&self, source: Source, request: Req) -> Result<Option<Res>, MigrationError> {
        tracing::debug!(source = %source, "Single-source call");
        self.invoke(source, request)
            .await
            .map_err(|error| MigrationError::backend(source, error))
    }

    async fn run_dual(
        &self,
        ctx: &CallContext,
        request: Req,
    ) -> Result<Option<Res>, MigrationError> {
        let sequence = self.sequence(ctx);
        tracing::debug!(sequence = ?sequence, "Dual-source call");

        let (primary, secondary) = match sequence {
            Sequence::Leading(Source::Primary) => {
                let primary: PrimaryResult<Res> =
                    self.settle(ctx, Source::Primary, self.invoke(Source::Primary, request.clone()).await)?
                        .into();
                let adapted = (self.hooks.adapt_for_secondary)(ctx, request, &primary);
                let secondary: SecondaryResult<Res> =
                    self.follow(ctx, Source::Secondary, adapted).await?.into();
                (primary, secondary)
            }
            Sequence::Leading(Source::Secondary) => {
                let secondary: SecondaryResult<Res> =
                    self.settle(ctx, Source::Secondary, self.invoke(Source::Secondary, request.clone()).await)?
                        .into();
                let adapted = (self.hooks.adapt_for_primary)(ctx, request, &secondary);
                let primary: PrimaryResult<Res> =
                    self.follow(ctx, Source::Primary, adapted).await?.into();
                (primary, secondary)
            }
            Sequence::Concurrent => {
                let (primary, secondary) = futures::join!(
                    self.invoke(Source::Primary, request.clone()),
                    self.invoke(Source::Secondary, request),
                );
                let primary: PrimaryResult<Res> =
                    self.settle(ctx, Source::Primary, primary)?.into();
                let secondary: SecondaryResult<Res> =
                    self.settle(ctx, Source::Secondary, secondary)?.into();
                (primary, secondary)
            }
        };

        self.compare(ctx, &primary, &secondary);

        let value = (self.hooks.response_adapter)(ctx, &primary, &secondary);

        if let Some(recorder) = &self.recorder {
            self.record_reference(recorder, &primary, &secondary)?;
        }

        Ok(value)
    }

    /// Resolve the configured call order against the call's policy
    fn sequence(&self, ctx: &CallContext) -> Sequence {
        match self.call_order {
            CallOrder::PrimaryFirst => Sequence::Leading(Source::Primary),
            CallOrder::SecondaryFirst => Sequence::Leading(Source::Secondary),
            CallOrder::IdentifierSpaceFirst => Sequence::Leading(ctx.identifier_space()),
            CallOrder::PolicyOrder => Sequence::Leading(
                ctx.policy()
                    .consult_order()
                    .first()
                    .copied()
                    .unwrap_or_else(|| ctx.active_source()),
            ),
            CallOrder::Concurrent => Sequence::Concurrent,
        }
    }

    async fn invoke(&self, source: Source, request: Req) -> Result<Option<Res>, BackendError> {
        self.stats.record_invocation(source);
        let op = match source {
            Source::Primary => &self.primary,
            Source::Secondary => &self.secondary,
        };
        op(request).await
    }

    /// Call the second system with the adapted request
    ///
    /// An adapter error for a non-mandatory system skips the call and counts
    /// as a shadow failure.
    async fn follow(
        &self,
        ctx: &CallContext,
        source: Source,
        adapted: Result<Req, MigrationError>,
    ) -> Result<Outcome<Res>, MigrationError> {
        match adapted {
            Ok(request) => {
                let result = self.invoke(source, request).await;
                self.settle(ctx, source, result)
            }
            Err(error) if ctx.policy().is_mandatory(source) => Err(error),
            Err(error) => self.settle(
                ctx,
                source,
                Err(BackendError::new(
                    BackendErrorKind::Other,
                    format!("request adaptation failed: {error}"),
                )),
            ),
        }
    }

    /// Turn a backend result into an outcome, failing only for mandatory systems
    fn settle(
        &self,
        ctx: &CallContext,
        source: Source,
        result: Result<Option<Res>, BackendError>,
    ) -> Result<Outcome<Res>, MigrationError> {
        match result {
            Ok(value) => Ok(Outcome::from_result(Ok(value))),
            Err(error) if ctx.policy().is_mandatory(source) => {
                Err(MigrationError::backend(source, error))
            }
            Err(error) => {
                tracing::warn!(
                    source = %source,
                    error = %error,
                    "Shadow call failed; continuing without it"
                );
                self.stats.record_shadow_failure();
                metrics::counter!(
                    metric_names::SHADOW_FAILURES_TOTAL,
                    "operation" => self.operation.to_string(),
                    "source" => source.as_str()
                )
                .increment(1);
                Ok(Outcome::Failed(error))
            }
        }
    }

    /// Run the comparator; its verdict and panics never reach the caller
    fn compare(&self, ctx: &CallContext, primary: &PrimaryResult<Res>, secondary: &SecondaryResult<Res>) {
        if !ctx.policy().compare_enabled() {
            return;
        }

        let comparator = &self.hooks.comparator;
        match catch_unwind(AssertUnwindSafe(|| comparator(ctx, primary, secondary))) {
            Ok(Comparison::Match) => tracing::debug!("Results match"),
            Ok(Comparison::Skipped) => tracing::debug!(
                primary = primary.outcome().label(),
                secondary = secondary.outcome().label(),
                "Comparison skipped"
            ),
            Ok(Comparison::Diverged { reason }) => {
                tracing::warn!(reason = %reason, "Results diverged");
                self.stats.record_divergence();
                metrics::counter!(
                    metric_names::DIVERGENCES_TOTAL,
                    "operation" => self.operation.to_string()
                )
                .increment(1);
            }
            Err(_) => {
                tracing::error!("Comparator panicked; ignoring");
                self.stats.record_hook_panic();
            }
        }
    }

    fn record_reference(
        &self,
        recorder: &ReferenceRecorder<Res>,
        primary: &PrimaryResult<Res>,
        secondary: &SecondaryResult<Res>,
    ) -> Result<(), MigrationError> {
        let (Some(primary), Some(secondary)) = (primary.value(), secondary.value()) else {
            tracing::warn!(
                primary = primary.outcome().label(),
                secondary = secondary.outcome().label(),
                "Cross-reference not recorded; both systems must return a value"
            );
            return Ok(());
        };

        match recorder(primary, secondary) {
            Ok(()) => {
                self.stats.record_reference();
                metrics::counter!(
                    metric_names::REFERENCES_RECORDED_TOTAL,
                    "operation" => self.operation.to_string()
                )
                .increment(1);
                tracing::debug!("Cross-reference recorded");
                Ok(())
            }
            Err(error) => {
                if error.is_conflict() {
                    metrics::counter!(
                        metric_names::REFERENCE_CONFLICTS_TOTAL,
                        "operation" => self.operation.to_string()
                    )
                    .increment(1);
                }
                Err(error.into())
            }
        }
    }
}

impl<Req, Res> fmt::Debug for MigrationOrchestrator<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationOrchestrator")
            .field("operation", &self.operation)
            .field("kind", &self.kind)
            .field("call_order", &self.call_order)
            .field("records_references", &self.recorder.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`MigrationOrchestrator`]
pub struct OrchestratorBuilder<Req, Res> {
    operation: Arc<str>,
    kind: OperationKind,
    call_order: Option<CallOrder>,
    primary: BackendOp<Req, Res>,
    secondary: BackendOp<Req, Res>,
    hooks: Hooks<Req, Res>,
    recorder: Option<ReferenceRecorder<Res>>,
}

impl<Req, Res> OrchestratorBuilder<Req, Res>
where
    Req: Clone + Send + 'static,
    Res: Clone + Send + Sync + 'static,
{
    /// With the operation's hooks
    #[must_use]
    pub fn hooks(mut self, hooks: Hooks<Req, Res>) -> Self {
        self.hooks = hooks;
        self
    }

    /// With an explicit call order instead of the kind's default
    #[must_use]
    pub fn call_order(mut self, order: CallOrder) -> Self {
        self.call_order = Some(order);
        self
    }

    /// Record `(secondary id, primary id)` in `store` after each dual call
    /// in which both systems returned a value
    #[must_use]
    pub fn record_references<S, P, Store, FP, FS>(
        mut self,
        store: Store,
        primary_id: FP,
        secondary_id: FS,
    ) -> Self
    where
        S: 'static,
        P: 'static,
        Store: CrossReferenceStore<S, P> + 'static,
        FP: Fn(&Res) -> P + Send + Sync + 'static,
        FS: Fn(&Res) -> S + Send + Sync + 'static,
    {
        self.recorder = Some(Arc::new(move |primary: &Res, secondary: &Res| {
            store.put(secondary_id(secondary), primary_id(primary))
        }));
        self
    }

    /// Finish with the policy handle the orchestrator reads at each call
    #[must_use]
    pub fn build(self, policy: PolicyHandle) -> MigrationOrchestrator<Req, Res> {
        let call_order = self
            .call_order
            .unwrap_or_else(|| self.kind.default_call_order());

        tracing::debug!(
            operation = %self.operation,
            kind = self.kind.as_str(),
            call_order = ?call_order,
            "Migration orchestrator built"
        );

        MigrationOrchestrator {
            operation: self.operation,
            kind: self.kind,
            call_order,
            policy,
            primary: self.primary,
            secondary: self.secondary,
            hooks: self.hooks,
            recorder: self.recorder,
            stats: Arc::new(OrchestratorStats::default()),
        }
    }
}

impl<Req, Res> fmt::Debug for OrchestratorBuilder<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorBuilder")
            .field("operation", &self.operation)
            .field("kind", &self.kind)
            .field("call_order", &self.call_order)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::backend_op;
    use crate::policy::MigrationPolicy;
    use dsa_xref::InMemoryCrossReferenceStore;
    use parking_lot::Mutex;

    /// Backend that records the requests it sees and answers `f(request)`
    fn recording_op(
        log: Arc<Mutex<Vec<(Source, u32)>>>,
        source: Source,
        f: fn(u32) -> Result<Option<u32>, BackendError>,
    ) -> BackendOp<u32, u32> {
        backend_op(move |request: u32| {
            log.lock().push((source, request));
            async move { f(request) }
        })
    }

    fn handle(policy: MigrationPolicy) -> PolicyHandle {
        PolicyHandle::new(policy.validate().unwrap())
    }

    fn comparing() -> MigrationPolicy {
        MigrationPolicy::new(Source::Primary).with_compare(true)
    }

    #[tokio::test]
    async fn cut_over_calls_only_active() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = MigrationOrchestrator::builder(
            "double",
            OperationKind::Read,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n * 2))),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n * 3))),
        )
        .build(handle(MigrationPolicy::new(Source::Primary)));

        assert_eq!(orchestrator.execute(5).await.unwrap(), Some(10));
        assert_eq!(*log.lock(), vec![(Source::Primary, 5)]);

        let stats = orchestrator.stats();
        assert_eq!(stats.single_source_calls, 1);
        assert_eq!(stats.secondary_invocations, 0);
    }

    #[tokio::test]
    async fn cut_over_to_secondary_never_calls_primary() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = MigrationOrchestrator::builder(
            "double",
            OperationKind::Read,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n * 2))),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n * 3))),
        )
        .build(handle(MigrationPolicy::new(Source::Secondary)));

        assert_eq!(orchestrator.execute(5).await.unwrap(), Some(15));
        assert_eq!(orchestrator.stats().primary_invocations, 0);
    }

    #[tokio::test]
    async fn primary_first_adapts_secondary_request() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = Hooks::new().with_secondary_request_adapter(|_, request: u32, primary: &PrimaryResult<u32>| {
            Ok(primary.value().copied().unwrap_or(request) + 100)
        });
        let orchestrator = MigrationOrchestrator::builder(
            "create",
            OperationKind::Create,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n + 1))),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n))),
        )
        .hooks(hooks)
        .build(handle(comparing()));

        let value = orchestrator.execute(1).await.unwrap();
        assert_eq!(value, Some(2));
        assert_eq!(
            *log.lock(),
            vec![(Source::Primary, 1), (Source::Secondary, 102)]
        );
    }

    #[tokio::test]
    async fn identifier_space_first_for_reads() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = MigrationOrchestrator::builder(
            "read",
            OperationKind::Read,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n))),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n))),
        )
        .build(handle(comparing().with_identifier_space(Source::Secondary)));

        orchestrator.execute(9).await.unwrap();
        let order: Vec<Source> = log.lock().iter().map(|(s, _)| *s).collect();
        assert_eq!(order, vec![Source::Secondary, Source::Primary]);
    }

    #[tokio::test]
    async fn policy_order_follows_consult_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = MigrationOrchestrator::builder(
            "read",
            OperationKind::Read,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n))),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n))),
        )
        .call_order(CallOrder::PolicyOrder)
        .build(handle(
            comparing().with_consult_order(vec![Source::Secondary, Source::Primary]),
        ));

        orchestrator.execute(1).await.unwrap();
        let order: Vec<Source> = log.lock().iter().map(|(s, _)| *s).collect();
        assert_eq!(order, vec![Source::Secondary, Source::Primary]);
    }

    #[tokio::test]
    async fn concurrent_order_skips_request_adapters() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = Hooks::new()
            .with_secondary_request_adapter(|_, _: u32, _: &PrimaryResult<u32>| {
                panic!("request adapter must not run concurrently")
            });
        let orchestrator = MigrationOrchestrator::builder(
            "read",
            OperationKind::Read,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n))),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n))),
        )
        .hooks(hooks)
        .call_order(CallOrder::Concurrent)
        .build(handle(comparing()));

        assert_eq!(orchestrator.execute(4).await.unwrap(), Some(4));
        let mut seen = log.lock().clone();
        seen.sort();
        assert_eq!(seen, vec![(Source::Primary, 4), (Source::Secondary, 4)]);
    }

    #[tokio::test]
    async fn concurrent_mandatory_failure_surfaces() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = MigrationOrchestrator::builder(
            "read",
            OperationKind::Read,
            recording_op(Arc::clone(&log), Source::Primary, |_| {
                Err(BackendError::timeout("primary slow"))
            }),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n))),
        )
        .call_order(CallOrder::Concurrent)
        .build(handle(comparing()));

        let err = orchestrator.execute(4).await.unwrap_err();
        assert_eq!(err.failed_source(), Some(Source::Primary));
        assert!(err.is_retryable());

        // Both calls were already in flight
        let stats = orchestrator.stats();
        assert_eq!(stats.primary_invocations, 1);
        assert_eq!(stats.secondary_invocations, 1);
        assert_eq!(stats.shadow_failures, 0);
    }

    #[tokio::test]
    async fn concurrent_shadow_failure_is_swallowed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(InMemoryCrossReferenceStore::<u32, u32>::new());
        let orchestrator = MigrationOrchestrator::builder(
            "create",
            OperationKind::Create,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n))),
            recording_op(Arc::clone(&log), Source::Secondary, |_| {
                Err(BackendError::unavailable("secondary down"))
            }),
        )
        .call_order(CallOrder::Concurrent)
        .record_references(Arc::clone(&store), |p: &u32| *p, |s: &u32| *s)
        .build(handle(comparing()));

        assert_eq!(orchestrator.execute(4).await.unwrap(), Some(4));
        assert_eq!(orchestrator.stats().shadow_failures, 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn mandatory_failure_surfaces() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = MigrationOrchestrator::builder(
            "create",
            OperationKind::Create,
            recording_op(Arc::clone(&log), Source::Primary, |_| {
                Err(BackendError::storage("primary down"))
            }),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n))),
        )
        .build(handle(comparing()));

        let err = orchestrator.execute(1).await.unwrap_err();
        assert_eq!(err.failed_source(), Some(Source::Primary));
        // Primary-first path stops before the secondary
        assert_eq!(orchestrator.stats().secondary_invocations, 0);
    }

    #[tokio::test]
    async fn shadow_failure_is_swallowed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = MigrationOrchestrator::builder(
            "create",
            OperationKind::Create,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n))),
            recording_op(Arc::clone(&log), Source::Secondary, |_| {
                Err(BackendError::unavailable("secondary down"))
            }),
        )
        .build(handle(comparing()));

        assert_eq!(orchestrator.execute(8).await.unwrap(), Some(8));
        assert_eq!(orchestrator.stats().shadow_failures, 1);
    }

    #[tokio::test]
    async fn identifier_space_failure_is_mandatory() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = MigrationOrchestrator::builder(
            "create",
            OperationKind::Create,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n))),
            recording_op(Arc::clone(&log), Source::Secondary, |_| {
                Err(BackendError::unavailable("secondary down"))
            }),
        )
        .build(handle(comparing().with_identifier_space(Source::Secondary)));

        let err = orchestrator.execute(8).await.unwrap_err();
        assert_eq!(err.failed_source(), Some(Source::Secondary));
    }

    #[tokio::test]
    async fn request_adapter_error_surfaces() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = Hooks::new().with_primary_request_adapter(
            |_, request: u32, _: &SecondaryResult<u32>| {
                Err(XrefError::secondary_not_found(request).into())
            },
        );
        let orchestrator = MigrationOrchestrator::builder(
            "read",
            OperationKind::Read,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n))),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n))),
        )
        .hooks(hooks)
        .call_order(CallOrder::SecondaryFirst)
        .build(handle(comparing()));

        let err = orchestrator.execute(3).await.unwrap_err();
        assert!(matches!(err, MigrationError::ReferenceNotFound(_)));
        assert_eq!(orchestrator.stats().primary_invocations, 0);
    }

    #[tokio::test]
    async fn shadow_adapter_error_skips_shadow_call() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = Hooks::new().with_secondary_request_adapter(
            |_, request: u32, _: &PrimaryResult<u32>| {
                Err(XrefError::primary_not_found(request).into())
            },
        );
        let orchestrator = MigrationOrchestrator::builder(
            "read",
            OperationKind::Read,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n))),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n))),
        )
        .hooks(hooks)
        .build(handle(comparing()));

        assert_eq!(orchestrator.execute(3).await.unwrap(), Some(3));
        let stats = orchestrator.stats();
        assert_eq!(stats.secondary_invocations, 0);
        assert_eq!(stats.shadow_failures, 1);
    }

    #[tokio::test]
    async fn comparator_panic_does_not_abort_call() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = Hooks::new().with_comparator(|_, _: &PrimaryResult<u32>, _: &SecondaryResult<u32>| {
            panic!("comparator bug")
        });
        let orchestrator = MigrationOrchestrator::builder(
            "read",
            OperationKind::Read,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n))),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n + 1))),
        )
        .hooks(hooks)
        .build(handle(comparing()));

        assert_eq!(orchestrator.execute(1).await.unwrap(), Some(1));
        assert_eq!(orchestrator.stats().hook_panics, 1);
    }

    #[tokio::test]
    async fn divergence_is_counted_not_returned() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = Hooks::new().with_comparator(|_, p: &PrimaryResult<u32>, s: &SecondaryResult<u32>| {
            if p.value() == s.value() {
                Comparison::Match
            } else {
                Comparison::diverged("different numbers")
            }
        });
        let orchestrator = MigrationOrchestrator::builder(
            "read",
            OperationKind::Read,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n))),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n + 1))),
        )
        .hooks(hooks)
        .build(handle(comparing()));

        assert_eq!(orchestrator.execute(1).await.unwrap(), Some(1));
        assert_eq!(orchestrator.stats().divergences, 1);
    }

    #[tokio::test]
    async fn create_records_reference_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(InMemoryCrossReferenceStore::<u32, u32>::new());
        let orchestrator = MigrationOrchestrator::builder(
            "create",
            OperationKind::Create,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n + 1000))),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n + 2000))),
        )
        .record_references(Arc::clone(&store), |p: &u32| *p, |s: &u32| *s)
        .build(handle(comparing()));

        assert_eq!(orchestrator.execute(1).await.unwrap(), Some(1001));
        assert_eq!(store.get(&2001).unwrap(), 1001);
        assert_eq!(store.len(), 1);

        // Same ids again: the second put conflicts
        let err = orchestrator.execute(1).await.unwrap_err();
        assert!(matches!(err, MigrationError::ReferenceConflict(_)));
        assert_eq!(orchestrator.stats().references_recorded, 1);
    }

    #[tokio::test]
    async fn no_reference_when_shadow_failed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(InMemoryCrossReferenceStore::<u32, u32>::new());
        let orchestrator = MigrationOrchestrator::builder(
            "create",
            OperationKind::Create,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n))),
            recording_op(Arc::clone(&log), Source::Secondary, |_| {
                Err(BackendError::timeout("slow"))
            }),
        )
        .record_references(Arc::clone(&store), |p: &u32| *p, |s: &u32| *s)
        .build(handle(comparing()));

        assert_eq!(orchestrator.execute(1).await.unwrap(), Some(1));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn per_call_policy_overrides_handle() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = MigrationOrchestrator::builder(
            "read",
            OperationKind::Read,
            recording_op(Arc::clone(&log), Source::Primary, |n| Ok(Some(n))),
            recording_op(Arc::clone(&log), Source::Secondary, |n| Ok(Some(n))),
        )
        .build(handle(MigrationPolicy::new(Source::Primary)));

        let policy = Arc::new(comparing().validate().unwrap());
        orchestrator.execute_with(policy, 2).await.unwrap();
        assert_eq!(orchestrator.stats().dual_source_calls, 1);
        assert!(!orchestrator.policy().current().compare_enabled());
    }
}
