//! Migrating customer repository
//!
//! Exposes [`CustomerRepository`] over two customer systems: the new system
//! plays Primary and the legacy system plays Secondary. The cross-reference
//! store maps legacy ids to new ids.
//!
//! Reads and renames first move the caller's id into the identifier space,
//! so a customer can be addressed by either system's id.
//!
//! Hooks:
//! - request adapters translate a customer id into the other system's space
//!   through the store
//! - the response adapter returns the active system's customer under the
//!   identifier-space id
//! - the comparator checks every field except the id

use crate::model::{Addressed, ChangeCustomerName, CreateCustomerRequest, Customer, GetCustomerById};
use crate::service::CustomerRepository;
use dsa_core::{
    backend_op, BackendError, BackendErrorKind, BackendOp, CallContext, Comparison, Hooks,
    MigrationError, MigrationOrchestrator, OperationKind, Outcome, PolicyHandle, PrimaryResult,
    SecondaryResult, Source, StatsSnapshot,
};
use dsa_xref::{CrossReferenceStore, InMemoryCrossReferenceStore};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A customer system as seen by the migrating repository
pub type CustomerSystem = Arc<dyn CustomerRepository<Error = BackendError>>;

/// Legacy id to new id mapping
pub type CustomerReferences = Arc<dyn CrossReferenceStore<Uuid, Uuid>>;

/// [`CustomerRepository`] that runs both customer systems during a migration
pub struct MigratingCustomerRepository {
    create: MigrationOrchestrator<CreateCustomerRequest, Customer>,
    read: MigrationOrchestrator<GetCustomerById, Customer>,
    update: MigrationOrchestrator<ChangeCustomerName, Customer>,
    references: CustomerReferences,
    policy: PolicyHandle,
}

impl MigratingCustomerRepository {
    /// Repository over `new_system` (Primary) and `legacy` (Secondary)
    #[must_use]
    pub fn new(
        new_system: CustomerSystem,
        legacy: CustomerSystem,
        references: CustomerReferences,
        policy: PolicyHandle,
    ) -> Self {
        let create = MigrationOrchestrator::builder(
            "create_customer",
            OperationKind::Create,
            create_op(&new_system),
            create_op(&legacy),
        )
        .hooks(customer_hooks())
        .record_references(Arc::clone(&references), |new: &Customer| new.id, |old: &Customer| old.id)
        .build(policy.clone());

        let read = MigrationOrchestrator::builder(
            "get_customer_by_id",
            OperationKind::Read,
            read_op(&new_system),
            read_op(&legacy),
        )
        .hooks(addressed_hooks(&references))
        .build(policy.clone());

        let update = MigrationOrchestrator::builder(
            "change_customer_name",
            OperationKind::Update,
            update_op(&new_system),
            update_op(&legacy),
        )
        .hooks(addressed_hooks(&references))
        .build(policy.clone());

        Self {
            create,
            read,
            update,
            references,
            policy,
        }
    }

    /// Repository with a fresh in-memory cross-reference store
    #[must_use]
    pub fn in_memory(new_system: CustomerSystem, legacy: CustomerSystem, policy: PolicyHandle) -> Self {
        Self::new(
            new_system,
            legacy,
            Arc::new(InMemoryCrossReferenceStore::new()),
            policy,
        )
    }

    /// Policy handle shared by the three operations
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }

    /// Cross-reference store
    #[inline]
    #[must_use]
    pub fn references(&self) -> &CustomerReferences {
        &self.references
    }

    /// Statistics for one operation
    #[must_use]
    pub fn stats(&self, kind: OperationKind) -> StatsSnapshot {
        match kind {
            OperationKind::Create => self.create.stats(),
            OperationKind::Read => self.read.stats(),
            OperationKind::Update => self.update.stats(),
        }
    }
}

#[async_trait::async_trait]
impl CustomerRepository for MigratingCustomerRepository {
    type Error = MigrationError;

    async fn save_customer(&self, request: CreateCustomerRequest) -> Result<Customer, MigrationError> {
        let policy = self.policy.current();
        let identifier_space = policy.identifier_space();

        self.create
            .execute_with(policy, request)
            .await?
            .ok_or_else(|| {
                MigrationError::backend(
                    identifier_space,
                    BackendError::new(BackendErrorKind::Other, "create returned no customer"),
                )
            })
    }

    async fn get_customer_by_id(
        &self,
        request: GetCustomerById,
    ) -> Result<Option<Customer>, MigrationError> {
        let policy = self.policy.current();
        let request = to_identifier_space(&self.references, policy.identifier_space(), request)?;
        self.read.execute_with(policy, request).await
    }

    async fn change_customer_name(
        &self,
        request: ChangeCustomerName,
    ) -> Result<Option<Customer>, MigrationError> {
        let policy = self.policy.current();
        let request = to_identifier_space(&self.references, policy.identifier_space(), request)?;
        self.update.execute_with(policy, request).await
    }
}

impl fmt::Debug for MigratingCustomerRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigratingCustomerRepository")
            .field("create", &self.create)
            .field("read", &self.read)
            .field("update", &self.update)
            .field("references", &self.references.len())
            .finish_non_exhaustive()
    }
}

fn create_op(system: &CustomerSystem) -> BackendOp<CreateCustomerRequest, Customer> {
    let system = Arc::clone(system);
    backend_op(move |request: CreateCustomerRequest| {
        let system = Arc::clone(&system);
        async move { system.save_customer(request).await.map(Some) }
    })
}

fn read_op(system: &CustomerSystem) -> BackendOp<GetCustomerById, Customer> {
    let system = Arc::clone(system);
    backend_op(move |request: GetCustomerById| {
        let system = Arc::clone(&system);
        async move { system.get_customer_by_id(request).await }
    })
}

fn update_op(system: &CustomerSystem) -> BackendOp<ChangeCustomerName, Customer> {
    let system = Arc::clone(system);
    backend_op(move |request: ChangeCustomerName| {
        let system = Arc::clone(&system);
        async move { system.change_customer_name(request).await }
    })
}

fn customer_hooks<Req: 'static>() -> Hooks<Req, Customer> {
    Hooks::new()
        .with_response_adapter(reconcile_customer)
        .with_comparator(compare_customers)
}

/// Hooks for requests naming an existing customer
fn addressed_hooks<Req>(references: &CustomerReferences) -> Hooks<Req, Customer>
where
    Req: Addressed + Send + 'static,
{
    customer_hooks()
        .with_secondary_request_adapter(to_legacy_id(Arc::clone(references)))
        .with_primary_request_adapter(to_new_id(Arc::clone(references)))
}

/// Move a caller id issued by the other system into the identifier space
///
/// Ids the store does not know are left alone.
fn to_identifier_space<Req: Addressed>(
    references: &CustomerReferences,
    identifier_space: Source,
    mut request: Req,
) -> Result<Req, MigrationError> {
    let id = request.customer_id();
    let mapped = match identifier_space {
        Source::Primary => references.get(&id),
        Source::Secondary => references.get_secondary(&id),
    };

    match mapped {
        Ok(mapped) => {
            tracing::debug!(from = %id, to = %mapped, "Caller id moved into identifier space");
            request.set_customer_id(mapped);
            Ok(request)
        }
        Err(error) if error.is_not_found() => Ok(request),
        Err(error) => Err(error.into()),
    }
}

/// Retarget a request at the legacy copy of the customer the new system found
///
/// When the new system found nothing the request goes on unchanged; it then
/// names no legacy customer and the legacy side reports absent.
fn to_legacy_id<Req: Addressed + 'static>(
    references: CustomerReferences,
) -> impl Fn(&CallContext, Req, &PrimaryResult<Customer>) -> Result<Req, MigrationError> + Send + Sync + 'static
{
    move |_: &CallContext, mut request: Req, new: &PrimaryResult<Customer>| {
        if let Some(customer) = new.value() {
            request.set_customer_id(references.get_secondary(&customer.id)?);
        }
        Ok(request)
    }
}

/// Retarget a request at the new copy of the customer the legacy system found
///
/// When the legacy system found nothing the request goes on unchanged.
fn to_new_id<Req: Addressed + 'static>(
    references: CustomerReferences,
) -> impl Fn(&CallContext, Req, &SecondaryResult<Customer>) -> Result<Req, MigrationError> + Send + Sync + 'static
{
    move |_: &CallContext, mut request: Req, legacy: &SecondaryResult<Customer>| {
        if let Some(customer) = legacy.value() {
            request.set_customer_id(references.get(&customer.id)?);
        }
        Ok(request)
    }
}

fn pick<'a>(
    source: Source,
    new: &'a PrimaryResult<Customer>,
    legacy: &'a SecondaryResult<Customer>,
) -> Option<&'a Customer> {
    match source {
        Source::Primary => new.value(),
        Source::Secondary => legacy.value(),
    }
}

/// The active system's customer, carrying the identifier-space id
///
/// `None` if either of those systems has no customer.
#[must_use]
pub fn reconcile_customer(
    ctx: &CallContext,
    new: &PrimaryResult<Customer>,
    legacy: &SecondaryResult<Customer>,
) -> Option<Customer> {
    let active = pick(ctx.active_source(), new, legacy)?;
    let id = pick(ctx.identifier_space(), new, legacy)?.id;
    Some(active.clone().with_id(id))
}

/// Field-by-field comparison ignoring ids
#[must_use]
pub fn compare_customers(
    _: &CallContext,
    new: &PrimaryResult<Customer>,
    legacy: &SecondaryResult<Customer>,
) -> Comparison {
    match (new.outcome(), legacy.outcome()) {
        (Outcome::Value(a), Outcome::Value(b)) => {
            a.first_difference(b).map_or(Comparison::Match, Comparison::diverged)
        }
        (Outcome::Absent, Outcome::Absent) => Comparison::Match,
        (Outcome::Value(_), Outcome::Absent) => Comparison::diverged("customer missing from legacy"),
        (Outcome::Absent, Outcome::Value(_)) => Comparison::diverged("customer missing from new"),
        (Outcome::Failed(_), _) | (_, Outcome::Failed(_)) => Comparison::Skipped,
    }
}
