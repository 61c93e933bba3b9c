//! Functional tests for migrating customers from the legacy system to the
//! new one.
//!
//! Core guarantees exercised here:
//! - Dual writes land in both systems and record exactly one reference.
//! - Callers only ever see identifiers of the policy's identifier space.
//! - A failing shadow system never fails the caller.
//! - Missing references and missing customers are told apart.
//! - Concurrent writes that collide on an identifier leave one winner.

use dsa_core::{
    BackendError, MigrationError, MigrationPolicy, OperationKind, PolicyHandle, Source,
    ValidatedPolicy,
};
use dsa_customers::{
    ChangeCustomerName, CreateCustomerRequest, Customer, CustomerRepository, CustomerService,
    GetCustomerById, MigratingCustomerRepository,
};
use dsa_test_utils::{cut_over, init_test_logging, shadowing_primary, shadowing_secondary};
use dsa_xref::CrossReferenceStore;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use uuid::Uuid;

struct Harness {
    new: Arc<CustomerService>,
    legacy: Arc<CustomerService>,
    repository: MigratingCustomerRepository,
}

fn harness(policy: ValidatedPolicy) -> Harness {
    init_test_logging();
    let new = Arc::new(CustomerService::new_system());
    let legacy = Arc::new(CustomerService::legacy());
    let repository = MigratingCustomerRepository::in_memory(
        Arc::<CustomerService>::clone(&new),
        Arc::<CustomerService>::clone(&legacy),
        PolicyHandle::new(policy),
    );

    Harness {
        new,
        legacy,
        repository,
    }
}

fn legacy_ids() -> ValidatedPolicy {
    MigrationPolicy::new(Source::Primary)
        .with_compare(true)
        .with_identifier_space(Source::Secondary)
        .validate()
        .unwrap()
}

fn gianni() -> CreateCustomerRequest {
    CreateCustomerRequest::new("Gianni", "Pinotto", 41)
}

/// Tenet: a dual write stores the customer in both systems and returns the
/// new system's identifier.
///
/// Policy `{ active: new, compare: true, order: [new, legacy] }`. The
/// reference store must map the legacy id to the new id, and reading with
/// the returned id must give back the same customer.
#[tokio::test]
async fn dual_write_then_read_round_trips() -> anyhow::Result<()> {
    let h = harness(shadowing_secondary());

    let created = h.repository.save_customer(gianni()).await?;
    assert_eq!(created.name, "Gianni");
    assert_eq!(created.surname, "Pinotto");
    assert_eq!(created.age, 41);

    assert_eq!(h.new.store().get(created.id).await, Some(created.clone()));
    assert_eq!(h.legacy.store().len(), 1);

    let references = h.repository.references();
    assert_eq!(references.len(), 1);
    let legacy_id = references.get_secondary(&created.id)?;
    assert_eq!(references.get(&legacy_id)?, created.id);

    let legacy_copy = h.legacy.store().get(legacy_id).await.unwrap();
    assert!(legacy_copy.same_details(&created));

    let found = h
        .repository
        .get_customer_by_id(GetCustomerById::new(created.id))
        .await?;
    assert_eq!(found, Some(created));
    Ok(())
}

/// Tenet: a legacy id resolves to the same customer as its new id.
///
/// Callers may still hold ids handed out by the legacy system. Reading or
/// renaming with one must reach the mapped customer and answer with the
/// new id, not report it missing.
#[tokio::test]
async fn legacy_id_resolves_to_new_customer() -> anyhow::Result<()> {
    let h = harness(shadowing_secondary());
    let created = h.repository.save_customer(gianni()).await?;
    let legacy_id = h.repository.references().get_secondary(&created.id)?;

    let found = h
        .repository
        .get_customer_by_id(GetCustomerById::new(legacy_id))
        .await?;
    assert_eq!(found, Some(created.clone()));

    let renamed = h
        .repository
        .change_customer_name(ChangeCustomerName::new(legacy_id, "Gianna"))
        .await?
        .unwrap();
    assert_eq!(renamed.id, created.id);
    assert_eq!(h.legacy.store().get(legacy_id).await.unwrap().name, "Gianna");
    assert_eq!(h.new.store().get(created.id).await.unwrap().name, "Gianna");
    Ok(())
}

/// Tenet: while legacy is still authoritative it supplies both data and id.
///
/// Policy `{ active: legacy, compare: true }`. The new system is written
/// first as a shadow; a new-system outage must not reach the caller.
#[tokio::test]
async fn legacy_authoritative_shadows_new_system() -> anyhow::Result<()> {
    let h = harness(shadowing_primary());

    let created = h.repository.save_customer(gianni()).await?;
    assert_eq!(h.legacy.store().get(created.id).await, Some(created.clone()));
    let new_id = h.repository.references().get(&created.id)?;
    assert!(h.new.store().get(new_id).await.unwrap().same_details(&created));

    let found = h
        .repository
        .get_customer_by_id(GetCustomerById::new(created.id))
        .await?;
    assert_eq!(found, Some(created));

    h.new.set_available(false);

    let during_outage = h.repository.save_customer(gianni()).await?;
    assert!(h.legacy.store().get(during_outage.id).await.is_some());
    assert!(!h.repository.references().contains(&during_outage.id));

    let found = h
        .repository
        .get_customer_by_id(GetCustomerById::new(during_outage.id))
        .await?;
    assert_eq!(found, Some(during_outage));

    assert_eq!(h.repository.stats(OperationKind::Create).shadow_failures, 1);
    assert_eq!(h.repository.stats(OperationKind::Read).shadow_failures, 1);
    Ok(())
}

/// Tenet: with legacy identifiers the caller keeps seeing legacy ids while
/// the data comes from the new system.
///
/// This is the classic strangler setup: clients still hold legacy ids, reads
/// go legacy first, then through the reference store to the new system.
#[tokio::test]
async fn legacy_identifier_space_hides_new_ids() -> anyhow::Result<()> {
    let h = harness(legacy_ids());

    let created = h.repository.save_customer(gianni()).await?;
    assert!(h.legacy.store().get(created.id).await.is_some());
    assert!(h.new.store().get(created.id).await.is_none());

    let new_id = h.repository.references().get(&created.id)?;
    assert!(h.new.store().get(new_id).await.is_some());

    let found = h
        .repository
        .get_customer_by_id(GetCustomerById::new(created.id))
        .await?;
    assert_eq!(found, Some(created));
    Ok(())
}

/// Tenet: after cut-over the legacy system receives no traffic at all.
#[tokio::test]
async fn cut_over_leaves_legacy_idle() -> anyhow::Result<()> {
    let h = harness(cut_over(Source::Primary));

    let created = h.repository.save_customer(gianni()).await?;
    h.repository
        .get_customer_by_id(GetCustomerById::new(created.id))
        .await?;
    h.repository
        .change_customer_name(ChangeCustomerName::new(created.id, "Gianna"))
        .await?;

    assert_eq!(h.legacy.calls(), 0);
    assert_eq!(h.new.calls(), 3);
    assert!(h.repository.references().is_empty());
    Ok(())
}

/// Tenet: a broken shadow system never breaks the caller.
///
/// The legacy system is down for the whole test. Creates and reads must
/// still succeed with new-system data; the failures are counted instead.
#[tokio::test]
async fn legacy_outage_is_isolated() -> anyhow::Result<()> {
    let h = harness(shadowing_secondary());
    h.legacy.set_available(false);

    let created = h.repository.save_customer(gianni()).await?;
    assert_eq!(h.new.store().get(created.id).await, Some(created.clone()));
    assert!(h.repository.references().is_empty());

    let found = h
        .repository
        .get_customer_by_id(GetCustomerById::new(created.id))
        .await?;
    assert_eq!(found, Some(created));

    assert_eq!(h.repository.stats(OperationKind::Create).shadow_failures, 1);
    assert_eq!(h.repository.stats(OperationKind::Read).shadow_failures, 1);
    Ok(())
}

/// Tenet: an outage of the identifier-space system does surface.
///
/// Without it the returned customer could not carry a legacy id.
#[tokio::test]
async fn identifier_space_outage_surfaces() {
    let h = harness(legacy_ids());
    h.legacy.set_available(false);

    let err = h.repository.save_customer(gianni()).await.unwrap_err();
    assert_eq!(err.failed_source(), Some(Source::Secondary));
    assert!(err.is_retryable());
}

/// Tenet: reads without an intervening write are idempotent.
#[tokio::test]
async fn repeated_reads_agree() -> anyhow::Result<()> {
    let h = harness(legacy_ids());
    let created = h.repository.save_customer(gianni()).await?;

    let first = h
        .repository
        .get_customer_by_id(GetCustomerById::new(created.id))
        .await?;
    let second = h
        .repository
        .get_customer_by_id(GetCustomerById::new(created.id))
        .await?;
    assert_eq!(first, second);
    Ok(())
}

/// Tenet: a missing reference is not a missing customer.
///
/// A customer that exists only in the legacy system has no reference. The
/// caller must get `ReferenceNotFound`, while an unknown id is `Ok(None)`.
#[tokio::test]
async fn missing_reference_differs_from_missing_customer() -> anyhow::Result<()> {
    let h = harness(legacy_ids());
    let orphan = h.legacy.save_customer(gianni()).await?;

    let err = h
        .repository
        .get_customer_by_id(GetCustomerById::new(orphan.id))
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::ReferenceNotFound(_)));
    assert!(err.indicates_desync());

    let unknown = h
        .repository
        .get_customer_by_id(GetCustomerById::new(Uuid::new_v4()))
        .await?;
    assert_eq!(unknown, None);
    Ok(())
}

/// Tenet: renames reach both systems and keep the caller's identifier.
#[tokio::test]
async fn rename_updates_both_systems() -> anyhow::Result<()> {
    let h = harness(legacy_ids());
    let created = h.repository.save_customer(gianni()).await?;

    let renamed = h
        .repository
        .change_customer_name(ChangeCustomerName::new(created.id, "Gianna"))
        .await?
        .unwrap();
    assert_eq!(renamed.id, created.id);
    assert_eq!(renamed.name, "Gianna");

    let new_id = h.repository.references().get(&created.id)?;
    assert_eq!(h.new.store().get(new_id).await.unwrap().name, "Gianna");
    assert_eq!(h.legacy.store().get(created.id).await.unwrap().name, "Gianna");
    assert_eq!(h.repository.stats(OperationKind::Update).divergences, 0);
    Ok(())
}

/// Tenet: divergent data is reported, and the active system's data wins.
#[tokio::test]
async fn divergence_is_reported_not_returned() -> anyhow::Result<()> {
    let h = harness(legacy_ids());
    let created = h.repository.save_customer(gianni()).await?;

    // Edit the legacy copy behind the repository's back
    h.legacy
        .change_customer_name(ChangeCustomerName::new(created.id, "Giovanni"))
        .await?;

    let found = h
        .repository
        .get_customer_by_id(GetCustomerById::new(created.id))
        .await?
        .unwrap();
    assert_eq!(found.name, "Gianni");
    assert_eq!(h.repository.stats(OperationKind::Read).divergences, 1);
    Ok(())
}

/// Tenet: flipping the policy moves traffic on the next call.
#[tokio::test]
async fn policy_flip_retires_legacy() -> anyhow::Result<()> {
    let h = harness(shadowing_secondary());
    let created = h.repository.save_customer(gianni()).await?;
    let legacy_calls = h.legacy.calls();

    h.repository.policy().replace(cut_over(Source::Primary));

    let found = h
        .repository
        .get_customer_by_id(GetCustomerById::new(created.id))
        .await?;
    assert_eq!(found, Some(created));
    assert_eq!(h.legacy.calls(), legacy_calls);
    Ok(())
}

/// Legacy system that hands out the same id for every customer
struct FixedIdLegacy {
    id: Uuid,
}

#[async_trait::async_trait]
impl CustomerRepository for FixedIdLegacy {
    type Error = BackendError;

    async fn save_customer(&self, request: CreateCustomerRequest) -> Result<Customer, BackendError> {
        tokio::task::yield_now().await;
        Ok(Customer {
            id: self.id,
            name: request.name,
            surname: request.surname,
            age: request.age,
        })
    }

    async fn get_customer_by_id(
        &self,
        _: GetCustomerById,
    ) -> Result<Option<Customer>, BackendError> {
        Ok(None)
    }

    async fn change_customer_name(
        &self,
        _: ChangeCustomerName,
    ) -> Result<Option<Customer>, BackendError> {
        Ok(None)
    }
}

/// Tenet: two writes colliding on a legacy id leave exactly one reference.
///
/// Both creates reach both systems; the store lets one `put` win and the
/// other caller sees a reference conflict rather than a silent overwrite.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn colliding_writes_leave_one_reference() {
    init_test_logging();
    let new = Arc::new(CustomerService::new_system());
    let legacy = Arc::new(FixedIdLegacy { id: Uuid::new_v4() });
    let repository = Arc::new(MigratingCustomerRepository::in_memory(
        Arc::<CustomerService>::clone(&new),
        legacy,
        PolicyHandle::new(shadowing_secondary()),
    ));

    let first = {
        let repository = Arc::clone(&repository);
        tokio::spawn(async move { repository.save_customer(gianni()).await })
    };
    let second = {
        let repository = Arc::clone(&repository);
        tokio::spawn(async move { repository.save_customer(gianni()).await })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(MigrationError::ReferenceConflict(_))))
        .count();

    assert_eq!(wins, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(repository.references().len(), 1);
    assert_eq!(new.store().len(), 2);
}

#[test]
fn customers_serialize_with_plain_field_names() {
    let customer = Customer {
        id: Uuid::nil(),
        name: "Gianni".into(),
        surname: "Pinotto".into(),
        age: 41,
    };

    let json = serde_json::to_value(&customer).unwrap();
    assert_eq!(json["name"], "Gianni");
    assert_eq!(json["age"], 41);

    let back: Customer = serde_json::from_value(json).unwrap();
    assert_eq!(back, customer);
}
