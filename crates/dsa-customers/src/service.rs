//! Customer services
//!
//! [`CustomerRepository`] is the capability both systems expose and the
//! migrating repository re-exposes. [`CustomerService`] is one backend
//! system: a named front for a [`CustomerStore`].

use crate::model::{ChangeCustomerName, CreateCustomerRequest, Customer, GetCustomerById};
use crate::store::CustomerStore;
use dsa_core::BackendError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Name of the system being retired
pub const LEGACY: &str = "legacy";
/// Name of the system taking over
pub const NEW: &str = "new";

/// Customer operations offered by a system
#[async_trait::async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Error returned by this repository
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a customer
    async fn save_customer(&self, request: CreateCustomerRequest) -> Result<Customer, Self::Error>;

    /// Look a customer up; `Ok(None)` if it does not exist
    async fn get_customer_by_id(
        &self,
        request: GetCustomerById,
    ) -> Result<Option<Customer>, Self::Error>;

    /// Rename a customer; `Ok(None)` if it does not exist
    async fn change_customer_name(
        &self,
        request: ChangeCustomerName,
    ) -> Result<Option<Customer>, Self::Error>;
}

/// One backend system holding customers
#[derive(Debug)]
pub struct CustomerService {
    name: &'static str,
    store: CustomerStore,
    available: AtomicBool,
    calls: AtomicU64,
}

impl CustomerService {
    /// Service named `name` over `store`
    #[must_use]
    pub fn new(name: &'static str, store: CustomerStore) -> Self {
        Self {
            name,
            store,
            available: AtomicBool::new(true),
            calls: AtomicU64::new(0),
        }
    }

    /// The system being retired, with an empty store
    #[must_use]
    pub fn legacy() -> Self {
        Self::new(LEGACY, CustomerStore::new())
    }

    /// The system taking over, with an empty store
    #[must_use]
    pub fn new_system() -> Self {
        Self::new(NEW, CustomerStore::new())
    }

    /// System name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &CustomerStore {
        &self.store
    }

    /// Simulate an outage: while unavailable every call fails
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        tracing::info!(system = self.name, available, "Availability changed");
    }

    /// Calls received, including failed ones
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::unavailable(format!(
                "{} customer service is unavailable",
                self.name
            )))
        }
    }
}

#[async_trait::async_trait]
impl CustomerRepository for CustomerService {
    type Error = BackendError;

    async fn save_customer(&self, request: CreateCustomerRequest) -> Result<Customer, BackendError> {
        self.begin()?;
        let customer = self.store.insert(request).await;
        tracing::info!(system = self.name, id = %customer.id, "Saved customer");
        Ok(customer)
    }

    async fn get_customer_by_id(
        &self,
        request: GetCustomerById,
    ) -> Result<Option<Customer>, BackendError> {
        self.begin()?;
        tracing::info!(system = self.name, id = %request.id, "Get customer");
        Ok(self.store.get(request.id).await)
    }

    async fn change_customer_name(
        &self,
        request: ChangeCustomerName,
    ) -> Result<Option<Customer>, BackendError> {
        self.begin()?;
        tracing::info!(system = self.name, id = %request.id, "Rename customer");
        Ok(self.store.rename(request.id, request.name).await)
    }
}
