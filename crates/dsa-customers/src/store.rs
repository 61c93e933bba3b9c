//! In-memory customer storage
//!
//! Each backend system owns one [`CustomerStore`]. Latency can be simulated
//! to make the two systems interleave the way remote services would.

use crate::model::{CreateCustomerRequest, Customer};
use dashmap::DashMap;
use std::time::Duration;
use uuid::Uuid;

/// Customer records keyed by system-local identifier
#[derive(Debug, Default)]
pub struct CustomerStore {
    customers: DashMap<Uuid, Customer>,
    latency: Duration,
}

impl CustomerStore {
    /// Empty store without latency
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Store a new customer under a fresh identifier
    pub async fn insert(&self, request: CreateCustomerRequest) -> Customer {
        self.delay().await;

        let customer = Customer {
            id: Uuid::new_v4(),
            name: request.name,
            surname: request.surname,
            age: request.age,
        };
        self.customers.insert(customer.id, customer.clone());
        customer
    }

    /// Look a customer up
    pub async fn get(&self, id: Uuid) -> Option<Customer> {
        self.delay().await;
        self.customers.get(&id).map(|entry| entry.value().clone())
    }

    /// Change a customer's first name, returning the updated record
    pub async fn rename(&self, id: Uuid, name: String) -> Option<Customer> {
        self.delay().await;
        self.customers.get_mut(&id).map(|mut entry| {
            entry.name = name;
            entry.value().clone()
        })
    }

    /// Number of stored customers
    #[must_use]
    pub fn len(&self) -> usize {
        self.customers.len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}
