//! DSA Customers
//!
//! Customer management moving from a legacy system to a new one:
//! - **model**: customers and the requests addressed to them
//! - **store**: in-memory customer storage with simulated latency
//! - **service**: the [`CustomerRepository`] capability and one backend system
//! - **adapter**: the migrating repository running both systems
//!
//! # Example
//!
//! ```rust
//! use dsa_core::{MigrationPolicy, PolicyHandle, Source};
//! use dsa_customers::{
//!     CreateCustomerRequest, CustomerRepository, CustomerService, GetCustomerById,
//!     MigratingCustomerRepository,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = MigrationPolicy::new(Source::Primary)
//!     .with_compare(true)
//!     .validate()?;
//!
//! let repository = MigratingCustomerRepository::in_memory(
//!     Arc::new(CustomerService::new_system()),
//!     Arc::new(CustomerService::legacy()),
//!     PolicyHandle::new(policy),
//! );
//!
//! let created = repository
//!     .save_customer(CreateCustomerRequest::new("Gianni", "Pinotto", 41))
//!     .await?;
//! let found = repository.get_customer_by_id(GetCustomerById::new(created.id)).await?;
//! assert_eq!(found, Some(created));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod adapter;
pub mod model;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use adapter::{CustomerReferences, CustomerSystem, MigratingCustomerRepository};
pub use model::{Addressed, ChangeCustomerName, CreateCustomerRequest, Customer, GetCustomerById};
pub use service::{CustomerRepository, CustomerService, LEGACY, NEW};
pub use store::CustomerStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
