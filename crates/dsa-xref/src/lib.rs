//! DSA Cross-Reference Store
//!
//! Maps the identifier space of one backend system onto the other's.
//!
//! # Overview
//!
//! When the same logical entity lives in two systems, each system issues its
//! own identifier. The cross-reference store remembers the pair:
//! - **CrossReferenceStore**: the trait hosts implement for durable backings
//! - **InMemoryCrossReferenceStore**: sharded, per-key locked in-memory store
//! - **XrefError**: not-found and conflict conditions
//!
//! Entries are keyed by the secondary system's identifier. Each entry is
//! written once; a second `put` for the same secondary identifier fails
//! instead of overwriting.
//!
//! # Example
//!
//! ```rust
//! use dsa_xref::{CrossReferenceStore, InMemoryCrossReferenceStore, XrefError};
//!
//! let store = InMemoryCrossReferenceStore::<u64, String>::new();
//! store.put(7, "cust-7".to_string()).unwrap();
//!
//! assert_eq!(store.get(&7).unwrap(), "cust-7");
//! assert_eq!(store.get_secondary(&"cust-7".to_string()).unwrap(), 7);
//! assert!(matches!(store.get(&8), Err(XrefError::NotFound { .. })));
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod store;

// Re-exports
pub use error::XrefError;
pub use memory::InMemoryCrossReferenceStore;
pub use store::CrossReferenceStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
