//! DSA Core - Dual-Source Adapter
//!
//! Runs a logical operation against two backend systems while data moves
//! from one to the other:
//! - Validates the migration policy (active source, compare flag, consult
//!   order, identifier space)
//! - Plans which systems to call and in what order
//! - Adapts the second request from the first result
//! - Compares and reconciles both results
//! - Records identifier pairs in a cross-reference store
//!
//! # Example
//!
//! ```rust
//! use dsa_core::prelude::*;
//!
//! # async fn example() -> Result<(), MigrationError> {
//! let policy = MigrationPolicy::new(Source::Primary)
//!     .with_compare(true)
//!     .validate()?;
//!
//! let orchestrator = MigrationOrchestrator::builder(
//!     "double",
//!     OperationKind::Read,
//!     backend_op(|n: u32| async move { Ok(Some(n * 2)) }),
//!     backend_op(|n: u32| async move { Ok(Some(n + n)) }),
//! )
//! .build(PolicyHandle::new(policy));
//!
//! assert_eq!(orchestrator.execute(21).await?, Some(42));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod envelope;
pub mod error;
pub mod hooks;
pub mod orchestrator;
pub mod policy;
pub mod stats;
pub mod telemetry;
pub mod types;

// Re-exports for convenience
pub use backend::{backend_op, BackendOp};
pub use envelope::{Outcome, PrimaryResult, SecondaryResult};
pub use error::{BackendError, BackendErrorKind, ConfigError, MigrationError, PolicyError};
pub use hooks::{
    Comparator, Comparison, Hooks, PrimaryRequestAdapter, ResponseAdapter,
    SecondaryRequestAdapter,
};
pub use orchestrator::{MigrationOrchestrator, OrchestratorBuilder};
pub use policy::{MigrationPolicy, PolicyHandle, ValidatedPolicy};
pub use stats::{OrchestratorStats, StatsSnapshot};
pub use types::{CallContext, CallId, CallOrder, OperationKind, Source};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building orchestrated operations
    pub use crate::{
        backend_op, BackendError, BackendOp, CallContext, CallOrder, Comparison, Hooks,
        MigrationError, MigrationOrchestrator, MigrationPolicy, OperationKind, PolicyHandle,
        PrimaryResult, SecondaryResult, Source,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
