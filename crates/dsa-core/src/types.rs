//! Core types for DSA
//!
//! Defines the vocabulary shared by the policy, hooks and orchestrator:
//! - Which system a value belongs to
//! - What kind of operation is being orchestrated
//! - The order in which two systems are called
//! - The per-call context handed to every hook

use crate::policy::ValidatedPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ulid::Ulid;

/// One of the two backend systems
///
/// The labels are fixed per deployment. Which of them is authoritative is a
/// policy setting, independent of the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// The system whose identifiers are the cross-reference targets
    Primary,
    /// The system whose identifiers key the cross-reference store
    Secondary,
}

impl Source {
    /// The other system
    #[inline]
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }

    /// Lowercase label, used in logs and metric labels
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

/// Kind of logical operation an orchestrator runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Allocates a new entity in both systems
    Create,
    /// Reads an existing entity
    Read,
    /// Mutates an existing entity without allocating identifiers
    Update,
}

impl OperationKind {
    /// Call order used when the orchestrator is not told otherwise
    ///
    /// Creates propagate the primary's freshly allocated identifier to the
    /// secondary. Reads and updates start from the system whose identifiers
    /// the caller holds and reach the other one through the store.
    #[inline]
    #[must_use]
    pub fn default_call_order(self) -> CallOrder {
        match self {
            Self::Create => CallOrder::PrimaryFirst,
            Self::Read | Self::Update => CallOrder::IdentifierSpaceFirst,
        }
    }

    /// Lowercase label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
        }
    }
}

/// Order in which the two systems are called when both are consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOrder {
    /// Primary, then secondary with a request adapted from the primary result
    PrimaryFirst,
    /// Secondary, then primary with a request adapted from the secondary result
    SecondaryFirst,
    /// Start with the policy's identifier space, then the other system
    IdentifierSpaceFirst,
    /// Follow the policy's consult order
    PolicyOrder,
    /// Both at once with the original request; request adapters are skipped
    Concurrent,
}

/// Unique call identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallId(pub Ulid);

impl CallId {
    /// Generate new call ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context for one orchestrated call, handed to every hook
///
/// Carries the policy snapshot taken at call start, so hooks see the same
/// policy the orchestrator routed with even if the host swaps it mid-call.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Call identifier, also recorded on the tracing span
    pub call_id: CallId,
    /// Operation name given at orchestrator construction
    pub operation: Arc<str>,
    /// Operation kind
    pub kind: OperationKind,
    policy: Arc<ValidatedPolicy>,
}

impl CallContext {
    /// Create context for a new call
    #[inline]
    #[must_use]
    pub fn new(operation: Arc<str>, kind: OperationKind, policy: Arc<ValidatedPolicy>) -> Self {
        Self {
            call_id: CallId::new(),
            operation,
            kind,
            policy,
        }
    }

    /// Policy snapshot for this call
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &ValidatedPolicy {
        &self.policy
    }

    /// Authoritative system for this call
    #[inline]
    #[must_use]
    pub fn active_source(&self) -> Source {
        self.policy.active_source()
    }

    /// System whose identifiers the caller sees
    #[inline]
    #[must_use]
    pub fn identifier_space(&self) -> Source {
        self.policy.identifier_space()
    }
}
