//! Migration policy
//!
//! Two-phase like the rest of the engine:
//! 1. **Construction**: a [`MigrationPolicy`] is built or deserialised, then
//!    [`MigrationPolicy::validate`] checks it once
//! 2. **Execution**: orchestrators only accept the resulting
//!    [`ValidatedPolicy`], so a malformed policy can never reach a call
//!
//! [`PolicyHandle`] lets a host flip the authoritative source at runtime.
//! Each call snapshots the handle once and routes with that snapshot.

use crate::error::PolicyError;
use crate::types::Source;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Policy as written by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPolicy {
    /// Authoritative system
    pub active_source: Source,
    /// Whether both systems are called so results can be compared
    #[serde(default)]
    pub compare_enabled: bool,
    /// Declared order of systems to consult
    #[serde(default = "default_consult_order")]
    pub consult_order: Vec<Source>,
    /// Whose identifiers callers see; defaults to the active source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_space: Option<Source>,
}

fn default_consult_order() -> Vec<Source> {
    vec![Source::Primary, Source::Secondary]
}

impl MigrationPolicy {
    /// Policy with `active` authoritative, comparison off
    #[inline]
    #[must_use]
    pub fn new(active: Source) -> Self {
        Self {
            active_source: active,
            compare_enabled: false,
            consult_order: if active == Source::Primary {
                default_consult_order()
            } else {
                vec![Source::Secondary, Source::Primary]
            },
            identifier_space: None,
        }
    }

    /// With comparison switched on or off
    #[inline]
    #[must_use]
    pub fn with_compare(mut self, enabled: bool) -> Self {
        self.compare_enabled = enabled;
        self
    }

    /// With an explicit consult order
    #[inline]
    #[must_use]
    pub fn with_consult_order(mut self, order: Vec<Source>) -> Self {
        self.consult_order = order;
        self
    }

    /// With an explicit identifier space
    #[inline]
    #[must_use]
    pub fn with_identifier_space(mut self, space: Source) -> Self {
        self.identifier_space = Some(space);
        self
    }

    /// Validate into the form orchestrators accept
    ///
    /// # Errors
    /// - `PolicyError::EmptyConsultOrder` if no system is listed
    /// - `PolicyError::DuplicateSource` if a system is listed twice
    /// - `PolicyError::ActiveSourceNotConsulted` if the active source is missing
    /// - `PolicyError::IncompleteConsultOrder` if comparison is on but a
    ///   system is missing
    /// - `PolicyError::IdentifierSpaceUnreachable` if comparison is off and
    ///   the identifier space is not the active source
    pub fn validate(self) -> Result<ValidatedPolicy, PolicyError> {
        if self.consult_order.is_empty() {
            return Err(PolicyError::EmptyConsultOrder);
        }

        for (i, source) in self.consult_order.iter().enumerate() {
            if self.consult_order[..i].contains(source) {
                return Err(PolicyError::DuplicateSource(*source));
            }
        }

        if !self.consult_order.contains(&self.active_source) {
            return Err(PolicyError::ActiveSourceNotConsulted {
                active: self.active_source,
            });
        }

        if self.compare_enabled {
            let missing = self.active_source.other();
            if !self.consult_order.contains(&missing) {
                return Err(PolicyError::IncompleteConsultOrder { missing });
            }
        }

        let identifier_space = self.identifier_space.unwrap_or(self.active_source);
        if !self.compare_enabled && identifier_space != self.active_source {
            return Err(PolicyError::IdentifierSpaceUnreachable {
                identifier_space,
                active: self.active_source,
            });
        }

        Ok(ValidatedPolicy {
            active_source: self.active_source,
            compare_enabled: self.compare_enabled,
            consult_order: self.consult_order,
            identifier_space,
        })
    }
}

impl Default for MigrationPolicy {
    fn default() -> Self {
        Self::new(Source::Primary)
    }
}

/// Policy that passed validation
///
/// Has no public constructor; the only way to obtain one is
/// [`MigrationPolicy::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPolicy {
    active_source: Source,
    compare_enabled: bool,
    consult_order: Vec<Source>,
    identifier_space: Source,
}

impl ValidatedPolicy {
    /// Authoritative system
    #[inline]
    #[must_use]
    pub fn active_source(&self) -> Source {
        self.active_source
    }

    /// Whether both systems are called
    #[inline]
    #[must_use]
    pub fn compare_enabled(&self) -> bool {
        self.compare_enabled
    }

    /// Declared consult order
    #[inline]
    #[must_use]
    pub fn consult_order(&self) -> &[Source] {
        &self.consult_order
    }

    /// Whose identifiers callers see
    #[inline]
    #[must_use]
    pub fn identifier_space(&self) -> Source {
        self.identifier_space
    }

    /// Ordered list of systems to invoke
    ///
    /// Exactly the active source when comparison is off (cut over: no cost on
    /// the other system), the full consult order otherwise. Pure; no I/O.
    #[must_use]
    pub fn plan(&self) -> Vec<Source> {
        if self.compare_enabled {
            self.consult_order.clone()
        } else {
            vec![self.active_source]
        }
    }

    /// Check if the policy is in the fully cut-over, single-system mode
    #[inline]
    #[must_use]
    pub fn is_cut_over(&self) -> bool {
        !self.compare_enabled
    }

    /// Check if a failure of `source` must fail the call
    ///
    /// The active source produces the data and the identifier-space source
    /// produces the identifier; without either the result would be wrong.
    #[inline]
    #[must_use]
    pub fn is_mandatory(&self, source: Source) -> bool {
        source == self.active_source || source == self.identifier_space
    }

    /// Back to the editable form
    #[must_use]
    pub fn to_policy(&self) -> MigrationPolicy {
        MigrationPolicy {
            active_source: self.active_source,
            compare_enabled: self.compare_enabled,
            consult_order: self.consult_order.clone(),
            identifier_space: Some(self.identifier_space),
        }
    }
}

/// Shared, swappable policy
///
/// Cloning shares the underlying slot. Readers take a short read lock to
/// clone an `Arc`; the lock is never held across an `.await`.
#[derive(Debug, Clone)]
pub struct PolicyHandle {
    current: Arc<RwLock<Arc<ValidatedPolicy>>>,
}

impl PolicyHandle {
    /// Create handle holding `policy`
    #[inline]
    #[must_use]
    pub fn new(policy: ValidatedPolicy) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(policy))),
        }
    }

    /// Snapshot of the current policy
    #[inline]
    #[must_use]
    pub fn current(&self) -> Arc<ValidatedPolicy> {
        let guard = self.current.read();
        Arc::clone(&*guard)
    }

    /// Install a validated policy, returning the previous one
    ///
    /// Calls already in flight keep the snapshot they started with.
    pub fn replace(&self, policy: ValidatedPolicy) -> Arc<ValidatedPolicy> {
        tracing::info!(
            active_source = %policy.active_source(),
            compare_enabled = policy.compare_enabled(),
            identifier_space = %policy.identifier_space(),
            "Migration policy replaced"
        );
        std::mem::replace(&mut *self.current.write(), Arc::new(policy))
    }

    /// Validate and install a policy
    ///
    /// # Errors
    /// Returns the validation error and leaves the current policy in place
    pub fn update(&self, policy: MigrationPolicy) -> Result<Arc<ValidatedPolicy>, PolicyError> {
        let validated = policy.validate()?;
        Ok(self.replace(validated))
    }
}

impl From<ValidatedPolicy> for PolicyHandle {
    fn from(policy: ValidatedPolicy) -> Self {
        Self::new(policy)
    }
}
