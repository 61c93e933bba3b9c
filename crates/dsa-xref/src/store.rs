//! Cross-reference store trait
//!
//! Provides [`CrossReferenceStore`], the seam hosts use to swap the
//! in-memory backing for a durable one.

use crate::error::XrefError;

/// Mapping from secondary identifiers to primary identifiers
///
/// The methods are synchronous on purpose: an orchestrated call never holds
/// a store lock across an `.await`, and a durable backing that needs I/O is
/// expected to block briefly or front itself with a cache.
///
/// # Contract
/// - `put` is write-once per secondary identifier: a second `put` for the
///   same key fails with [`XrefError::Conflict`] and leaves the entry intact.
/// - The mapping is one-to-one: a primary identifier that is already a
///   target fails with [`XrefError::PrimaryAlreadyMapped`].
/// - `get` and `get_secondary` fail with [`XrefError::NotFound`] rather than
///   returning a default.
pub trait CrossReferenceStore<S, P>: Send + Sync {
    /// Record that `secondary` and `primary` identify the same entity
    ///
    /// # Errors
    /// - `XrefError::Conflict` if `secondary` is already mapped
    /// - `XrefError::PrimaryAlreadyMapped` if `primary` is already a target
    fn put(&self, secondary: S, primary: P) -> Result<(), XrefError>;

    /// Resolve a secondary identifier to its primary identifier
    ///
    /// # Errors
    /// `XrefError::NotFound` if no entry exists
    fn get(&self, secondary: &S) -> Result<P, XrefError>;

    /// Resolve a primary identifier back to its secondary identifier
    ///
    /// # Errors
    /// `XrefError::NotFound` if no entry targets `primary`
    fn get_secondary(&self, primary: &P) -> Result<S, XrefError>;

    /// Number of entries
    fn len(&self) -> usize;

    /// Check if a secondary identifier is mapped
    fn contains(&self, secondary: &S) -> bool {
        self.get(secondary).is_ok()
    }

    /// Check if the store has no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S, P, T> CrossReferenceStore<S, P> for std::sync::Arc<T>
where
    T: CrossReferenceStore<S, P> + ?Sized,
{
    fn put(&self, secondary: S, primary: P) -> Result<(), XrefError> {
        (**self).put(secondary, primary)
    }

    fn get(&self, secondary: &S) -> Result<P, XrefError> {
        (**self).get(secondary)
    }

    fn get_secondary(&self, primary: &P) -> Result<S, XrefError> {
        (**self).get_secondary(primary)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
