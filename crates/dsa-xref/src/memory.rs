//! In-memory cross-reference store
//!
//! Provides [`InMemoryCrossReferenceStore`], backed by two [`DashMap`]s so
//! that unrelated entities never contend on a single lock.

use crate::error::XrefError;
use crate::store::CrossReferenceStore;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt::{self, Display};
use std::hash::Hash;

/// Process-lifetime cross-reference store
///
/// Two sharded maps hold the forward (`secondary -> primary`) and reverse
/// (`primary -> secondary`) directions. A `put` holds the forward shard for
/// its key while it claims the reverse slot, so racing puts for the same
/// secondary identifier serialise on that shard and exactly one wins.
///
/// Lock order is always forward then reverse; lookups take a single shard.
pub struct InMemoryCrossReferenceStore<S, P>
where
    S: Eq + Hash,
    P: Eq + Hash,
{
    forward: DashMap<S, P>,
    reverse: DashMap<P, S>,
}

impl<S, P> InMemoryCrossReferenceStore<S, P>
where
    S: Eq + Hash + Clone + Display,
    P: Eq + Hash + Clone + Display,
{
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            forward: DashMap::new(),
            reverse: DashMap::new(),
        }
    }

    /// Create empty store with room for `capacity` entries
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            forward: DashMap::with_capacity(capacity),
            reverse: DashMap::with_capacity(capacity),
        }
    }

    /// Copy of every `(secondary, primary)` pair, in no particular order
    #[must_use]
    pub fn snapshot(&self) -> Vec<(S, P)> {
        self.forward
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl<S, P> Default for InMemoryCrossReferenceStore<S, P>
where
    S: Eq + Hash + Clone + Display,
    P: Eq + Hash + Clone + Display,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, P> fmt::Debug for InMemoryCrossReferenceStore<S, P>
where
    S: Eq + Hash,
    P: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCrossReferenceStore")
            .field("entries", &self.forward.len())
            .finish()
    }
}

impl<S, P> CrossReferenceStore<S, P> for InMemoryCrossReferenceStore<S, P>
where
    S: Eq + Hash + Clone + Display + Send + Sync,
    P: Eq + Hash + Clone + Display + Send + Sync,
{
    fn put(&self, secondary: S, primary: P) -> Result<(), XrefError> {
        match self.forward.entry(secondary) {
            Entry::Occupied(existing) => Err(XrefError::Conflict {
                secondary: existing.key().to_string(),
                existing: existing.get().to_string(),
            }),
            Entry::Vacant(slot) => match self.reverse.entry(primary) {
                Entry::Occupied(taken) => Err(XrefError::PrimaryAlreadyMapped {
                    primary: taken.key().to_string(),
                    existing: taken.get().to_string(),
                }),
                Entry::Vacant(reverse_slot) => {
                    let primary = reverse_slot.key().clone();
                    reverse_slot.insert(slot.key().clone());
                    slot.insert(primary);
                    Ok(())
                }
            },
        }
    }

    fn get(&self, secondary: &S) -> Result<P, XrefError> {
        self.forward
            .get(secondary)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| XrefError::secondary_not_found(secondary))
    }

    fn get_secondary(&self, primary: &P) -> Result<S, XrefError> {
        self.reverse
            .get(primary)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| XrefError::primary_not_found(primary))
    }

    fn len(&self) -> usize {
        self.forward.len()
    }

    fn contains(&self, secondary: &S) -> bool {
        self.forward.contains_key(secondary)
    }
}
