//! Error types for the cross-reference store

/// Cross-reference store errors
///
/// Identifiers are carried in their display form so the error type stays
/// independent of the identifier types a host picks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XrefError {
    /// No entry exists for the requested identifier
    #[error("no cross-reference for {space} identifier {id}")]
    NotFound {
        /// Which identifier space was searched ("secondary" or "primary")
        space: &'static str,
        /// The identifier that was looked up
        id: String,
    },

    /// An entry for this secondary identifier already exists
    #[error("cross-reference conflict: secondary {secondary} already maps to {existing}")]
    Conflict {
        /// Secondary identifier of the rejected put
        secondary: String,
        /// Primary identifier already stored for it
        existing: String,
    },

    /// The primary identifier is already the target of another entry
    #[error("primary identifier {primary} already mapped from secondary {existing}")]
    PrimaryAlreadyMapped {
        /// Primary identifier of the rejected put
        primary: String,
        /// Secondary identifier already mapped to it
        existing: String,
    },

    /// Durable backing failed
    #[error("cross-reference backing failed: {0}")]
    Backing(String),
}

impl XrefError {
    /// Missing-entry error for a secondary identifier
    #[inline]
    pub fn secondary_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            space: "secondary",
            id: id.to_string(),
        }
    }

    /// Missing-entry error for a primary identifier
    #[inline]
    pub fn primary_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            space: "primary",
            id: id.to_string(),
        }
    }

    /// Check if the error is a lookup miss
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if the error is a rejected double write
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::PrimaryAlreadyMapped { .. })
    }
}
