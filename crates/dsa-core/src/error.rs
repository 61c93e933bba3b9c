//! Error types for DSA Core
//!
//! Provides the error taxonomy seen by callers of an orchestrated operation:
//! - Backend failures (a system call itself failed)
//! - Cross-reference misses and conflicts (the two systems are out of sync)
//! - Policy configuration errors (detected at construction time)
//! - Configuration loading errors

use crate::types::Source;
use dsa_xref::XrefError;
use std::path::PathBuf;

/// Main migration error type
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// A mandatory backend call failed
    #[error("{source_system} backend failed: {error}")]
    Backend {
        /// System whose call failed
        source_system: Source,
        /// The backend's own error
        #[source]
        error: BackendError,
    },

    /// Cross-reference lookup missed
    #[error("reference not found: {0}")]
    ReferenceNotFound(#[source] XrefError),

    /// Cross-reference already recorded for this identifier
    #[error("reference conflict: {0}")]
    ReferenceConflict(#[source] XrefError),

    /// Cross-reference backing failed
    #[error("cross-reference store failed: {0}")]
    Store(#[source] XrefError),

    /// Policy failed validation
    #[error("policy configuration error: {0}")]
    PolicyConfiguration(#[from] PolicyError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl MigrationError {
    /// Wrap a backend failure with the system it came from
    #[inline]
    #[must_use]
    pub fn backend(source_system: Source, error: BackendError) -> Self {
        Self::Backend {
            source_system,
            error,
        }
    }

    /// Check if the caller may retry the whole operation
    ///
    /// The orchestrator never retries on its own.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend { error, .. } if error.is_transient())
    }

    /// Check if the error means the two systems disagree about an entity
    #[inline]
    #[must_use]
    pub fn indicates_desync(&self) -> bool {
        matches!(self, Self::ReferenceNotFound(_) | Self::ReferenceConflict(_))
    }

    /// System whose backend call failed, if any
    #[inline]
    #[must_use]
    pub fn failed_source(&self) -> Option<Source> {
        match self {
            Self::Backend { source_system, .. } => Some(*source_system),
            _ => None,
        }
    }
}

impl From<XrefError> for MigrationError {
    fn from(error: XrefError) -> Self {
        match error {
            XrefError::NotFound { .. } => Self::ReferenceNotFound(error),
            XrefError::Conflict { .. } | XrefError::PrimaryAlreadyMapped { .. } => {
                Self::ReferenceConflict(error)
            }
            XrefError::Backing(_) => Self::Store(error),
        }
    }
}

/// Failure reported by a backend operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    /// Failure classification
    pub kind: BackendErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl BackendError {
    /// Create new backend error
    #[inline]
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Backend could not be reached
    #[inline]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unavailable, message)
    }

    /// Backend did not answer in time
    #[inline]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Timeout, message)
    }

    /// Backend storage failed
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Storage, message)
    }

    /// Backend refused the request
    #[inline]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Rejected, message)
    }

    /// Check if the failure is likely to clear on its own
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            BackendErrorKind::Unavailable | BackendErrorKind::Timeout
        )
    }
}

/// Backend failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    /// Network or service unreachable
    Unavailable,
    /// Call exceeded its deadline
    Timeout,
    /// Underlying storage failed
    Storage,
    /// Request refused by the backend
    Rejected,
    /// Anything else
    Other,
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unavailable => "unavailable",
            Self::Timeout => "timeout",
            Self::Storage => "storage",
            Self::Rejected => "rejected",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Policy validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Consult order names no system
    #[error("consult order is empty")]
    EmptyConsultOrder,

    /// A system appears twice in the consult order
    #[error("{0} appears more than once in the consult order")]
    DuplicateSource(Source),

    /// Active source missing from the consult order
    #[error("active source {active} is not in the consult order")]
    ActiveSourceNotConsulted {
        /// Declared active source
        active: Source,
    },

    /// Comparison needs both systems
    #[error("comparison enabled but {missing} is not in the consult order")]
    IncompleteConsultOrder {
        /// System the consult order lacks
        missing: Source,
    },

    /// Identifier space cannot be served by a single-system call
    #[error(
        "identifier space {identifier_space} differs from active source {active} \
         while comparison is disabled"
    )]
    IdentifierSpaceUnreachable {
        /// Declared identifier space
        identifier_space: Source,
        /// Declared active source
        active: Source,
    },
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Policy file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// TOML parse failure
    #[error("invalid TOML policy: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parse failure
    #[error("invalid YAML policy: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File extension not recognised
    #[error("unsupported policy format: {0}")]
    UnsupportedFormat(String),

    /// Override value could not be parsed
    #[error("invalid value {value:?} for {key}")]
    InvalidOverride {
        /// Override key
        key: String,
        /// Rejected value
        value: String,
    },

    /// Parsed policy failed validation
    #[error(transparent)]
    Policy(#[from] PolicyError),
}
