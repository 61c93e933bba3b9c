//! Response envelopes
//!
//! [`PrimaryResult`] and [`SecondaryResult`] carry the same payload type but
//! are distinct types, so a hook cannot pass one system's data where the
//! other's is expected.

use crate::error::BackendError;
use crate::types::Source;

/// What a single backend call produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The call returned a value
    Value(T),
    /// The call succeeded but found nothing
    Absent,
    /// A non-mandatory call failed; mandatory failures never reach hooks
    Failed(BackendError),
}

impl<T> Outcome<T> {
    /// Build from a backend call result
    #[inline]
    pub fn from_result(result: Result<Option<T>, BackendError>) -> Self {
        match result {
            Ok(Some(value)) => Self::Value(value),
            Ok(None) => Self::Absent,
            Err(error) => Self::Failed(error),
        }
    }

    /// Borrow the value, if any
    #[inline]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Absent | Self::Failed(_) => None,
        }
    }

    /// Take the value, if any
    #[inline]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Absent | Self::Failed(_) => None,
        }
    }

    /// The failure, if the call failed
    #[inline]
    pub fn error(&self) -> Option<&BackendError> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Value(_) | Self::Absent => None,
        }
    }

    /// Check for a value
    #[inline]
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Check for a not-found result
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Check for a failed call
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Short label for logs
    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Absent => "absent",
            Self::Failed(_) => "failed",
        }
    }
}

macro_rules! envelope {
    ($(#[$meta:meta])* $name:ident, $source:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name<T> {
            outcome: Outcome<T>,
        }

        impl<T> $name<T> {
            /// System this envelope belongs to
            pub const SOURCE: Source = $source;

            /// Wrap an outcome
            #[inline]
            pub fn new(outcome: Outcome<T>) -> Self {
                Self { outcome }
            }

            /// Envelope holding a value
            #[inline]
            pub fn value_of(value: T) -> Self {
                Self::new(Outcome::Value(value))
            }

            /// Envelope for a not-found result
            #[inline]
            pub fn absent() -> Self {
                Self::new(Outcome::Absent)
            }

            /// Envelope for a failed non-mandatory call
            #[inline]
            pub fn failed(error: BackendError) -> Self {
                Self::new(Outcome::Failed(error))
            }

            /// Borrow the outcome
            #[inline]
            pub fn outcome(&self) -> &Outcome<T> {
                &self.outcome
            }

            /// Take the outcome
            #[inline]
            pub fn into_outcome(self) -> Outcome<T> {
                self.outcome
            }

            /// Borrow the value, if any
            #[inline]
            pub fn value(&self) -> Option<&T> {
                self.outcome.value()
            }

            /// Take the value, if any
            #[inline]
            pub fn into_value(self) -> Option<T> {
                self.outcome.into_value()
            }

            /// Check for a value
            #[inline]
            pub fn is_value(&self) -> bool {
                self.outcome.is_value()
            }

            /// Check for a not-found result
            #[inline]
            pub fn is_absent(&self) -> bool {
                self.outcome.is_absent()
            }

            /// Check for a failed call
            #[inline]
            pub fn is_failed(&self) -> bool {
                self.outcome.is_failed()
            }
        }

        impl<T> From<Outcome<T>> for $name<T> {
            fn from(outcome: Outcome<T>) -> Self {
                Self::new(outcome)
            }
        }

        impl<T> From<Result<Option<T>, BackendError>> for $name<T> {
            fn from(result: Result<Option<T>, BackendError>) -> Self {
                Self::new(Outcome::from_result(result))
            }
        }
    };
}

envelope!(
    /// Result produced by the primary system
    PrimaryResult,
    Source::Primary
);

envelope!(
    /// Result produced by the secondary system
    SecondaryResult,
    Source::Secondary
);
