//! Adapter hooks
//!
//! The host supplies, per logical operation:
//! - **Request adapters**: rewrite the request bound for the second system
//!   using what the first system returned (one per direction)
//! - **Response adapter**: reconcile both envelopes into the caller's value
//! - **Comparator**: observe both envelopes for divergence; advisory only
//!
//! All hooks are plain function values stored in [`Hooks`], so an operation
//! can be assembled from closures without defining new types.

use crate::envelope::{PrimaryResult, SecondaryResult};
use crate::error::MigrationError;
use crate::types::{CallContext, Source};
use std::fmt;
use std::sync::Arc;

/// Rewrites the request for the secondary from the primary's result
pub type SecondaryRequestAdapter<Req, Res> = Arc<
    dyn Fn(&CallContext, Req, &PrimaryResult<Res>) -> Result<Req, MigrationError> + Send + Sync,
>;

/// Rewrites the request for the primary from the secondary's result
pub type PrimaryRequestAdapter<Req, Res> = Arc<
    dyn Fn(&CallContext, Req, &SecondaryResult<Res>) -> Result<Req, MigrationError> + Send + Sync,
>;

/// Builds the caller's value from both envelopes
///
/// Must return a value whose identifier lives in
/// [`CallContext::identifier_space`].
pub type ResponseAdapter<Res> =
    Arc<dyn Fn(&CallContext, &PrimaryResult<Res>, &SecondaryResult<Res>) -> Option<Res> + Send + Sync>;

/// Observes both envelopes; its verdict never changes the returned value
pub type Comparator<Res> =
    Arc<dyn Fn(&CallContext, &PrimaryResult<Res>, &SecondaryResult<Res>) -> Comparison + Send + Sync>;

/// Comparator verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// Both systems agree
    Match,
    /// The systems disagree
    Diverged {
        /// What differs
        reason: String,
    },
    /// Nothing meaningful to compare (e.g. one side failed)
    Skipped,
}

impl Comparison {
    /// Divergence with a reason
    #[inline]
    pub fn diverged(reason: impl Into<String>) -> Self {
        Self::Diverged {
            reason: reason.into(),
        }
    }

    /// Check for divergence
    #[inline]
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }
}

/// Hook set for one logical operation
pub struct Hooks<Req, Res> {
    pub(crate) adapt_for_secondary: SecondaryRequestAdapter<Req, Res>,
    pub(crate) adapt_for_primary: PrimaryRequestAdapter<Req, Res>,
    pub(crate) response_adapter: ResponseAdapter<Res>,
    pub(crate) comparator: Comparator<Res>,
}

impl<Req, Res> Hooks<Req, Res>
where
    Req: 'static,
    Res: Clone + 'static,
{
    /// Hooks that pass requests through, skip comparison and return the
    /// identifier-space system's value
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapt_for_secondary: Arc::new(pass_through::<Req, PrimaryResult<Res>>),
            adapt_for_primary: Arc::new(pass_through::<Req, SecondaryResult<Res>>),
            response_adapter: Arc::new(identifier_space_value::<Res>),
            comparator: Arc::new(skip_comparison::<Res>),
        }
    }
}

impl<Req, Res> Hooks<Req, Res> {
    /// With the adapter for requests sent to the secondary
    #[must_use]
    pub fn with_secondary_request_adapter<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallContext, Req, &PrimaryResult<Res>) -> Result<Req, MigrationError>
            + Send
            + Sync
            + 'static,
    {
        self.adapt_for_secondary = Arc::new(f);
        self
    }

    /// With the adapter for requests sent to the primary
    #[must_use]
    pub fn with_primary_request_adapter<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallContext, Req, &SecondaryResult<Res>) -> Result<Req, MigrationError>
            + Send
            + Sync
            + 'static,
    {
        self.adapt_for_primary = Arc::new(f);
        self
    }

    /// With the response adapter
    #[must_use]
    pub fn with_response_adapter<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallContext, &PrimaryResult<Res>, &SecondaryResult<Res>) -> Option<Res>
            + Send
            + Sync
            + 'static,
    {
        self.response_adapter = Arc::new(f);
        self
    }

    /// With the comparator
    #[must_use]
    pub fn with_comparator<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallContext, &PrimaryResult<Res>, &SecondaryResult<Res>) -> Comparison
            + Send
            + Sync
            + 'static,
    {
        self.comparator = Arc::new(f);
        self
    }
}

impl<Req, Res> Default for Hooks<Req, Res>
where
    Req: 'static,
    Res: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res> Clone for Hooks<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            adapt_for_secondary: Arc::clone(&self.adapt_for_secondary),
            adapt_for_primary: Arc::clone(&self.adapt_for_primary),
            response_adapter: Arc::clone(&self.response_adapter),
            comparator: Arc::clone(&self.comparator),
        }
    }
}

impl<Req, Res> fmt::Debug for Hooks<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

fn pass_through<Req, E>(_: &CallContext, request: Req, _: &E) -> Result<Req, MigrationError> {
    Ok(request)
}

fn skip_comparison<Res>(
    _: &CallContext,
    _: &PrimaryResult<Res>,
    _: &SecondaryResult<Res>,
) -> Comparison {
    Comparison::Skipped
}

/// Default response adapter: the identifier-space system's value, untouched
pub fn identifier_space_value<Res: Clone>(
    ctx: &CallContext,
    primary: &PrimaryResult<Res>,
    secondary: &SecondaryResult<Res>,
) -> Option<Res> {
    match ctx.identifier_space() {
        Source::Primary => primary.value().cloned(),
        Source::Secondary => secondary.value().cloned(),
    }
}
