//! Backend operations
//!
//! A backend operation is one capability of one system, e.g. "create
//! customer" on the legacy service. Both systems supply the same signature
//! for a given logical operation; `Ok(None)` means "not found".

use crate::error::BackendError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

/// Async operation against one backend system
pub type BackendOp<Req, Res> =
    Arc<dyn Fn(Req) -> BoxFuture<'static, Result<Option<Res>, BackendError>> + Send + Sync>;

/// Wrap an async function or closure as a [`BackendOp`]
///
/// # Example
///
/// ```rust
/// use dsa_core::backend::{backend_op, BackendOp};
///
/// let double: BackendOp<u32, u32> = backend_op(|n: u32| async move { Ok(Some(n * 2)) });
/// ```
pub fn backend_op<Req, Res, F, Fut>(f: F) -> BackendOp<Req, Res>
where
    F: Fn(Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Res>, BackendError>> + Send + 'static,
{
    Arc::new(move |request| f(request).boxed())
}
