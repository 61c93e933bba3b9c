//! Testing utilities for DSA workspace
//!
//! Shared backends, policy fixtures and hooks.

#![allow(missing_docs)]

use dsa_core::telemetry::{self, Profile};
use dsa_core::{
    backend_op, BackendError, BackendOp, CallContext, Comparison, MigrationPolicy,
    PolicyHandle, PrimaryResult, SecondaryResult, Source, ValidatedPolicy,
};
use dsa_xref::InMemoryCrossReferenceStore;
use parking_lot::Mutex;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Backend that answers from a function and remembers every request
pub struct RecordingBackend<Req, Res> {
    respond: Arc<dyn Fn(&Req) -> Result<Option<Res>, BackendError> + Send + Sync>,
    requests: Arc<Mutex<Vec<Req>>>,
    calls: Arc<AtomicUsize>,
}

impl<Req, Res> RecordingBackend<Req, Res>
where
    Req: Clone + Send + 'static,
    Res: Send + 'static,
{
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&Req) -> Result<Option<Res>, BackendError> + Send + Sync + 'static,
    {
        Self {
            respond: Arc::new(respond),
            requests: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Backend that always fails with `error`
    pub fn failing(error: BackendError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    pub fn op(&self) -> BackendOp<Req, Res> {
        let respond = Arc::clone(&self.respond);
        let requests = Arc::clone(&self.requests);
        let calls = Arc::clone(&self.calls);
        backend_op(move |request: Req| {
            calls.fetch_add(1, Ordering::SeqCst);
            let result = respond(&request);
            requests.lock().push(request);
            async move { result }
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Req> {
        self.requests.lock().clone()
    }
}

/// Both systems consulted, primary active and identifier space
pub fn shadowing_secondary() -> ValidatedPolicy {
    MigrationPolicy::new(Source::Primary)
        .with_compare(true)
        .validate()
        .unwrap()
}

/// Both systems consulted, secondary active and identifier space
pub fn shadowing_primary() -> ValidatedPolicy {
    MigrationPolicy::new(Source::Secondary)
        .with_compare(true)
        .validate()
        .unwrap()
}

/// Only `active` consulted
pub fn cut_over(active: Source) -> ValidatedPolicy {
    MigrationPolicy::new(active).validate().unwrap()
}

pub fn handle(policy: ValidatedPolicy) -> PolicyHandle {
    PolicyHandle::new(policy)
}

pub fn xref_store<S, P>() -> Arc<InMemoryCrossReferenceStore<S, P>>
where
    S: Eq + Hash + Clone + Display,
    P: Eq + Hash + Clone + Display,
{
    Arc::new(InMemoryCrossReferenceStore::new())
}

pub fn panicking_comparator<Res>(
    _: &CallContext,
    _: &PrimaryResult<Res>,
    _: &SecondaryResult<Res>,
) -> Comparison {
    panic!("comparator failure injected by test")
}

pub fn init_test_logging() {
    telemetry::init(Profile::Test);
}
