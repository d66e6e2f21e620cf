//! Per-invocation context.
//!
//! One [`InvocationContext`] is created for every dispatched request and
//! handed, behind an `Arc`, through the middleware chain to the handler. It
//! carries:
//!
//! - the normalized [`Request`] (read-only),
//! - a string-keyed state store scoped to this invocation only,
//! - the read-only [`Services`] registered at startup,
//! - the ambient deadline and cancellation token supplied by the host,
//! - the invocation [`Lifecycle`].
//!
//! The context never holds the response. Handlers return responses by value,
//! so background work holding a [`detach`](InvocationContext::detach)ed copy
//! has no way to reach the response of the invocation that spawned it.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::lifecycle::{InvocationState, Lifecycle, TransitionError};
use super::services::{Metrics, NoopMetrics, Services};
use crate::foundation::Request;

type StateValue = Arc<dyn Any + Send + Sync>;

/// Context handed to middleware and handlers for one invocation.
pub struct InvocationContext {
    request: Arc<Request>,
    state: Mutex<HashMap<String, StateValue>>,
    services: Arc<Services>,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
    lifecycle: Lifecycle,
    detached: bool,
}

impl InvocationContext {
    /// Creates a context with no services, no deadline and a fresh token.
    pub fn new(request: Arc<Request>) -> Self {
        Self {
            request,
            state: Mutex::new(HashMap::new()),
            services: Arc::new(Services::new()),
            deadline: None,
            cancellation: CancellationToken::new(),
            lifecycle: Lifecycle::new(),
            detached: false,
        }
    }

    pub fn with_services(mut self, services: Arc<Services>) -> Self {
        self.services = services;
        self
    }

    /// Sets the deadline supplied by the host. It is stored as given.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    // ─── Request ──────────────────────────────────────────────────────────────

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_arc(&self) -> Arc<Request> {
        Arc::clone(&self.request)
    }

    // ─── Request-scoped state ─────────────────────────────────────────────────

    /// Stores a value under `key`, replacing any previous value.
    pub fn set<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.state.lock().insert(key.into(), Arc::new(value));
    }

    /// Returns a clone of the value under `key` if it exists and has type `T`.
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.state
            .lock()
            .get(key)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Returns the shared value under `key` without cloning it.
    pub fn get_arc<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.state
            .lock()
            .get(key)
            .cloned()
            .and_then(|v| v.downcast::<T>().ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().contains_key(key)
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().remove(key).is_some()
    }

    // ─── Collaborators ────────────────────────────────────────────────────────

    /// Looks up a collaborator by the type it was registered under.
    pub fn service<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// The registered metrics backend, or a no-op one.
    pub fn metrics(&self) -> Arc<dyn Metrics> {
        self.services
            .get::<dyn Metrics>()
            .unwrap_or_else(|| Arc::new(NoopMetrics))
    }

    // ─── Deadline & cancellation ──────────────────────────────────────────────

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline; zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    // ─── Lifecycle ────────────────────────────────────────────────────────────

    pub fn state(&self) -> InvocationState {
        self.lifecycle.current()
    }

    /// Advances the lifecycle. Backward moves and moves out of a terminal
    /// state are rejected.
    pub fn advance(&self, to: InvocationState) -> Result<InvocationState, TransitionError> {
        let result = self.lifecycle.advance(to);
        if let Err(e) = &result {
            debug!(request_id = %self.request.request_id(), error = %e, "Lifecycle transition rejected");
        }
        result
    }

    // ─── Detaching ────────────────────────────────────────────────────────────

    /// Copies this context for background work that may outlive the invocation.
    ///
    /// The copy gets a snapshot of the state store (later writes on either
    /// side are not visible to the other), the same request, services and
    /// deadline, and a child cancellation token.
    pub fn detach(&self) -> InvocationContext {
        let snapshot = self.state.lock().clone();
        Self {
            request: Arc::clone(&self.request),
            state: Mutex::new(snapshot),
            services: Arc::clone(&self.services),
            deadline: self.deadline,
            cancellation: self.cancellation.child_token(),
            lifecycle: Lifecycle::starting_at(self.lifecycle.current()),
            detached: true,
        }
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("request_id", &self.request.request_id())
            .field("trigger", &self.request.trigger())
            .field("state", &self.state())
            .field("detached", &self.detached)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::TriggerKind;

    fn ctx() -> InvocationContext {
        InvocationContext::new(Arc::new(
            Request::builder(TriggerKind::Call).path("/").build(),
        ))
    }

    #[test]
    fn state_is_typed_and_keyed() {
        let ctx = ctx();
        ctx.set("user", "ada".to_string());
        ctx.set("attempt", 3_u32);

        assert_eq!(ctx.get::<String>("user").as_deref(), Some("ada"));
        assert_eq!(ctx.get::<u32>("attempt"), Some(3));
        assert_eq!(ctx.get::<u64>("attempt"), None);
        assert_eq!(ctx.get::<String>("missing"), None);
        assert!(ctx.remove("user"));
        assert!(!ctx.contains("user"));
    }

    #[test]
    fn detached_copy_shares_no_mutable_state() {
        let ctx = ctx();
        ctx.set("k", 1_i32);

        let copy = ctx.detach();
        copy.set("k", 2_i32);
        ctx.set("other", true);

        assert_eq!(ctx.get::<i32>("k"), Some(1));
        assert_eq!(copy.get::<i32>("k"), Some(2));
        assert!(!copy.contains("other"));
        assert!(copy.is_detached());

        ctx.cancellation().cancel();
        assert!(copy.cancellation().is_cancelled());
    }

    #[test]
    fn deadline_is_propagated_unmodified() {
        let deadline = Instant::now() + Duration::from_secs(30);
        let ctx = ctx().with_deadline(Some(deadline));
        assert_eq!(ctx.deadline(), Some(deadline));
        assert!(!ctx.is_expired());
        assert!(ctx.remaining().unwrap() <= Duration::from_secs(30));
    }

    #[test]
    fn metrics_fall_back_to_noop() {
        let ctx = ctx();
        ctx.metrics().increment("anything", &[]);
    }
}
