//! Invocation dispatcher.
//!
//! The [`Dispatcher`] is the frozen form of an [`App`](crate::App). For each
//! raw payload it:
//!
//! 1. asks the adapter registry to normalize it into a [`Request`],
//! 2. picks the path router for call-style requests and the trigger router
//!    for everything else,
//! 3. runs the route's precomposed service with a fresh
//!    [`InvocationContext`],
//! 4. turns any error into a response through the [`ErrorBoundary`].
//!
//! It never fails: every outcome, including unrecognized payloads and
//! unmatched routes, is a [`Response`] plus an optional [`Failure`] for the
//! host to act on.
//!
//! The dispatcher is `Clone + Send + Sync` and holds no mutable state, so one
//! instance serves any number of concurrent invocations.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use switchyard_core::integration::call_reply;
use switchyard_core::{
    AdapterRegistry, InvocationContext, InvocationState, Metrics, NoopMetrics, NormalizeError,
    Panicked, Request, Response, RouteNotFound, Services, TriggerKind,
};
use tokio_util::sync::CancellationToken;
use tower::{BoxError, ServiceExt};
use tracing::{Instrument, debug, info_span, warn};

use crate::boundary::ErrorBoundary;
use crate::routing::{PathRouter, Route, TriggerRouter};

/// Host-supplied ambient values for one invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationScope {
    pub deadline: Option<Instant>,
    pub cancellation: CancellationToken,
}

impl InvocationScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Why an invocation did not complete normally.
#[derive(Debug)]
pub enum Failure {
    /// No adapter claimed the payload, or the claimant could not adapt it.
    Normalize(NormalizeError),
    /// No route matched.
    RouteNotFound(RouteNotFound),
    /// A handler or middleware panicked.
    Panicked(Panicked),
    /// A handler or middleware returned an error the boundary rendered.
    Handler(String),
}

impl Failure {
    /// Stable tag used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Normalize(NormalizeError::UnrecognizedEvent) => "unrecognized_event",
            Self::Normalize(NormalizeError::Malformed { .. }) => "malformed_event",
            Self::RouteNotFound(_) => "route_not_found",
            Self::Panicked(_) => "panicked",
            Self::Handler(_) => "handler_error",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normalize(e) => fmt::Display::fmt(e, f),
            Self::RouteNotFound(e) => fmt::Display::fmt(e, f),
            Self::Panicked(e) => fmt::Display::fmt(e, f),
            Self::Handler(message) => f.write_str(message),
        }
    }
}

/// Result of one dispatch.
#[derive(Debug)]
pub struct Outcome {
    /// The normalized request; `None` when normalization failed.
    pub request: Option<Arc<Request>>,
    /// Final lifecycle state, `Finalized` or `Aborted`.
    pub state: InvocationState,
    pub response: Response,
    pub failure: Option<Failure>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

struct Inner {
    adapters: AdapterRegistry,
    paths: PathRouter,
    triggers: TriggerRouter,
    services: Arc<Services>,
    boundary: ErrorBoundary,
}

/// Immutable routing tables plus the error policy.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub(crate) fn new(
        adapters: AdapterRegistry,
        paths: PathRouter,
        triggers: TriggerRouter,
        services: Arc<Services>,
        boundary: ErrorBoundary,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                adapters,
                paths,
                triggers,
                services,
                boundary,
            }),
        }
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.inner.adapters
    }

    pub fn services(&self) -> &Services {
        &self.inner.services
    }

    /// Normalizes `raw` and dispatches it.
    pub async fn dispatch(&self, raw: &Value, scope: InvocationScope) -> Outcome {
        let request = match self.inner.adapters.detect_and_adapt(raw) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Event normalization failed");
                self.record(None, "aborted", None);
                return Outcome {
                    request: None,
                    state: InvocationState::Aborted,
                    response: self.inner.boundary.handle_error(&err),
                    failure: Some(Failure::Normalize(err)),
                };
            }
        };
        self.dispatch_request(request, scope).await
    }

    /// Dispatches an already normalized request.
    pub async fn dispatch_request(&self, request: Request, scope: InvocationScope) -> Outcome {
        let span = info_span!(
            "invocation",
            request_id = %request.request_id(),
            trigger = %request.trigger(),
            adapter = request.adapter(),
        );
        self.run(Arc::new(request), scope).instrument(span).await
    }

    /// Serializes an outcome into its provider's reply shape.
    pub fn reply(&self, outcome: Outcome) -> Value {
        match &outcome.request {
            Some(request) => self.inner.adapters.reply(request, outcome.response),
            None => call_reply(outcome.response),
        }
    }

    async fn run(&self, request: Arc<Request>, scope: InvocationScope) -> Outcome {
        let started = Instant::now();
        let ctx = Arc::new(
            InvocationContext::new(Arc::clone(&request))
                .with_services(Arc::clone(&self.inner.services))
                .with_deadline(scope.deadline)
                .with_cancellation(scope.cancellation),
        );
        let _ = ctx.advance(InvocationState::Normalized);

        let route = match self.route(&request) {
            Ok(route) => route,
            Err(not_found) => {
                debug!(lookup = %not_found.target, "No route matched");
                let _ = ctx.advance(InvocationState::Aborted);
                let response = self.inner.boundary.handle_error(&not_found);
                self.record(Some(&ctx), "route_not_found", Some(started));
                return Outcome {
                    request: Some(request),
                    state: ctx.state(),
                    response,
                    failure: Some(Failure::RouteNotFound(not_found)),
                };
            }
        };
        let _ = ctx.advance(InvocationState::Routed);
        debug!(route = route.key(), "Routed");

        let (response, failure) = match route.service().oneshot(Arc::clone(&ctx)).await {
            Ok(response) => (response, None),
            Err(err) => {
                let mut response = self.inner.boundary.handle(&err);
                if request.trigger() == TriggerKind::QueueBatch && !response.has_failed_records() {
                    // The whole batch failed; every record must be redelivered.
                    for record in request.records() {
                        response.fail_record(record.id());
                    }
                }
                (response, Some(failure_from(err)))
            }
        };

        if !ctx.state().is_terminal() {
            let _ = ctx.advance(InvocationState::Finalized);
        }
        let state = ctx.state();
        let outcome = match &failure {
            None if response.has_failed_records() => "partial_failure",
            None => "ok",
            Some(f) => f.kind(),
        };
        debug!(status = response.status().as_u16(), %state, outcome, "Invocation finished");
        self.record(Some(&ctx), outcome, Some(started));

        Outcome {
            request: Some(request),
            state,
            response,
            failure,
        }
    }

    /// Dual routing: call-style requests by method and path, everything else
    /// by trigger kind and source.
    fn route(&self, request: &Request) -> Result<Route, RouteNotFound> {
        if request.trigger().is_call() {
            let matched = self.inner.paths.resolve(request.method(), request.path())?;
            if request.set_path_params(matched.params).is_err() {
                debug!("Path parameters were already set");
            }
            Ok(matched.route.clone())
        } else {
            self.inner.triggers.resolve(request).cloned()
        }
    }

    fn record(&self, ctx: Option<&InvocationContext>, outcome: &str, started: Option<Instant>) {
        let metrics: Arc<dyn Metrics> = match ctx {
            Some(ctx) => ctx.metrics(),
            None => self
                .inner
                .services
                .get::<dyn Metrics>()
                .unwrap_or_else(|| Arc::new(NoopMetrics)),
        };
        let trigger = ctx.map_or("unknown", |c| c.request().trigger().as_str());
        let tags = [("trigger", trigger), ("outcome", outcome)];

        metrics.increment("switchyard.invocations", &tags);
        if let Some(started) = started {
            metrics.record_duration("switchyard.invocation.duration", started.elapsed(), &tags);
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("adapters", &self.inner.adapters.names())
            .field("call_routes", &self.inner.paths.len())
            .field("trigger_routes", &self.inner.triggers.len())
            .finish()
    }
}

fn failure_from(err: BoxError) -> Failure {
    match err.downcast::<Panicked>() {
        Ok(panicked) => Failure::Panicked(*panicked),
        Err(err) => Failure::Handler(err.to_string()),
    }
}
