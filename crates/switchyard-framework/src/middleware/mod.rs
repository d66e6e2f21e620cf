//! Middleware pipeline.
//!
//! A middleware turns the next handler into a new handler. Any tower
//! [`Layer`] over [`BoxedHandler`] is a [`Middleware`], so existing layers,
//! [`from_fn`] closures and the built-ins all compose the same way.
//!
//! A [`MiddlewareStack`] is folded into one service per route when the route
//! is registered:
//!
//! ```text
//! compose([m1, m2, m3], handler) = m1(m2(m3(handler)))
//!
//!   m1 pre → m2 pre → m3 pre → handler → m3 post → m2 post → m1 post
//! ```
//!
//! The composed service is cloned per invocation and never rebuilt.

pub mod auth;
pub mod from_fn;
pub mod recover;
pub mod trace;

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use switchyard_core::{InvocationContext, InvocationState, Response};
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Layer, Service};

use crate::handler::BoxedHandler;

pub use auth::{AuthLayer, CLAIMS_KEY, Claims, ClaimsProvider};
pub use from_fn::{FromFnLayer, Next, from_fn};
pub use recover::{RecoverLayer, RecoverService};
pub use trace::{TraceLayer, TraceService};

/// A transformation from the next handler to a handler.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<L> Middleware for L
where
    L: Layer<BoxedHandler> + Send + Sync + 'static,
    L::Service: Service<Arc<InvocationContext>, Response = Response, Error = BoxError>
        + Clone
        + Send
        + Sync
        + 'static,
    <L::Service as Service<Arc<InvocationContext>>>::Future: Send + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        BoxCloneSyncService::new(self.layer(next))
    }
}

/// Shared middleware handle; one instance may sit in many stacks.
pub type SharedMiddleware = Arc<dyn Middleware>;

// =============================================================================
// MiddlewareStack
// =============================================================================

/// Ordered middleware list. The first entry is outermost.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    layers: Vec<SharedMiddleware>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: SharedMiddleware) {
        self.layers.push(middleware);
    }

    /// Appends every entry of `other`, after the current ones.
    pub fn extend(&mut self, other: &MiddlewareStack) {
        self.layers.extend(other.layers.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|m| m.name()).collect()
    }

    /// Folds the stack around `handler`.
    ///
    /// Each middleware is bracketed by lifecycle markers: entering it records
    /// [`InvocationState::MiddlewarePre`], leaving it records
    /// [`InvocationState::MiddlewarePost`], and reaching the handler records
    /// [`InvocationState::HandlerExecuting`].
    pub fn compose(&self, handler: BoxedHandler) -> BoxedHandler {
        let mut service: BoxedHandler = BoxCloneSyncService::new(Phase {
            inner: handler,
            enter: InvocationState::HandlerExecuting,
            exit: None,
        });
        for middleware in self.layers.iter().rev() {
            service = BoxCloneSyncService::new(Phase {
                inner: middleware.wrap(service),
                enter: InvocationState::MiddlewarePre,
                exit: Some(InvocationState::MiddlewarePost),
            });
        }
        service
    }
}

impl fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Records lifecycle transitions around the inner service.
///
/// Rejected transitions (for example after a recovered panic aborted the
/// invocation) are logged by the context and otherwise ignored.
#[derive(Clone)]
struct Phase {
    inner: BoxedHandler,
    enter: InvocationState,
    exit: Option<InvocationState>,
}

impl Service<Arc<InvocationContext>> for Phase {
    type Response = Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Response, BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, ctx: Arc<InvocationContext>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let (enter, exit) = (self.enter, self.exit);
        Box::pin(async move {
            let _ = ctx.advance(enter);
            let result = inner.call(Arc::clone(&ctx)).await;
            if let Some(exit) = exit {
                let _ = ctx.advance(exit);
            }
            result
        })
    }
}
