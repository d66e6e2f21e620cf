//! Extension trait for tower service builder.
//!
//! Lets a route be assembled from arbitrary tower layers around one handler:
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//!
//! app.post(
//!     "/reports",
//!     ServiceBuilder::new()
//!         .guard(|ctx| ctx.request().header("x-internal").is_some())
//!         .layer(ConcurrencyLimitLayer::new(4))
//!         .handler(generate_report),
//! )?;
//! ```
//!
//! The result is a [`BoxedHandler`], which is itself a [`Handler`], so it is
//! registered like any function handler and still gets the route's
//! middleware around it.

use std::sync::Arc;

use async_trait::async_trait;
use switchyard_core::{InvocationContext, Response};
use tower::filter::{FilterLayer, Predicate};
use tower::{BoxError, Layer, Service, ServiceBuilder, ServiceExt};
use tower_layer::Stack;

use super::service::{BoxedHandler, HandlerService, boxed};
use super::traits::Handler;
use crate::error::HttpError;

/// Marker for services registered as handlers.
pub struct ServiceMarker;

#[async_trait]
impl Handler<ServiceMarker> for BoxedHandler {
    async fn call(self, ctx: Arc<InvocationContext>) -> Result<Response, BoxError> {
        self.oneshot(ctx).await
    }
}

// ============================================================================
// Guard
// ============================================================================

/// A [`Predicate`] over the invocation context.
///
/// Rejects with [`HttpError::forbidden`] when the closure returns `false`.
#[derive(Clone)]
pub struct Guard(Arc<dyn Fn(&InvocationContext) -> bool + Send + Sync>);

impl Guard {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&InvocationContext) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl Predicate<Arc<InvocationContext>> for Guard {
    type Request = Arc<InvocationContext>;

    fn check(&mut self, ctx: Arc<InvocationContext>) -> Result<Arc<InvocationContext>, BoxError> {
        if (self.0)(&ctx) {
            Ok(ctx)
        } else {
            Err(Box::new(HttpError::forbidden("request rejected by route guard")))
        }
    }
}

/// Extension trait for [`tower::ServiceBuilder`].
pub trait ServiceBuilderExt<L> {
    /// Wraps `handler` in a [`HandlerService`], applies the stacked layers and
    /// erases the result.
    fn handler<H, T>(self, handler: H) -> BoxedHandler
    where
        H: Handler<T>,
        T: 'static,
        L: Layer<HandlerService<H, T>>,
        L::Service: Service<Arc<InvocationContext>, Response = Response, Error = BoxError>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<Arc<InvocationContext>>>::Future: Send + 'static;

    /// Rejects invocations for which `predicate` returns `false`.
    fn guard<F>(self, predicate: F) -> ServiceBuilder<Stack<FilterLayer<Guard>, L>>
    where
        F: Fn(&InvocationContext) -> bool + Send + Sync + 'static;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn handler<H, T>(self, handler: H) -> BoxedHandler
    where
        H: Handler<T>,
        T: 'static,
        L: Layer<HandlerService<H, T>>,
        L::Service: Service<Arc<InvocationContext>, Response = Response, Error = BoxError>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<Arc<InvocationContext>>>::Future: Send + 'static,
    {
        boxed(self.service(HandlerService::new(handler)))
    }

    fn guard<F>(self, predicate: F) -> ServiceBuilder<Stack<FilterLayer<Guard>, L>>
    where
        F: Fn(&InvocationContext) -> bool + Send + Sync + 'static,
    {
        self.filter(Guard::new(predicate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use switchyard_core::{Request, TriggerKind};

    fn ctx(internal: bool) -> Arc<InvocationContext> {
        let mut builder = Request::builder(TriggerKind::Call);
        if internal {
            builder = builder.header("x-internal", "1");
        }
        Arc::new(InvocationContext::new(Arc::new(builder.build())))
    }

    #[tokio::test]
    async fn guard_rejects_with_forbidden() {
        let svc = ServiceBuilder::new()
            .guard(|ctx| ctx.request().header("x-internal").is_some())
            .handler(|| async { "secret" });

        let res = svc.clone().oneshot(ctx(true)).await.unwrap();
        assert_eq!(res.body().to_bytes(), "secret");

        let err = svc.oneshot(ctx(false)).await.unwrap_err();
        let http = err.downcast_ref::<HttpError>().unwrap();
        assert_eq!(http.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn boxed_services_are_handlers() {
        let svc = ServiceBuilder::new().handler(|| async { "inner" });
        let res = Handler::<ServiceMarker>::call(svc, ctx(false)).await.unwrap();
        assert_eq!(res.body().to_bytes(), "inner");
    }
}
