//! Core handler service for the Switchyard framework.
//!
//! [`HandlerService<H, T>`] wraps a single handler and implements
//! `tower::Service<Arc<InvocationContext>>`. Middleware is expressed as tower
//! layers stacked on top, and the result is type-erased into a
//! [`BoxedHandler`] when the route is registered.

use std::marker::PhantomData;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use switchyard_core::{InvocationContext, Response};
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service};

use super::traits::Handler;

/// A type-erased, `Clone + Send + Sync` tower service over the invocation
/// context.
///
/// Every route stores exactly one, already wrapped in its middleware.
pub type BoxedHandler = BoxCloneSyncService<Arc<InvocationContext>, Response, BoxError>;

/// A tower [`Service`] that calls a single generic handler.
pub struct HandlerService<H, T> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<H: Clone, T> Clone for HandlerService<H, T> {
    fn clone(&self) -> Self {
        HandlerService {
            handler: self.handler.clone(),
            _marker: PhantomData,
        }
    }
}

impl<H, T> HandlerService<H, T>
where
    H: Handler<T>,
{
    /// Wraps `handler` in a `HandlerService`.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<H, T> From<H> for HandlerService<H, T>
where
    H: Handler<T>,
{
    fn from(handler: H) -> Self {
        HandlerService::new(handler)
    }
}

impl<H, T> Service<Arc<InvocationContext>> for HandlerService<H, T>
where
    H: Handler<T>,
    T: 'static,
{
    type Response = Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Response, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<InvocationContext>) -> Self::Future {
        let handler = self.handler.clone();
        Box::pin(async move { handler.call(ctx).await })
    }
}

/// Converts a handler into a [`BoxedHandler`].
pub fn into_handler<H, T>(handler: H) -> BoxedHandler
where
    H: Handler<T>,
    T: 'static,
{
    BoxCloneSyncService::new(HandlerService::new(handler))
}

/// Erases any compatible tower service, e.g. one built with `ServiceBuilder`.
pub fn boxed<S>(service: S) -> BoxedHandler
where
    S: Service<Arc<InvocationContext>, Response = Response, Error = BoxError>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    BoxCloneSyncService::new(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{Request, TriggerKind};
    use tower::ServiceExt;

    #[tokio::test]
    async fn boxed_handler_is_reusable() {
        let svc = into_handler(|| async { "pong" });
        for _ in 0..3 {
            let ctx = Arc::new(InvocationContext::new(Arc::new(
                Request::builder(TriggerKind::Call).build(),
            )));
            let res = svc.clone().oneshot(ctx).await.unwrap();
            assert_eq!(res.body().to_bytes(), "pong");
        }
    }
}
