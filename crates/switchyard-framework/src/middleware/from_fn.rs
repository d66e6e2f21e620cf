//! Closure middleware.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use switchyard_core::{InvocationContext, Response};
use tower::{BoxError, Layer, Service, ServiceExt};

use crate::handler::BoxedHandler;

/// The rest of the chain, handed to a [`from_fn`] middleware.
///
/// Dropping it without calling [`run`](Next::run) short-circuits the chain.
#[derive(Clone)]
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    /// Runs the downstream middleware and handler.
    pub async fn run(self, ctx: Arc<InvocationContext>) -> Result<Response, BoxError> {
        self.inner.oneshot(ctx).await
    }
}

/// Builds a middleware from an async closure.
///
/// ```rust,ignore
/// app.layer(from_fn(|ctx, next: Next| async move {
///     if ctx.request().header("x-api-key").is_none() {
///         return Ok(Response::new(StatusCode::UNAUTHORIZED));
///     }
///     next.run(ctx).await
/// }));
/// ```
pub fn from_fn<F, Fut>(f: F) -> FromFnLayer<F>
where
    F: Fn(Arc<InvocationContext>, Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    FromFnLayer { f }
}

/// See [`from_fn`].
#[derive(Clone)]
pub struct FromFnLayer<F> {
    f: F,
}

impl<F: Clone> Layer<BoxedHandler> for FromFnLayer<F> {
    type Service = FromFn<F>;

    fn layer(&self, inner: BoxedHandler) -> Self::Service {
        FromFn {
            f: self.f.clone(),
            next: inner,
        }
    }
}

#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
    next: BoxedHandler,
}

impl<F, Fut> Service<Arc<InvocationContext>> for FromFn<F>
where
    F: Fn(Arc<InvocationContext>, Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    type Response = Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Response, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<InvocationContext>) -> Self::Future {
        let next = Next {
            inner: self.next.clone(),
        };
        Box::pin((self.f)(ctx, next))
    }
}
