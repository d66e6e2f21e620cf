//! Panic recovery boundary.
//!
//! Catches a panic raised while the inner service builds its future or while
//! that future is polled, aborts the invocation and returns
//! [`Panicked`] for the error boundary to render as a generic `500`. The
//! shared execution environment keeps running.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use switchyard_core::{InvocationContext, InvocationState, Panicked, Response};
use tower::{BoxError, Layer, Service};
use tracing::error;

/// Installs [`RecoverService`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoverLayer;

impl RecoverLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RecoverLayer {
    type Service = RecoverService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecoverService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RecoverService<S> {
    inner: S,
}

impl<S> Service<Arc<InvocationContext>> for RecoverService<S>
where
    S: Service<Arc<InvocationContext>, Response = Response, Error = BoxError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Response, BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, ctx: Arc<InvocationContext>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let call_ctx = Arc::clone(&ctx);
        let future = match std::panic::catch_unwind(AssertUnwindSafe(move || inner.call(call_ctx))) {
            Ok(future) => future,
            Err(payload) => {
                let err = abort(&ctx, payload);
                return Box::pin(async move { Err(err) });
            }
        };

        Box::pin(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(abort(&ctx, payload)),
            }
        })
    }
}

fn abort(ctx: &InvocationContext, payload: Box<dyn std::any::Any + Send>) -> BoxError {
    let panicked = Panicked::from_payload(payload);
    error!(
        request_id = %ctx.request().request_id(),
        panic = %panicked.message,
        "Handler panicked"
    );
    let _ = ctx.advance(InvocationState::Aborted);
    Box::new(panicked)
}
