//! Per-route tracing spans.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::future::BoxFuture;
use switchyard_core::{InvocationContext, Response};
use tower::{BoxError, Layer, Service};
use tracing::{Instrument, debug, field, info_span};

/// Opens a `route` span around the inner service and records the status and
/// latency when it completes.
#[derive(Debug, Clone, Default)]
pub struct TraceLayer {
    route: Option<Arc<str>>,
}

impl TraceLayer {
    /// A layer that names the route by the request's method and path, or by
    /// its routing source.
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer for a known route key.
    pub fn for_route(route: impl Into<Arc<str>>) -> Self {
        Self {
            route: Some(route.into()),
        }
    }
}

impl<S> Layer<S> for TraceLayer {
    type Service = TraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TraceService {
            inner,
            route: self.route.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TraceService<S> {
    inner: S,
    route: Option<Arc<str>>,
}

impl<S> Service<Arc<InvocationContext>> for TraceService<S>
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

        let request = ctx.request();
        let route = match &self.route {
            Some(route) => route.to_string(),
            None if request.trigger().is_call() => {
                format!("{} {}", request.method(), request.path())
            }
            None => request.source().unwrap_or("*").to_string(),
        };
        let span = info_span!(
            "route",
            trigger = %request.trigger(),
            route = %route,
            status = field::Empty,
            latency_ms = field::Empty,
        );

        let started = Instant::now();
        let future = {
            let _entered = span.enter();
            inner.call(ctx)
        };
        Box::pin(
            async move {
                let result = future.await;
                let span = tracing::Span::current();
                span.record("latency_ms", started.elapsed().as_millis() as u64);
                match &result {
                    Ok(res) => {
                        span.record("status", res.status().as_u16());
                        debug!("Route completed");
                    }
                    Err(err) => debug!(error = %err, "Route failed"),
                }
                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::into_handler;
    use switchyard_core::{Request, TriggerKind};
    use tower::ServiceExt;

    #[tokio::test]
    async fn passes_responses_through() {
        let ctx = Arc::new(InvocationContext::new(Arc::new(
            Request::builder(TriggerKind::Scheduled)
                .source("nightly")
                .build(),
        )));
        let res = TraceLayer::new()
            .layer(into_handler(|| async { http::StatusCode::ACCEPTED }))
            .oneshot(ctx)
            .await
            .unwrap();
        assert_eq!(res.status(), http::StatusCode::ACCEPTED);
    }
}
