//! Bearer-token authentication.
//!
//! Token validation is delegated to a [`ClaimsProvider`] supplied by the
//! application. The layer only reads the `authorization` header, asks the
//! provider, and stores the resulting [`Claims`] in the context under
//! [`CLAIMS_KEY`] for handlers to extract.

use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::future::BoxFuture;
use http::StatusCode;
use http::header::{AUTHORIZATION, HeaderValue, WWW_AUTHENTICATE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use switchyard_core::{InvocationContext, Response};
use tower::{BoxError, Layer, Service};
use tracing::debug;

use crate::boundary::ErrorReply;
use crate::error::{ExtractError, ExtractResult};
use crate::extractor::FromContext;

/// Context key the claims are stored under.
pub const CLAIMS_KEY: &str = "claims";

/// Identity established for the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub subject: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

impl FromContext for Claims {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        ctx.get::<Claims>(CLAIMS_KEY)
            .ok_or_else(|| ExtractError::MissingState(CLAIMS_KEY.to_string()))
    }
}

/// Resolves a bearer token to claims.
#[async_trait]
pub trait ClaimsProvider: Send + Sync + 'static {
    /// `Ok(None)` for unknown, expired or otherwise invalid tokens. `Err` is
    /// reserved for failures of the provider itself.
    async fn claims(&self, token: &str) -> Result<Option<Claims>, BoxError>;
}

/// Rejects requests without valid bearer credentials with `401`.
pub struct AuthLayer<P> {
    provider: Arc<P>,
}

impl<P> AuthLayer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    pub fn from_arc(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

impl<P> Clone for AuthLayer<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<S, P> Layer<S> for AuthLayer<P> {
    type Service = AuthService<S, P>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            provider: Arc::clone(&self.provider),
        }
    }
}

pub struct AuthService<S, P> {
    inner: S,
    provider: Arc<P>,
}

impl<S: Clone, P> Clone for AuthService<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<S, P> Service<Arc<InvocationContext>> for AuthService<S, P>
where
    S: Service<Arc<InvocationContext>, Response = Response, Error = BoxError> + Clone + Send + 'static,
    S::Future: Send + 'static,
    P: ClaimsProvider,
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
        let provider = Arc::clone(&self.provider);

        Box::pin(async move {
            let Some(token) = bearer_token(&ctx) else {
                debug!("Missing bearer token");
                return Ok(unauthorized("missing bearer token"));
            };

            match provider.claims(&token).await? {
                Some(claims) => {
                    debug!(subject = %claims.subject, "Authenticated");
                    ctx.set(CLAIMS_KEY, claims);
                    inner.call(ctx).await
                }
                None => {
                    debug!("Rejected bearer token");
                    Ok(unauthorized("invalid bearer token"))
                }
            }
        })
    }
}

fn bearer_token(ctx: &InvocationContext) -> Option<String> {
    let value = ctx.request().headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

fn unauthorized(message: &str) -> Response {
    let mut res = ErrorReply::new(StatusCode::UNAUTHORIZED, "unauthorized", message).into_response();
    res.headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::into_handler;
    use switchyard_core::{Request, TriggerKind};
    use tower::ServiceExt;

    struct StaticTokens;

    #[async_trait]
    impl ClaimsProvider for StaticTokens {
        async fn claims(&self, token: &str) -> Result<Option<Claims>, BoxError> {
            Ok((token == "good").then(|| Claims::new("user-1").with_scope("orders:read")))
        }
    }

    fn ctx(auth: Option<&str>) -> Arc<InvocationContext> {
        let mut builder = Request::builder(TriggerKind::Call);
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        Arc::new(InvocationContext::new(Arc::new(builder.build())))
    }

    async fn whoami(claims: Claims) -> String {
        claims.subject
    }

    #[tokio::test]
    async fn valid_token_reaches_the_handler() {
        let svc = AuthLayer::new(StaticTokens).layer(into_handler(whoami));
        let res = svc.oneshot(ctx(Some("Bearer good"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body().to_bytes(), "user-1");
    }

    #[tokio::test]
    async fn missing_or_invalid_tokens_short_circuit() {
        let svc = AuthLayer::new(StaticTokens).layer(into_handler(whoami));

        let res = svc.clone().oneshot(ctx(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[WWW_AUTHENTICATE], "Bearer");

        let res = svc.oneshot(ctx(Some("Bearer bad"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
