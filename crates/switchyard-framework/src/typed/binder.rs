//! The typed handler binder.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use switchyard_core::{InvocationContext, Response, Validate};
use tower::BoxError;
use tracing::debug;

use super::codec::{Codec, JsonCodec};
use crate::boundary::ErrorReply;
use crate::error::BindError;
use crate::handler::Handler;

/// Decodes `body` with `C` and validates the result.
pub fn bind<I, C>(body: &[u8]) -> Result<I, BindError>
where
    I: DeserializeOwned + Validate,
    C: Codec,
{
    let input: I = C::decode(body)?;
    input.validate()?;
    Ok(input)
}

/// Marker distinguishing typed bindings from plain function handlers.
pub struct TypedMarker<I>(PhantomData<fn() -> I>);

/// A business function bound to a codec and an input shape.
///
/// The function receives the invocation context and the decoded, validated
/// input, and returns `Result<O, E>`:
///
/// ```rust,ignore
/// async fn create_order(ctx: Arc<InvocationContext>, input: NewOrder) -> Result<Order, StoreError> {
///     // ...
/// }
///
/// app.post("/orders", typed(create_order).status(StatusCode::CREATED))?;
/// ```
pub struct Typed<F, I, C = JsonCodec> {
    f: F,
    status: StatusCode,
    _marker: PhantomData<fn() -> (I, C)>,
}

/// Binds `f` with the JSON codec and a `200` success status.
pub fn typed<F, Fut, I>(f: F) -> Typed<F, I, JsonCodec>
where
    F: Fn(Arc<InvocationContext>, I) -> Fut,
{
    Typed {
        f,
        status: StatusCode::OK,
        _marker: PhantomData,
    }
}

impl<F, I, C> Typed<F, I, C> {
    /// Overrides the success status.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Switches the codec.
    pub fn codec<C2: Codec>(self) -> Typed<F, I, C2> {
        Typed {
            f: self.f,
            status: self.status,
            _marker: PhantomData,
        }
    }
}

impl<F: Clone, I, C> Clone for Typed<F, I, C> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            status: self.status,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, I, O, E, C> Handler<TypedMarker<I>> for Typed<F, I, C>
where
    F: Fn(Arc<InvocationContext>, I) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    I: DeserializeOwned + Validate + Send + 'static,
    O: Serialize + Send + 'static,
    E: Into<BoxError> + Send + 'static,
    C: Codec,
{
    async fn call(self, ctx: Arc<InvocationContext>) -> Result<Response, BoxError> {
        let input = match bind::<I, C>(ctx.request().body()) {
            Ok(input) => input,
            Err(err) => {
                debug!(
                    request_id = %ctx.request().request_id(),
                    error = %err,
                    "Rejected request body"
                );
                return Ok(ErrorReply::from(&err).into_response());
            }
        };

        let output = (self.f)(Arc::clone(&ctx), input).await.map_err(Into::into)?;

        let mut res = Response::new(self.status);
        res.set_body(C::encode(&output)?);
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use switchyard_core::{Request, TriggerKind, ValidationErrors};

    #[derive(Debug, Deserialize)]
    struct NewOrder {
        sku: String,
        quantity: u32,
    }

    impl Validate for NewOrder {
        fn validate(&self) -> Result<(), ValidationErrors> {
            let mut errors = ValidationErrors::new();
            if self.sku.is_empty() {
                errors.push("sku", "non_empty", "must not be empty");
            }
            if self.quantity == 0 {
                errors.push("quantity", "range", "must be at least 1");
            }
            errors.into_result()
        }
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Order {
        id: u64,
        sku: String,
        quantity: u32,
    }

    fn ctx(body: &'static str) -> Arc<InvocationContext> {
        Arc::new(InvocationContext::new(Arc::new(
            Request::builder(TriggerKind::Call).body(body).build(),
        )))
    }

    fn counting() -> (
        Arc<AtomicUsize>,
        impl Fn(
            Arc<InvocationContext>,
            NewOrder,
        ) -> std::future::Ready<Result<Order, HttpError>>
        + Clone
        + Send
        + Sync
        + 'static,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let f = move |_ctx: Arc<InvocationContext>, input: NewOrder| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(Order {
                id: 1,
                sku: input.sku,
                quantity: input.quantity,
            }))
        };
        (calls, f)
    }

    #[tokio::test]
    async fn success_encodes_output_with_configured_status() {
        let (calls, f) = counting();
        let handler = typed(f).status(StatusCode::CREATED);
        let res = handler
            .call(ctx(r#"{"sku":"A-1","quantity":2}"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        let order: Order = JsonCodec::decode(&res.body().to_bytes()).unwrap();
        assert_eq!(
            order,
            Order {
                id: 1,
                sku: "A-1".into(),
                quantity: 2
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn validation_failure_short_circuits_with_422() {
        let (calls, f) = counting();
        let res = typed(f)
            .call(ctx(r#"{"sku":"","quantity":0}"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = res.body().as_json().unwrap();
        assert_eq!(body["error"]["code"], "validation_failed");
        assert_eq!(body["error"]["details"]["fields"][0]["field"], "sku");
        assert_eq!(body["error"]["details"]["fields"][1]["field"], "quantity");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecodable_body_is_400() {
        let (calls, f) = counting();
        let res = typed(f).call(ctx(r#"{"sku":"A-1"}"#)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let field = &res.body().as_json().unwrap()["error"]["details"]["fields"][0];
        assert_eq!(field["field"], json!("quantity"));
        assert_eq!(field["code"], json!("decode"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn business_errors_go_to_the_boundary() {
        let handler = typed(|_ctx: Arc<InvocationContext>, _input: NewOrder| async {
            Err::<Order, _>(HttpError::conflict("duplicate order"))
        });
        let err = handler
            .call(ctx(r#"{"sku":"A-1","quantity":1}"#))
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<HttpError>().unwrap().code(), "conflict");
    }
}
