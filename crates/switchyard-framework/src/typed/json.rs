//! The [`Json`] extractor and response.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use switchyard_core::{InvocationContext, Response, Validate};
use tower::BoxError;

use super::codec::{Codec, JsonCodec};
use crate::error::{ExtractError, ExtractResult};
use crate::extractor::FromContext;
use crate::handler::IntoResponse;

/// JSON body, decoded and validated on the way in, encoded on the way out.
///
/// As an extractor, a decode failure or a validation failure aborts the
/// invocation with an [`ExtractError::Bind`], which the error boundary turns
/// into `400` or `422`.
///
/// ```rust,ignore
/// async fn create(Json(order): Json<NewOrder>) -> (StatusCode, Json<Order>) {
///     (StatusCode::CREATED, Json(order.into()))
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> FromContext for Json<T>
where
    T: DeserializeOwned + Validate,
{
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        let value: T = JsonCodec::decode(ctx.request().body())?;
        value
            .validate()
            .map_err(|errors| ExtractError::Bind(errors.into()))?;
        Ok(Self(value))
    }
}

impl<T> IntoResponse for Json<T>
where
    T: Serialize + Send,
{
    fn into_response(self) -> Result<Response, BoxError> {
        let mut res = Response::new(StatusCode::OK);
        res.set_body(JsonCodec::encode(&self.0)?);
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use switchyard_core::{Request, TriggerKind, ValidationErrors};

    #[derive(Debug, Deserialize)]
    struct Signup {
        email: String,
    }

    impl Validate for Signup {
        fn validate(&self) -> Result<(), ValidationErrors> {
            let mut errors = ValidationErrors::new();
            if !self.email.contains('@') {
                errors.push("email", "custom", "must contain '@'");
            }
            errors.into_result()
        }
    }

    fn ctx(body: &'static str) -> Arc<InvocationContext> {
        Arc::new(InvocationContext::new(Arc::new(
            Request::builder(TriggerKind::Call).body(body).build(),
        )))
    }

    #[test]
    fn decodes_and_validates() {
        let Json(signup) = Json::<Signup>::from_context(&ctx(r#"{"email":"a@b"}"#)).unwrap();
        assert_eq!(signup.email, "a@b");

        let err = Json::<Signup>::from_context(&ctx(r#"{"email":"nope"}"#)).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = Json::<Signup>::from_context(&ctx("{not json")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
