//! Conversion of handler return values into a [`Response`].

use http::StatusCode;
use serde_json::Value;
use switchyard_core::Response;
use tower::BoxError;

/// A trait for types that can be returned from handlers.
///
/// Conversion itself may fail (for example when a value cannot be
/// serialized); the error is forwarded to the error boundary.
pub trait IntoResponse: Send {
    fn into_response(self) -> Result<Response, BoxError>;
}

impl IntoResponse for Response {
    fn into_response(self) -> Result<Response, BoxError> {
        Ok(self)
    }
}

/// `200` with an empty body.
impl IntoResponse for () {
    fn into_response(self) -> Result<Response, BoxError> {
        Ok(Response::ok())
    }
}

/// `200 text/plain`.
impl IntoResponse for String {
    fn into_response(self) -> Result<Response, BoxError> {
        Ok(Response::text(StatusCode::OK, self))
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Result<Response, BoxError> {
        Ok(Response::text(StatusCode::OK, self))
    }
}

/// Empty body with the given status.
impl IntoResponse for StatusCode {
    fn into_response(self) -> Result<Response, BoxError> {
        Ok(Response::new(self))
    }
}

/// `200` JSON.
impl IntoResponse for Value {
    fn into_response(self) -> Result<Response, BoxError> {
        Ok(Response::json(StatusCode::OK, self))
    }
}

/// Overrides the status of the inner response.
impl<T: IntoResponse> IntoResponse for (StatusCode, T) {
    fn into_response(self) -> Result<Response, BoxError> {
        let (status, inner) = self;
        let mut res = inner.into_response()?;
        res.set_status(status);
        Ok(res)
    }
}

/// On `Ok` the inner value is converted; `Err` goes to the error boundary
/// untouched.
impl<T, E> IntoResponse for Result<T, E>
where
    T: IntoResponse,
    E: Into<BoxError> + Send,
{
    fn into_response(self) -> Result<Response, BoxError> {
        match self {
            Ok(t) => t.into_response(),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use serde_json::json;

    #[test]
    fn status_tuple_overrides_inner_status() {
        let res = (StatusCode::CREATED, json!({"id": 1})).into_response().unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.body().as_json(), Some(&json!({"id": 1})));
    }

    #[test]
    fn err_is_forwarded_unmodified() {
        let result: Result<String, HttpError> = Err(HttpError::forbidden("no"));
        let err = result.into_response().unwrap_err();
        assert_eq!(err.downcast_ref::<HttpError>().unwrap().code(), "forbidden");
    }
}
