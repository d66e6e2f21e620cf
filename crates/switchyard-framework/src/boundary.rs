//! The error boundary.
//!
//! Every error that escapes a route's middleware chain is turned into a
//! response here, in one place. The reply body always has the shape
//!
//! ```json
//! {"error": {"code": "not_found", "message": "order 7 does not exist"}}
//! ```
//!
//! with an optional `details` member.
//!
//! Custom mappings registered with [`ErrorBoundary::map`] are tried first,
//! then the built-in ones. Anything left is a generic `500 internal_error`
//! whose message is hidden from the caller unless
//! [`expose_details`](ErrorBoundary::expose_details) is set. Unmapped errors
//! are always logged.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde_json::{Map, Value};
use switchyard_core::{NormalizeError, Panicked, Response, RouteNotFound};
use tower::BoxError;
use tracing::{debug, error, warn};

use crate::error::{BindError, ExtractError, HttpError};

type DynError = dyn StdError + 'static;

// =============================================================================
// ErrorReply
// =============================================================================

/// A structured error reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReply {
    status: StatusCode,
    code: Cow<'static, str>,
    message: String,
    details: Option<Value>,
}

impl ErrorReply {
    pub fn new(
        status: StatusCode,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the reply as a JSON response.
    pub fn into_response(self) -> Response {
        let mut error = Map::new();
        error.insert("code".into(), Value::String(self.code.into_owned()));
        error.insert("message".into(), Value::String(self.message));
        if let Some(details) = self.details {
            error.insert("details".into(), details);
        }
        let mut body = Map::new();
        body.insert("error".into(), Value::Object(error));
        Response::json(self.status, Value::Object(body))
    }
}

impl From<&HttpError> for ErrorReply {
    fn from(err: &HttpError) -> Self {
        let reply = Self::new(err.status(), err.code().to_string(), err.message());
        match err.details() {
            Some(details) => reply.with_details(details.clone()),
            None => reply,
        }
    }
}

impl From<&BindError> for ErrorReply {
    fn from(err: &BindError) -> Self {
        Self::new(err.status(), err.code(), err.to_string()).with_details(err.details())
    }
}

// =============================================================================
// ErrorBoundary
// =============================================================================

type Mapper = Arc<dyn Fn(&DynError) -> Option<ErrorReply> + Send + Sync>;

/// Central error-to-response policy.
#[derive(Clone, Default)]
pub struct ErrorBoundary {
    mappers: Vec<Mapper>,
    expose_details: bool,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets unmapped error messages reach the caller. Off by default.
    pub fn expose_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }

    pub fn exposes_details(&self) -> bool {
        self.expose_details
    }

    /// Registers a mapping for errors of type `E`.
    ///
    /// Mappings are tried in registration order, before the built-in ones.
    ///
    /// ```rust,ignore
    /// let boundary = ErrorBoundary::new()
    ///     .map(|e: &StoreError| match e {
    ///         StoreError::NotFound(id) => ErrorReply::new(StatusCode::NOT_FOUND, "not_found", format!("{id} not found")),
    ///         StoreError::Unavailable => ErrorReply::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable", "try again"),
    ///     });
    /// ```
    pub fn map<E, F>(mut self, f: F) -> Self
    where
        E: StdError + 'static,
        F: Fn(&E) -> ErrorReply + Send + Sync + 'static,
    {
        self.mappers
            .push(Arc::new(move |err: &DynError| err.downcast_ref::<E>().map(&f)));
        self
    }

    /// Converts a boxed handler error into a response.
    pub fn handle(&self, err: &BoxError) -> Response {
        self.handle_error(&**err)
    }

    /// Converts any error into a response.
    ///
    /// The error and then each of its sources is offered to the mappings, so
    /// a known error wrapped by another library is still recognized.
    pub fn handle_error(&self, err: &DynError) -> Response {
        let mut current: Option<&DynError> = Some(err);
        while let Some(e) = current {
            if let Some(reply) = self.classify(e) {
                self.log(err, &reply);
                return reply.into_response();
            }
            current = e.source();
        }

        error!(error = %err, "Unhandled handler error");
        let message = if self.expose_details {
            err.to_string()
        } else {
            "internal server error".to_string()
        };
        ErrorReply::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            .into_response()
    }

    fn classify(&self, err: &DynError) -> Option<ErrorReply> {
        if let Some(reply) = self.mappers.iter().find_map(|m| m(err)) {
            return Some(reply);
        }

        if let Some(e) = err.downcast_ref::<HttpError>() {
            return Some(e.into());
        }
        if let Some(e) = err.downcast_ref::<BindError>() {
            return Some(e.into());
        }
        if let Some(e) = err.downcast_ref::<ExtractError>() {
            return Some(self.extract_reply(e));
        }
        if let Some(e) = err.downcast_ref::<RouteNotFound>() {
            return Some(ErrorReply::new(
                StatusCode::NOT_FOUND,
                "route_not_found",
                e.to_string(),
            ));
        }
        if let Some(e) = err.downcast_ref::<Panicked>() {
            return Some(self.internal(e));
        }
        if let Some(e) = err.downcast_ref::<NormalizeError>() {
            return Some(self.internal(e));
        }
        None
    }

    fn extract_reply(&self, err: &ExtractError) -> ErrorReply {
        match err {
            ExtractError::Bind(bind) => bind.into(),
            _ if err.status().is_server_error() => self.internal(err),
            _ => ErrorReply::new(err.status(), "bad_request", err.to_string()),
        }
    }

    fn internal(&self, err: &dyn fmt::Display) -> ErrorReply {
        let message = if self.expose_details {
            err.to_string()
        } else {
            "internal server error".to_string()
        };
        ErrorReply::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    fn log(&self, err: &DynError, reply: &ErrorReply) {
        if reply.status().is_server_error() {
            error!(error = %err, status = reply.status().as_u16(), code = reply.code(), "Request failed");
        } else if reply.status() == StatusCode::UNAUTHORIZED || reply.status() == StatusCode::FORBIDDEN {
            warn!(error = %err, status = reply.status().as_u16(), code = reply.code(), "Request rejected");
        } else {
            debug!(error = %err, status = reply.status().as_u16(), code = reply.code(), "Request rejected");
        }
    }
}

impl fmt::Debug for ErrorBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorBoundary")
            .field("mappers", &self.mappers.len())
            .field("expose_details", &self.expose_details)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchyard_core::{TriggerKind, ValidationErrors};
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("store unavailable")]
    struct StoreDown;

    #[derive(Debug, Error)]
    #[error("wrapped: {0}")]
    struct Wrapper(#[source] HttpError);

    fn body(res: &Response) -> &Value {
        res.body().as_json().unwrap()
    }

    #[test]
    fn http_errors_keep_their_status_and_code() {
        let err: BoxError = Box::new(HttpError::not_found("order 7"));
        let res = ErrorBoundary::new().handle(&err);
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&res)["error"]["code"], "not_found");
        assert_eq!(body(&res)["error"]["message"], "order 7");
    }

    #[test]
    fn unmapped_errors_are_hidden_by_default() {
        let err: BoxError = Box::new(StoreDown);
        let res = ErrorBoundary::new().handle(&err);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&res)["error"]["message"], "internal server error");

        let res = ErrorBoundary::new().expose_details(true).handle(&err);
        assert_eq!(body(&res)["error"]["message"], "store unavailable");
    }

    #[test]
    fn custom_mappings_take_precedence() {
        let boundary = ErrorBoundary::new().map(|_: &StoreDown| {
            ErrorReply::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable", "try later")
        });
        let res = boundary.handle(&(Box::new(StoreDown) as BoxError));
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body(&res)["error"]["code"], "unavailable");
    }

    #[test]
    fn validation_failures_carry_field_details() {
        let mut errors = ValidationErrors::new();
        errors.push("quantity", "range", "must be at least 1");
        let err: BoxError = Box::new(ExtractError::Bind(BindError::Invalid(errors)));
        let res = ErrorBoundary::new().handle(&err);
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body(&res)["error"]["details"]["fields"][0],
            json!({"field": "quantity", "code": "range", "message": "must be at least 1"})
        );
    }

    #[test]
    fn sources_are_searched() {
        let err: BoxError = Box::new(Wrapper(HttpError::forbidden("nope")));
        let res = ErrorBoundary::new().handle(&err);
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn custom_mappings_match_wrapped_sources() {
        #[derive(Debug, Error)]
        #[error("repository failed")]
        struct RepoError(#[source] StoreDown);

        let boundary = ErrorBoundary::new().map(|_: &StoreDown| {
            ErrorReply::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable", "try later")
        });
        let res = boundary.handle(&(Box::new(RepoError(StoreDown)) as BoxError));
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body(&res)["error"]["code"], "unavailable");
    }

    #[test]
    fn route_not_found_is_404() {
        let err = RouteNotFound {
            trigger: TriggerKind::Call,
            target: "GET /nope".into(),
        };
        let res = ErrorBoundary::new().handle_error(&err);
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&res)["error"]["code"], "route_not_found");
    }
}
