//! Error types for the Switchyard framework.
//!
//! Handlers and middleware return [`tower::BoxError`]; the
//! [`ErrorBoundary`](crate::boundary::ErrorBoundary) downcasts it back to one
//! of these types to build a structured reply.

use std::borrow::Cow;

use http::StatusCode;
use serde_json::{Value, json};
use switchyard_core::ValidationErrors;
use thiserror::Error;

// =============================================================================
// HttpError
// =============================================================================

/// A business error that already knows how it should be presented.
///
/// ```rust,ignore
/// async fn get_order(params: PathParams) -> Result<Json<Order>, HttpError> {
///     let id = params.get("id").unwrap_or_default();
///     Err(HttpError::not_found(format!("order {id} does not exist")))
/// }
/// ```
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    code: Cow<'static, str>,
    message: String,
    details: Option<Value>,
}

impl HttpError {
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

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// Attaches structured details to the reply.
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

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Whether the caller caused the error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }
}

// =============================================================================
// BindError
// =============================================================================

/// The request body could not be bound to the declared input shape.
#[derive(Debug, Clone, Error)]
pub enum BindError {
    /// The body is not a valid encoding of the input shape.
    #[error("failed to decode body: {message}")]
    Decode {
        /// Decoder message.
        message: String,
        /// Offending field, when the decoder names one.
        field: Option<String>,
    },

    /// The body decoded but failed field validation.
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
}

impl BindError {
    pub fn decode(message: impl Into<String>, field: Option<String>) -> Self {
        Self::Decode {
            message: message.into(),
            field,
        }
    }

    /// `400` for undecodable bodies, `422` for validation failures.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Decode { .. } => StatusCode::BAD_REQUEST,
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "invalid_body",
            Self::Invalid(_) => "validation_failed",
        }
    }

    /// Per-field detail for the reply body.
    pub fn details(&self) -> Value {
        match self {
            Self::Decode {
                field: Some(field),
                message,
            } => json!({
                "fields": [{ "field": field, "code": "decode", "message": message }]
            }),
            Self::Decode { field: None, .. } => json!({ "fields": [] }),
            Self::Invalid(errors) => json!({ "fields": errors }),
        }
    }
}

// =============================================================================
// ExtractError
// =============================================================================

/// Errors that can occur while extracting handler arguments.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The handler asked for a path parameter its route does not capture.
    #[error("missing path parameter '{0}'")]
    MissingPathParam(String),

    /// A path parameter could not be parsed into the requested type.
    #[error("invalid path parameter '{name}': {reason}")]
    InvalidPathParam {
        /// Parameter name.
        name: String,
        /// Parse failure.
        reason: String,
    },

    /// No collaborator of the requested type was registered.
    #[error("service '{0}' is not registered")]
    ServiceNotFound(&'static str),

    /// Nothing was stored in the context under the key.
    #[error("no value stored in context under '{0}'")]
    MissingState(String),

    /// The body could not be bound.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Client-caused failures are `400`; wiring mistakes are `500`.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPathParam { .. } | Self::Custom(_) => StatusCode::BAD_REQUEST,
            Self::Bind(bind) => bind.status(),
            Self::MissingPathParam(_) | Self::ServiceNotFound(_) | Self::MissingState(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_statuses() {
        assert_eq!(
            BindError::decode("expected value", None).status(),
            StatusCode::BAD_REQUEST
        );

        let mut errors = ValidationErrors::new();
        errors.push("name", "non_empty", "must not be empty");
        let err = BindError::from(errors);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.details()["fields"][0]["field"], "name");
    }

    #[test]
    fn extract_error_statuses() {
        assert_eq!(
            ExtractError::ServiceNotFound("Db").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ExtractError::InvalidPathParam {
                name: "id".into(),
                reason: "invalid digit".into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
