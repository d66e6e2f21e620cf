//! Unified error types for the Switchyard core.
//!
//! Errors raised while handling a request (business errors, extraction and
//! binding failures) live in `switchyard-framework`; this module only covers
//! what the core itself can fail at.

use thiserror::Error;

use super::trigger::TriggerKind;

// =============================================================================
// Normalization Errors
// =============================================================================

/// Errors produced by a single adapter while converting a payload it claimed.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// A field the adapter requires is absent.
    #[error("missing field '{field}'")]
    MissingField {
        /// Dotted path of the missing field.
        field: &'static str,
    },

    /// A field is present but has an unexpected shape.
    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Reason for rejection.
        reason: String,
    },

    /// A body flagged as base64 could not be decoded.
    #[error("failed to decode body: {0}")]
    BodyDecode(String),
}

impl AdapterError {
    /// Creates an invalid field error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors returned by [`AdapterRegistry::detect_and_adapt`](crate::AdapterRegistry::detect_and_adapt).
///
/// Both variants are fatal for the invocation: routing is never attempted.
#[derive(Debug, Clone, Error)]
pub enum NormalizeError {
    /// No registered adapter claimed the payload.
    #[error("unrecognized event: no adapter claimed the payload")]
    UnrecognizedEvent,

    /// An adapter claimed the payload but could not convert it.
    #[error("adapter '{adapter}' failed to normalize the payload: {source}")]
    Malformed {
        /// Name of the adapter that claimed the payload.
        adapter: &'static str,
        /// Underlying adapter failure.
        #[source]
        source: AdapterError,
    },
}

// =============================================================================
// Registration Errors
// =============================================================================

/// Errors returned by route and adapter registration.
///
/// Registration never panics; conflicts surface here at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A route with the same trigger kind and match key already exists.
    #[error("duplicate route: {trigger} '{key}' is already registered")]
    DuplicateRoute {
        /// Trigger kind of the conflicting route.
        trigger: TriggerKind,
        /// Match key of the conflicting route.
        key: String,
    },

    /// The pattern is malformed or not allowed for its trigger kind.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Reason for rejection.
        reason: String,
    },

    /// An adapter with the same name is already registered.
    #[error("adapter '{0}' is already registered")]
    DuplicateAdapter(&'static str),
}

impl RegistrationError {
    /// Creates an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// No registered route matched the request.
///
/// Non-fatal to the process. Call-style triggers turn it into a "not found"
/// response; batch-style triggers leave the policy to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no route for {trigger} '{target}'")]
pub struct RouteNotFound {
    /// Trigger kind of the unmatched request.
    pub trigger: TriggerKind,
    /// What was looked up: `METHOD /path` or the routing source.
    pub target: String,
}

/// A handler or middleware panicked and the panic was caught.
#[derive(Debug, Clone, Error)]
#[error("handler panicked: {message}")]
pub struct Panicked {
    /// Panic payload rendered as text, when it was a string.
    pub message: String,
}

impl Panicked {
    /// Builds the error from a payload returned by `catch_unwind`.
    pub fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;
