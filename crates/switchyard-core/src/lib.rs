//! # Switchyard Core
//!
//! The canonical model and event normalization layer of Switchyard.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Request/Response model**: [`Request`], [`Response`], [`Record`]
//! - **Trigger classification**: [`TriggerKind`]
//! - **Errors**: [`NormalizeError`], [`RegistrationError`], [`RouteNotFound`]
//! - **Validation vocabulary**: [`Validate`], [`ValidationErrors`]
//!
//! ### Invocation Layer
//!
//! - **Context**: [`InvocationContext`], one per dispatched request
//! - **Lifecycle**: [`InvocationState`], advanced monotonically
//! - **Collaborators**: [`Services`], [`Metrics`]
//!
//! ### Integration Layer
//!
//! - **Adapters**: [`Adapter`] and the ordered [`AdapterRegistry`]
//!
//! ## Flow
//!
//! ```text
//! raw payload ──▶ AdapterRegistry ──▶ Request ──▶ router ──▶ middleware ──▶ handler
//!                                                                            │
//! provider reply ◀── Adapter::reply ◀──────────── Response ◀─────────────────┘
//! ```
//!
//! Routing, middleware and handlers live in `switchyard-framework`.

pub mod foundation;
pub mod integration;
pub mod invocation;

pub use foundation::{
    AdapterError, AdapterResult, Body, FieldError, Metadata, NormalizeError, Panicked,
    ParseTriggerKindError, PathParams, QueryParams, Record, RegistrationError,
    RegistrationResult, Request, RequestBuilder, Response, RouteNotFound, TriggerKind, Validate,
    ValidationErrors,
};
pub use integration::{Adapter, AdapterRegistry, BoxedAdapter};
pub use invocation::{
    InvocationContext, InvocationState, Lifecycle, Metrics, NoopMetrics, Services,
    TransitionError,
};

/// Validation rule helpers used by `#[derive(Validate)]`.
pub use foundation::validate::rules;
