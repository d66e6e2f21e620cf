//! # Switchyard Framework
//!
//! Routing, middleware and handler binding on top of `switchyard-core`.
//!
//! This layer provides:
//! - [`App`], the startup registration surface, frozen into a [`Dispatcher`]
//! - Dual routing: [`PathRouter`] for call-style requests, [`TriggerRouter`]
//!   for every other trigger kind
//! - [`Handler`] with Axum-style extractors ([`FromContext`])
//! - Typed binding ([`typed`], [`for_each_record`], [`Json`]) with a
//!   pluggable [`Codec`]
//! - Tower-based middleware ([`from_fn`], [`RecoverLayer`], [`TraceLayer`],
//!   [`AuthLayer`]) composed once per route
//! - The [`ErrorBoundary`] that turns handler errors into structured replies

pub mod app;
pub mod background;
pub mod boundary;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod handler;
pub mod middleware;
pub mod routing;
pub mod typed;

pub use app::{App, DispatchOptions, Group};
pub use background::spawn_detached;
pub use boundary::{ErrorBoundary, ErrorReply};
pub use dispatcher::{Dispatcher, Failure, InvocationScope, Outcome};
pub use error::{BindError, ExtractError, ExtractResult, HttpError};
pub use extractor::{
    Body, Cancellation, Ctx, Deadline, FromContext, Headers, PathParamsExt, Query, Records, Service,
};
pub use handler::{
    BoxedHandler, Guard, Handler, HandlerService, IntoResponse, ServiceBuilderExt, boxed,
    into_handler,
};
pub use middleware::{
    AuthLayer, CLAIMS_KEY, Claims, ClaimsProvider, Middleware, MiddlewareStack, Next,
    RecoverLayer, SharedMiddleware, TraceLayer, from_fn,
};
pub use routing::{PathRouter, Route, SourcePattern, TriggerRouter};
pub use typed::{Codec, Json, JsonCodec, Typed, for_each_record, typed};

pub use http;
pub use tower::BoxError;
