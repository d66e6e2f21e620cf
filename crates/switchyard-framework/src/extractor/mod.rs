//! Extractor system for the Switchyard framework.
//!
//! Handler functions declare what they need as arguments and the framework
//! supplies it from the [`InvocationContext`](switchyard_core::InvocationContext):
//!
//! ```rust,ignore
//! async fn get_order(params: PathParams, db: Service<dyn OrderStore>) -> Result<Json<Order>, HttpError> {
//!     // ...
//! }
//! ```
//!
//! # Error Handling
//!
//! A failing extractor aborts the invocation before the handler body runs.
//! The [`ExtractError`](crate::ExtractError) is forwarded to the error
//! boundary, which picks the status from [`ExtractError::status`](crate::ExtractError::status).
//! Optional extractors with [`Option<T>`] never fail.

pub mod core;
pub mod request;
pub mod service;

pub use self::core::{Ctx, FromContext};
pub use request::{Body, Cancellation, Deadline, Headers, PathParamsExt, Query, Records};
pub use service::Service;
