//! Handler system for the Switchyard framework.
//!
//! - **Handler** ([`traits`]) – the [`Handler`] trait, implemented for async
//!   functions whose arguments are [`FromContext`](crate::FromContext)
//!   extractors, similar to Axum's handler system
//! - **Response** ([`response`]) – [`IntoResponse`] for handler return values
//! - **Builder** ([`builder`]) – [`ServiceBuilderExt`] for assembling a
//!   handler from tower layers
//! - **Service** ([`service`]) – [`HandlerService`], the tower `Service`
//!   wrapper, and the type-erased [`BoxedHandler`] every route stores
//!
//! Plain functions and [`Typed`](crate::typed::Typed) bindings both end up as
//! a [`BoxedHandler`] at registration, so the dispatcher never inspects what
//! kind of handler it is calling.

pub mod builder;
pub mod response;
pub mod service;
pub mod traits;

pub use builder::{Guard, ServiceBuilderExt, ServiceMarker};
pub use response::IntoResponse;
pub use service::{BoxedHandler, HandlerService, boxed, into_handler};
pub use traits::Handler;
