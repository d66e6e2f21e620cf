//! Foundation layer: the canonical request/response model and the error and
//! validation vocabulary shared by every other layer.

pub mod error;
pub mod request;
pub mod response;
pub mod trigger;
pub mod validate;

pub use error::{
    AdapterError, AdapterResult, NormalizeError, Panicked, RegistrationError, RegistrationResult,
    RouteNotFound,
};
pub use request::{Metadata, PathParams, QueryParams, Record, Request, RequestBuilder};
pub use response::{Body, Response};
pub use trigger::{ParseTriggerKindError, TriggerKind};
pub use validate::{FieldError, Validate, ValidationErrors};
