use std::ops::Deref;
use std::sync::Arc;

use switchyard_core::{InvocationContext, Request};

use crate::error::ExtractResult;

/// A trait for types that can be extracted from an [`InvocationContext`].
///
/// Types implementing this trait can be used directly as handler function
/// parameters. Extraction is synchronous: everything it reads is already in
/// the context.
pub trait FromContext: Sized {
    /// Attempts to extract this type from the given context.
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self>;
}

/// Implementation for `Option<T>` where `T: FromContext`.
///
/// Turns any extraction failure into `None`.
impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}

/// The whole invocation context.
///
/// ```rust,ignore
/// async fn handler(ctx: Ctx) {
///     ctx.set("seen", true);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Ctx(pub Arc<InvocationContext>);

impl Deref for Ctx {
    type Target = InvocationContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for Ctx {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        Ok(Self(Arc::clone(ctx)))
    }
}

impl FromContext for Arc<InvocationContext> {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        Ok(Arc::clone(ctx))
    }
}

/// The normalized request.
impl FromContext for Arc<Request> {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        Ok(ctx.request_arc())
    }
}
