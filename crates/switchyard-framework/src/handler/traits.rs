//! The [`Handler`] trait and its blanket implementations for functions.
//!
//! # Example
//!
//! ```rust,ignore
//! // No extractors
//! async fn health() -> &'static str {
//!     "ok"
//! }
//!
//! // Extractors, fallible
//! async fn get_order(
//!     params: PathParams,
//!     store: Service<dyn OrderStore>,
//! ) -> Result<Json<Order>, HttpError> {
//!     let id = params.require("id")?;
//!     store.find(id).await.map(Json).ok_or_else(|| HttpError::not_found(id))
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use switchyard_core::{InvocationContext, Response};
use tower::BoxError;

use super::response::IntoResponse;
use crate::extractor::FromContext;

/// The core trait for request handlers.
///
/// # Blanket Implementation
///
/// Implemented for async functions that:
/// - Take 0-8 parameters that implement [`FromContext`]
/// - Return a type that implements [`IntoResponse`]
///
/// Extraction failures and `Err` return values are both returned as
/// `Err(BoxError)` for the error boundary to classify.
#[async_trait]
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Call the handler with the given context.
    async fn call(self, ctx: Arc<InvocationContext>) -> Result<Response, BoxError>;
}

/// Generates Handler implementations for functions with different arities.
macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_variables)]
        #[async_trait]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: IntoResponse + 'static,
            $( $ty: FromContext + Send + 'static, )*
        {
            async fn call(self, ctx: Arc<InvocationContext>) -> Result<Response, BoxError> {
                $(
                    let $ty = $ty::from_context(&ctx)?;
                )*

                (self)($($ty,)*).await.into_response()
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
