//! Collaborator lookup.

use std::ops::Deref;
use std::sync::Arc;

use switchyard_core::InvocationContext;

use super::core::FromContext;
use crate::error::{ExtractError, ExtractResult};

/// A collaborator registered on the [`App`](crate::App) at startup.
///
/// `T` is the type the collaborator was registered under, usually a trait
/// object:
///
/// ```rust,ignore
/// async fn handler(store: Service<dyn OrderStore>) { store.save(..).await; }
/// ```
pub struct Service<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> Clone for Service<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> Deref for Service<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: ?Sized + Send + Sync + 'static> FromContext for Service<T> {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        ctx.service::<T>()
            .map(Self)
            .ok_or(ExtractError::ServiceNotFound(std::any::type_name::<T>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{Request, Services, TriggerKind};

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    struct Fixed;

    impl Clock for Fixed {
        fn now(&self) -> u64 {
            7
        }
    }

    #[test]
    fn resolves_registered_trait_objects() {
        let services = Arc::new(Services::new().with::<dyn Clock>(Arc::new(Fixed)));
        let ctx = Arc::new(
            InvocationContext::new(Arc::new(Request::builder(TriggerKind::Call).build()))
                .with_services(services),
        );

        let clock = Service::<dyn Clock>::from_context(&ctx).unwrap();
        assert_eq!(clock.now(), 7);
        assert!(matches!(
            Service::<String>::from_context(&ctx),
            Err(ExtractError::ServiceNotFound(_))
        ));
    }
}
