use std::fmt;
use std::sync::Arc;

use switchyard_core::TriggerKind;

use crate::handler::BoxedHandler;

/// A registered binding of a match key to its composed handler.
///
/// The handler already includes the route's full middleware chain.
#[derive(Clone)]
pub struct Route {
    trigger: TriggerKind,
    key: Arc<str>,
    service: BoxedHandler,
}

impl Route {
    pub fn new(trigger: TriggerKind, key: impl Into<Arc<str>>, service: BoxedHandler) -> Self {
        Self {
            trigger,
            key: key.into(),
            service,
        }
    }

    pub fn trigger(&self) -> TriggerKind {
        self.trigger
    }

    /// `METHOD /pattern` for call routes, the source pattern otherwise.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// A handle to the composed service, ready to be called once.
    pub fn service(&self) -> BoxedHandler {
        self.service.clone()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("trigger", &self.trigger)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
