//! Caller-supplied collaborators.
//!
//! Anything shared across invocations (caches, clients, repositories) is
//! registered once in a [`Services`] map at startup and read through the
//! invocation context. The map is never written after the dispatcher is built.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Type-erased service handle. The inner value is an `Arc<T>` for the
/// registered `T`, which may be a trait object.
pub type ServiceArc = Arc<dyn Any + Send + Sync>;

/// Read-only collaborator registry keyed by type.
#[derive(Clone, Default)]
pub struct Services {
    map: HashMap<TypeId, ServiceArc>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service under the type `T`, replacing any previous one.
    ///
    /// `T` may be unsized, so `Arc<dyn Repository>` is registered with
    /// `insert::<dyn Repository>(repo)`.
    pub fn insert<T: ?Sized + Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.map.insert(TypeId::of::<T>(), Arc::new(service));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<T: ?Sized + Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.insert(service);
        self
    }

    /// Looks up a service by the type it was registered under.
    pub fn get<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|arc| arc.downcast_ref::<Arc<T>>().map(Arc::clone))
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("count", &self.map.len())
            .finish()
    }
}

/// Metrics recording capability.
///
/// Backends live outside the core; register one with
/// `services.insert::<dyn Metrics>(...)`.
pub trait Metrics: Send + Sync + 'static {
    /// Increments a counter by one.
    fn increment(&self, name: &'static str, tags: &[(&'static str, &str)]);

    /// Records an elapsed duration.
    fn record_duration(&self, name: &'static str, elapsed: Duration, tags: &[(&'static str, &str)]);
}

/// Discards every measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn increment(&self, _name: &'static str, _tags: &[(&'static str, &str)]) {}

    fn record_duration(
        &self,
        _name: &'static str,
        _elapsed: Duration,
        _tags: &[(&'static str, &str)],
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn trait_objects_round_trip() {
        let services = Services::new().with::<dyn Greeter>(Arc::new(English));
        let greeter = services.get::<dyn Greeter>().unwrap();
        assert_eq!(greeter.greet(), "hello");
        assert!(services.get::<English>().is_none());
    }

    #[test]
    fn concrete_types_round_trip() {
        let mut services = Services::new();
        services.insert(Arc::new(42_u64));
        assert_eq!(*services.get::<u64>().unwrap(), 42);
        assert!(services.contains::<u64>());
        assert_eq!(services.len(), 1);
    }
}
