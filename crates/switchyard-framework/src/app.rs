//! Registration surface.
//!
//! An [`App`] collects adapters, collaborators, middleware and routes during
//! startup and is then turned into an immutable [`Dispatcher`]:
//!
//! ```rust,ignore
//! let mut app = App::new().with_adapters(aws::registry()?);
//! app.layer(TraceLayer::new());
//! app.get("/orders/:id", get_order)?;
//! app.post("/orders", typed(create_order).status(StatusCode::CREATED))?;
//! app.trigger(TriggerKind::QueueBatch, "orders-queue", for_each_record(process_order))?;
//!
//! let mut admin = app.group("/admin");
//! admin.layer(AuthLayer::new(tokens));
//! admin.delete("/orders/:id", cancel_order)?;
//!
//! let dispatcher = app.build();
//! ```
//!
//! Every route's middleware chain is composed when the route is registered,
//! from the global middleware registered so far followed by the group's.
//! Middleware added later does not reach routes that already exist.

use std::fmt;
use std::sync::Arc;

use http::Method;
use serde::{Deserialize, Serialize};
use switchyard_core::{
    Adapter, AdapterRegistry, RegistrationResult, Services, TriggerKind,
};
use tracing::{debug, info};

use crate::boundary::ErrorBoundary;
use crate::dispatcher::Dispatcher;
use crate::handler::{BoxedHandler, Handler, into_handler};
use crate::middleware::{Middleware, MiddlewareStack, RecoverLayer, SharedMiddleware, TraceLayer};
use crate::routing::{PathRouter, Route, TriggerRouter};

/// Dispatch behavior fixed at startup.
///
/// Applies to routes registered after the options are set, so pass them to
/// [`App::with_options`] before registering anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchOptions {
    /// Install [`RecoverLayer`] outermost on every route.
    pub recover_panics: bool,
    /// Install a [`TraceLayer`] named after the route on every route.
    pub trace_routes: bool,
    /// Let unmapped error messages reach the caller.
    pub expose_error_details: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            recover_panics: true,
            trace_routes: false,
            expose_error_details: false,
        }
    }
}

/// Route and middleware registry, consumed by [`App::build`].
#[derive(Default)]
pub struct App {
    adapters: AdapterRegistry,
    paths: PathRouter,
    triggers: TriggerRouter,
    middleware: MiddlewareStack,
    services: Services,
    boundary: ErrorBoundary,
    options: DispatchOptions,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DispatchOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    // ─── Adapters & collaborators ─────────────────────────────────────────────

    /// Replaces the adapter registry.
    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    /// Appends one adapter after the registered ones.
    pub fn adapter<A: Adapter>(&mut self, adapter: A) -> RegistrationResult<&mut Self> {
        self.adapters.register(adapter)?;
        Ok(self)
    }

    /// Registers a collaborator, looked up by handlers through
    /// [`Service<T>`](crate::extractor::Service).
    ///
    /// Trait objects are registered under the trait:
    /// `app.service::<dyn OrderStore>(Arc::new(PgStore::new()))`.
    pub fn service<T: ?Sized + Send + Sync + 'static>(&mut self, service: Arc<T>) -> &mut Self {
        self.services.insert(service);
        self
    }

    pub fn error_boundary(&mut self, boundary: ErrorBoundary) -> &mut Self {
        self.boundary = boundary;
        self
    }

    // ─── Middleware ───────────────────────────────────────────────────────────

    /// Adds a global middleware. The first one added is outermost.
    pub fn layer<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.use_middleware(Arc::new(middleware))
    }

    pub fn use_middleware(&mut self, middleware: SharedMiddleware) -> &mut Self {
        debug!(middleware = middleware.name(), "Added global middleware");
        self.middleware.push(middleware);
        self
    }

    // ─── Routes ───────────────────────────────────────────────────────────────

    /// Registers a call-style route.
    pub fn call<H, T>(&mut self, method: Method, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register_call(&MiddlewareStack::new(), method, pattern, into_handler(handler))?;
        Ok(self)
    }

    pub fn get<H, T>(&mut self, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.call(Method::GET, pattern, handler)
    }

    pub fn post<H, T>(&mut self, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.call(Method::POST, pattern, handler)
    }

    pub fn put<H, T>(&mut self, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.call(Method::PUT, pattern, handler)
    }

    pub fn patch<H, T>(&mut self, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.call(Method::PATCH, pattern, handler)
    }

    pub fn delete<H, T>(&mut self, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.call(Method::DELETE, pattern, handler)
    }

    /// Registers a route for a non-call trigger kind.
    pub fn trigger<H, T>(&mut self, kind: TriggerKind, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register_trigger(&MiddlewareStack::new(), kind, pattern, into_handler(handler))?;
        Ok(self)
    }

    /// Opens a group whose routes share a path prefix and extra middleware.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group {
            app: self,
            prefix: prefix.trim_end_matches('/').to_string(),
            middleware: MiddlewareStack::new(),
        }
    }

    /// Freezes the registrations into a dispatcher.
    pub fn build(self) -> Dispatcher {
        let boundary = if self.options.expose_error_details {
            self.boundary.expose_details(true)
        } else {
            self.boundary
        };

        info!(
            adapters = ?self.adapters.names(),
            call_routes = self.paths.len(),
            trigger_routes = self.triggers.len(),
            services = self.services.len(),
            "Dispatcher built"
        );
        for (method, pattern) in self.paths.routes() {
            debug!(%method, %pattern, "Call route");
        }
        for (kind, pattern) in self.triggers.routes() {
            debug!(trigger = %kind, %pattern, "Trigger route");
        }

        Dispatcher::new(
            self.adapters,
            self.paths,
            self.triggers,
            Arc::new(self.services),
            boundary,
        )
    }

    // ─── Internals ────────────────────────────────────────────────────────────

    fn register_call(
        &mut self,
        scoped: &MiddlewareStack,
        method: Method,
        pattern: &str,
        handler: BoxedHandler,
    ) -> RegistrationResult<()> {
        let key = format!("{method} {pattern}");
        let service = self.assemble(&key, scoped, handler);
        self.paths
            .register(method, pattern, Route::new(TriggerKind::Call, key.as_str(), service))?;
        debug!(route = %key, "Registered call route");
        Ok(())
    }

    fn register_trigger(
        &mut self,
        scoped: &MiddlewareStack,
        kind: TriggerKind,
        pattern: &str,
        handler: BoxedHandler,
    ) -> RegistrationResult<()> {
        let key = format!("{kind} {pattern}");
        let service = self.assemble(&key, scoped, handler);
        self.triggers
            .register(kind, pattern, Route::new(kind, pattern, service))?;
        debug!(route = %key, "Registered trigger route");
        Ok(())
    }

    /// Builds the final service of one route:
    /// recover → trace → global → group → handler.
    fn assemble(&self, key: &str, scoped: &MiddlewareStack, handler: BoxedHandler) -> BoxedHandler {
        let mut stack = MiddlewareStack::new();
        if self.options.trace_routes {
            stack.push(Arc::new(TraceLayer::for_route(key)));
        }
        stack.extend(&self.middleware);
        stack.extend(scoped);

        let service = stack.compose(handler);
        if self.options.recover_panics {
            RecoverLayer::new().wrap(service)
        } else {
            service
        }
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("adapters", &self.adapters.names())
            .field("call_routes", &self.paths.len())
            .field("trigger_routes", &self.triggers.len())
            .field("middleware", &self.middleware.len())
            .field("options", &self.options)
            .finish()
    }
}

// =============================================================================
// Group
// =============================================================================

/// Routes sharing a path prefix and group-scoped middleware.
///
/// Group middleware runs inside the global middleware. Nested groups inherit
/// the parent's prefix and middleware.
pub struct Group<'a> {
    app: &'a mut App,
    prefix: String,
    middleware: MiddlewareStack,
}

impl Group<'_> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Adds a middleware to routes registered through this group afterwards.
    pub fn layer<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn use_middleware(&mut self, middleware: SharedMiddleware) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Registers a call-style route under the group prefix.
    pub fn call<H, T>(&mut self, method: Method, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        let full = format!("{}{}", self.prefix, pattern);
        self.app
            .register_call(&self.middleware, method, &full, into_handler(handler))?;
        Ok(self)
    }

    pub fn get<H, T>(&mut self, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.call(Method::GET, pattern, handler)
    }

    pub fn post<H, T>(&mut self, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.call(Method::POST, pattern, handler)
    }

    pub fn put<H, T>(&mut self, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.call(Method::PUT, pattern, handler)
    }

    pub fn patch<H, T>(&mut self, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.call(Method::PATCH, pattern, handler)
    }

    pub fn delete<H, T>(&mut self, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.call(Method::DELETE, pattern, handler)
    }

    /// Registers a trigger route with the group's middleware. The prefix does
    /// not apply to source patterns.
    pub fn trigger<H, T>(&mut self, kind: TriggerKind, pattern: &str, handler: H) -> RegistrationResult<&mut Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.app
            .register_trigger(&self.middleware, kind, pattern, into_handler(handler))?;
        Ok(self)
    }

    /// Opens a nested group.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group {
            prefix: format!("{}{}", self.prefix, prefix.trim_end_matches('/')),
            middleware: self.middleware.clone(),
            app: &mut *self.app,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Next, from_fn};
    use parking_lot::Mutex;
    use serde_json::json;
    use switchyard_core::{RegistrationError, Request, Response};

    fn call_request(method: Method, path: &str) -> Request {
        Request::builder(TriggerKind::Call)
            .method(method)
            .path(path)
            .build()
    }

    fn tag(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> SharedMiddleware {
        Arc::new(from_fn(move |ctx, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(name);
                next.run(ctx).await
            }
        }))
    }

    #[test]
    fn duplicate_routes_fail_at_registration() {
        let mut app = App::new();
        app.get("/orders/:id", || async { "first" }).unwrap();
        let err = app.get("/orders/:id", || async { "second" }).unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateRoute { .. }));

        app.trigger(TriggerKind::Scheduled, "nightly", || async {}).unwrap();
        let err = app
            .trigger(TriggerKind::Scheduled, "nightly", || async {})
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateRoute { .. }));
    }

    #[test]
    fn call_kind_cannot_be_registered_as_a_trigger() {
        let err = App::new()
            .trigger(TriggerKind::Call, "*", || async {})
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidPattern { .. }));
    }

    #[test]
    fn groups_prefix_their_routes() {
        let mut app = App::new();
        {
            let mut admin = app.group("/admin/");
            admin.get("/orders", || async {}).unwrap();
            admin.group("/reports").get("/daily", || async {}).unwrap();
        }
        let patterns: Vec<_> = app.paths.routes().iter().map(|(_, p)| p.to_string()).collect();
        assert_eq!(patterns, ["/admin/orders", "/admin/reports/daily"]);
    }

    #[tokio::test]
    async fn global_middleware_wraps_group_middleware() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = App::new();
        app.use_middleware(tag("global", Arc::clone(&log)));
        {
            let mut group = app.group("/v1");
            group.use_middleware(tag("group", Arc::clone(&log)));
            group.get("/ping", || async { "pong" }).unwrap();
        }
        app.get("/health", || async { "ok" }).unwrap();
        let dispatcher = app.build();

        let outcome = dispatcher
            .dispatch_request(call_request(Method::GET, "/v1/ping"), Default::default())
            .await;
        assert_eq!(outcome.response.body().to_bytes(), "pong");
        assert_eq!(*log.lock(), ["global", "group"]);

        log.lock().clear();
        dispatcher
            .dispatch_request(call_request(Method::GET, "/health"), Default::default())
            .await;
        assert_eq!(*log.lock(), ["global"]);
    }

    #[tokio::test]
    async fn middleware_added_later_skips_existing_routes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = App::new();
        app.get("/early", || async {}).unwrap();
        app.use_middleware(tag("late", Arc::clone(&log)));
        app.get("/late", || async {}).unwrap();
        let dispatcher = app.build();

        dispatcher
            .dispatch_request(call_request(Method::GET, "/early"), Default::default())
            .await;
        assert!(log.lock().is_empty());

        dispatcher
            .dispatch_request(call_request(Method::GET, "/late"), Default::default())
            .await;
        assert_eq!(*log.lock(), ["late"]);
    }

    #[tokio::test]
    async fn expose_error_details_reaches_the_boundary() {
        let mut app = App::with_options(DispatchOptions {
            expose_error_details: true,
            ..DispatchOptions::default()
        });
        app.get("/fail", || async {
            Err::<Response, _>(std::io::Error::other("disk on fire"))
        })
        .unwrap();

        let outcome = app
            .build()
            .dispatch_request(call_request(Method::GET, "/fail"), Default::default())
            .await;
        assert_eq!(outcome.response.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            outcome.response.body().as_json().unwrap()["error"]["message"],
            json!("disk on fire")
        );
    }
}
