//! Adapter trait and registry.
//!
//! An [`Adapter`] recognizes one raw payload shape, converts it into a
//! canonical [`Request`], and later serializes the [`Response`] back into the
//! reply shape that payload's provider expects.
//!
//! The [`AdapterRegistry`] is built once at startup and shared read-only. It
//! asks adapters in registration order and the **first** one whose
//! [`can_handle`](Adapter::can_handle) returns `true` wins, so more specific
//! adapters must be registered before more general ones.
//!
//! ```rust,ignore
//! let registry = AdapterRegistry::new()
//!     .with(WebSocketAdapter)?
//!     .with(HttpApiAdapter)?;
//!
//! let request = registry.detect_and_adapt(&raw)?;
//! ```

use std::fmt;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use serde_json::{Map, Value, json};
use tracing::{debug, trace, warn};

use crate::foundation::{
    AdapterResult, Body, NormalizeError, RegistrationError, RegistrationResult, Request, Response,
};

/// One raw payload shape.
///
/// Implementations receive the payload by shared reference and must not
/// mutate it.
pub trait Adapter: Send + Sync + 'static {
    /// Unique adapter name, recorded on every request it produces.
    fn name(&self) -> &'static str;

    /// Cheap structural check: does this adapter recognize the payload?
    fn can_handle(&self, raw: &Value) -> bool;

    /// Converts a payload this adapter claimed.
    fn adapt(&self, raw: &Value) -> AdapterResult<Request>;

    /// Serializes a finished response into the provider's reply shape.
    ///
    /// Defaults to the call-style `{statusCode, headers, body}` object.
    fn reply(&self, request: &Request, response: Response) -> Value {
        let _ = request;
        call_reply(response)
    }
}

/// Shared handle to an adapter.
pub type BoxedAdapter = Arc<dyn Adapter>;

/// Ordered set of adapters.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: Vec<BoxedAdapter>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an adapter. Names must be unique.
    pub fn register<A: Adapter>(&mut self, adapter: A) -> RegistrationResult<()> {
        self.register_boxed(Arc::new(adapter))
    }

    pub fn register_boxed(&mut self, adapter: BoxedAdapter) -> RegistrationResult<()> {
        let name = adapter.name();
        if self.adapters.iter().any(|a| a.name() == name) {
            return Err(RegistrationError::DuplicateAdapter(name));
        }
        debug!(adapter = name, position = self.adapters.len(), "Registered adapter");
        self.adapters.push(adapter);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<A: Adapter>(mut self, adapter: A) -> RegistrationResult<Self> {
        self.register(adapter)?;
        Ok(self)
    }

    /// Adapter names in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Finds the first adapter that claims `raw` and normalizes it.
    ///
    /// Only the claiming adapter's [`adapt`](Adapter::adapt) runs. No claimant
    /// yields [`NormalizeError::UnrecognizedEvent`].
    pub fn detect_and_adapt(&self, raw: &Value) -> Result<Request, NormalizeError> {
        let Some(adapter) = self.adapters.iter().find(|a| a.can_handle(raw)) else {
            warn!("No adapter recognized the payload");
            return Err(NormalizeError::UnrecognizedEvent);
        };

        let name = adapter.name();
        trace!(adapter = name, "Adapter claimed payload");
        let mut request = adapter
            .adapt(raw)
            .map_err(|source| NormalizeError::Malformed {
                adapter: name,
                source,
            })?;
        request.set_adapter(name);
        Ok(request)
    }

    /// Serializes `response` with the adapter that produced `request`.
    ///
    /// Requests built by hand (or by an adapter that is no longer registered)
    /// get the call-style reply.
    pub fn reply(&self, request: &Request, response: Response) -> Value {
        match self.adapters.iter().find(|a| a.name() == request.adapter()) {
            Some(adapter) => adapter.reply(request, response),
            None => call_reply(response),
        }
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.names())
            .finish()
    }
}

// =============================================================================
// Reply helpers
// =============================================================================

/// Renders headers as a flat object, joining repeated values with `,`.
pub fn headers_to_json(response: &Response) -> Map<String, Value> {
    let mut out = Map::new();
    for name in response.headers().keys() {
        let joined = response
            .headers()
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");
        out.insert(name.as_str().to_string(), Value::String(joined));
    }
    if matches!(response.body(), Body::Json(_)) && !out.contains_key(CONTENT_TYPE.as_str()) {
        out.insert(
            CONTENT_TYPE.as_str().to_string(),
            Value::String("application/json".into()),
        );
    }
    out
}

/// Renders the body as text, or `None` when it is not valid UTF-8.
pub fn body_text(body: &Body) -> Option<String> {
    match body {
        Body::Empty => Some(String::new()),
        Body::Json(v) => Some(v.to_string()),
        Body::Bytes(b) => String::from_utf8(b.to_vec()).ok(),
    }
}

/// The generic call-style reply: `{statusCode, headers, body}`.
pub fn call_reply(response: Response) -> Value {
    let headers = headers_to_json(&response);
    let body = body_text(response.body()).unwrap_or_default();
    json!({
        "statusCode": response.status().as_u16(),
        "headers": headers,
        "body": body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::TriggerKind;
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct KeyAdapter {
        name: &'static str,
        key: &'static str,
        kind: TriggerKind,
        adapt_calls: Arc<AtomicUsize>,
    }

    impl Adapter for KeyAdapter {
        fn name(&self) -> &'static str {
            self.name
        }

        fn can_handle(&self, raw: &Value) -> bool {
            raw.get(self.key).is_some()
        }

        fn adapt(&self, _raw: &Value) -> AdapterResult<Request> {
            self.adapt_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Request::builder(self.kind).build())
        }
    }

    fn adapter(
        name: &'static str,
        key: &'static str,
        kind: TriggerKind,
    ) -> (KeyAdapter, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let adapter = KeyAdapter {
            name,
            key,
            kind,
            adapt_calls: Arc::clone(&calls),
        };
        (adapter, calls)
    }

    #[test]
    fn first_claimant_wins() {
        let (specific, specific_calls) = adapter("specific", "routeKey", TriggerKind::Call);
        let (general, general_calls) = adapter("general", "routeKey", TriggerKind::Unknown);
        let registry = AdapterRegistry::new()
            .with(specific)
            .unwrap()
            .with(general)
            .unwrap();

        let req = registry
            .detect_and_adapt(&json!({"routeKey": "GET /"}))
            .unwrap();
        assert_eq!(req.trigger(), TriggerKind::Call);
        assert_eq!(req.adapter(), "specific");
        assert_eq!(specific_calls.load(Ordering::SeqCst), 1);
        assert_eq!(general_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unclaimed_payload_is_unrecognized() {
        let (a, calls) = adapter("a", "Records", TriggerKind::QueueBatch);
        let registry = AdapterRegistry::new().with(a).unwrap();
        let err = registry.detect_and_adapt(&json!({"hello": 1})).unwrap_err();
        assert!(matches!(err, NormalizeError::UnrecognizedEvent));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let (a, _) = adapter("dup", "x", TriggerKind::Call);
        let (b, _) = adapter("dup", "y", TriggerKind::Call);
        let registry = AdapterRegistry::new().with(a).unwrap();
        assert!(matches!(
            registry.with(b),
            Err(RegistrationError::DuplicateAdapter("dup"))
        ));
    }

    #[test]
    fn call_reply_sets_json_content_type() {
        let reply = call_reply(Response::json(StatusCode::CREATED, json!({"ok": true})));
        assert_eq!(reply["statusCode"], 201);
        assert_eq!(reply["headers"]["content-type"], "application/json");
        assert_eq!(reply["body"], "{\"ok\":true}");
    }
}
