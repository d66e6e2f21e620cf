//! The canonical request shape every adapter normalizes into.
//!
//! A [`Request`] is built once per invocation and never mutated afterwards,
//! with one exception: the path parameters, which the path router writes
//! exactly once after a successful match.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use serde_json::Value;
use tracing::debug;

use super::trigger::TriggerKind;

// =============================================================================
// Query parameters
// =============================================================================

/// Multi-valued query string parameters, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value; existing values for the same key are kept.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Returns the first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value for `key`, in arrival order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// =============================================================================
// Path parameters
// =============================================================================

/// Values captured from `:name` segments of a matched path pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(Arc<str>, String)>);

static EMPTY_PATH_PARAMS: PathParams = PathParams::empty();

impl PathParams {
    /// An empty parameter set.
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Builds a parameter set from `(name, value)` pairs in pattern order.
    pub fn from_pairs(pairs: Vec<(Arc<str>, String)>) -> Self {
        Self(pairs)
    }

    /// Returns the captured value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Opaque string bag for trigger-specific fields.
///
/// Adapters populate well-known keys (see the associated constants); the
/// trigger router matches against [`Metadata::SOURCE`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    /// Routing subject: queue, stream, bucket, rule, event source or socket route.
    pub const SOURCE: &'static str = "source";
    /// Bus event detail type.
    pub const DETAIL_TYPE: &'static str = "detail_type";
    /// Object notification event name.
    pub const EVENT_NAME: &'static str = "event_name";
    /// Stream connection identifier.
    pub const CONNECTION_ID: &'static str = "connection_id";
    /// Gateway or stream stage.
    pub const STAGE: &'static str = "stage";
    /// Gateway domain name.
    pub const DOMAIN_NAME: &'static str = "domain_name";
    /// Schedule rule identifier.
    pub const RULE: &'static str = "rule";
    /// Provider-supplied event time.
    pub const TIME: &'static str = "time";
    /// Provider region.
    pub const REGION: &'static str = "region";
    /// Provider account.
    pub const ACCOUNT: &'static str = "account";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Inserts a value, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Record
// =============================================================================

/// One logical record inside a batch-style request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: String,
    body: Bytes,
    attributes: BTreeMap<String, String>,
}

impl Record {
    /// Creates a record with the identifier the provider uses for failure reports.
    pub fn new(id: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute (builder style).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as UTF-8 text, if it is valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

// =============================================================================
// Request
// =============================================================================

/// Canonical request produced by the event normalizer.
#[derive(Debug)]
pub struct Request {
    trigger: TriggerKind,
    method: Method,
    path: String,
    headers: HeaderMap,
    query: QueryParams,
    body: Bytes,
    path_params: OnceLock<PathParams>,
    records: Vec<Record>,
    metadata: Metadata,
    request_id: String,
    adapter: &'static str,
    raw: Arc<Value>,
}

impl Request {
    /// Starts building a request of the given trigger kind.
    pub fn builder(trigger: TriggerKind) -> RequestBuilder {
        RequestBuilder::new(trigger)
    }

    pub fn trigger(&self) -> TriggerKind {
        self.trigger
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the first value of a header as text. Lookup is case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Path parameters captured by the router; empty before routing.
    pub fn path_params(&self) -> &PathParams {
        self.path_params.get().unwrap_or(&EMPTY_PATH_PARAMS)
    }

    /// Writes the captured path parameters.
    ///
    /// Succeeds only once per request; a second write hands the rejected
    /// parameters back.
    pub fn set_path_params(&self, params: PathParams) -> Result<(), PathParams> {
        self.path_params.set(params)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Shorthand for the [`Metadata::SOURCE`] entry.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(Metadata::SOURCE)
    }

    /// Provider request id, or a generated UUID when the payload had none.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Name of the adapter that produced this request.
    pub fn adapter(&self) -> &'static str {
        self.adapter
    }

    /// The original payload, untouched.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub(crate) fn set_adapter(&mut self, adapter: &'static str) {
        self.adapter = adapter;
    }
}

/// Builder for [`Request`]. Used by adapters and tests.
#[derive(Debug)]
pub struct RequestBuilder {
    trigger: TriggerKind,
    method: Method,
    path: String,
    headers: HeaderMap,
    query: QueryParams,
    body: Bytes,
    records: Vec<Record>,
    metadata: Metadata,
    request_id: Option<String>,
    raw: Option<Arc<Value>>,
}

impl RequestBuilder {
    fn new(trigger: TriggerKind) -> Self {
        Self {
            trigger,
            method: Method::GET,
            path: String::new(),
            headers: HeaderMap::new(),
            query: QueryParams::new(),
            body: Bytes::new(),
            records: Vec::new(),
            metadata: Metadata::new(),
            request_id: None,
            raw: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Appends a header value. Names or values that are not valid HTTP are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => debug!(header = name, "Skipping header that is not valid HTTP"),
        }
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push(key, value);
        self
    }

    pub fn query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn record(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    pub fn records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// Sets the routing source (the [`Metadata::SOURCE`] entry).
    pub fn source(self, source: impl Into<String>) -> Self {
        self.metadata(Metadata::SOURCE, source)
    }

    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn raw(mut self, raw: Arc<Value>) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn build(self) -> Request {
        Request {
            trigger: self.trigger,
            method: self.method,
            path: self.path,
            headers: self.headers,
            query: self.query,
            body: self.body,
            path_params: OnceLock::new(),
            records: self.records,
            metadata: self.metadata,
            request_id: self
                .request_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            adapter: "manual",
            raw: self.raw.unwrap_or_else(|| Arc::new(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_case_insensitive() {
        let req = Request::builder(TriggerKind::Call)
            .header("Content-Type", "application/json")
            .header("bad header", "ignored")
            .build();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.headers().len(), 1);
    }

    #[test]
    fn query_keeps_every_value() {
        let req = Request::builder(TriggerKind::Call)
            .query_param("tag", "a")
            .query_param("tag", "b")
            .query_param("page", "2")
            .build();
        assert_eq!(req.query().get("tag"), Some("a"));
        assert_eq!(req.query().get_all("tag").collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(req.query().get("missing"), None);
    }

    #[test]
    fn path_params_are_written_once() {
        let req = Request::builder(TriggerKind::Call).path("/users/7").build();
        assert!(req.path_params().is_empty());

        let first = PathParams::from_pairs(vec![(Arc::from("id"), "7".to_string())]);
        assert!(req.set_path_params(first).is_ok());
        assert_eq!(req.path_params().get("id"), Some("7"));

        let second = PathParams::from_pairs(vec![(Arc::from("id"), "8".to_string())]);
        assert!(req.set_path_params(second).is_err());
        assert_eq!(req.path_params().get("id"), Some("7"));
    }

    #[test]
    fn request_id_is_generated_when_absent() {
        let a = Request::builder(TriggerKind::Scheduled).build();
        let b = Request::builder(TriggerKind::Scheduled)
            .request_id("evt-1")
            .build();
        assert_eq!(a.request_id().len(), 36);
        assert_eq!(b.request_id(), "evt-1");
    }

    #[test]
    fn records_keep_order_and_attributes() {
        let req = Request::builder(TriggerKind::QueueBatch)
            .record(Record::new("m1", "one").with_attribute("group", "g"))
            .record(Record::new("m2", "two"))
            .source("orders-queue")
            .build();
        let ids: Vec<_> = req.records().iter().map(Record::id).collect();
        assert_eq!(ids, ["m1", "m2"]);
        assert_eq!(req.records()[0].attribute("group"), Some("g"));
        assert_eq!(req.records()[1].body_str(), Some("two"));
        assert_eq!(req.source(), Some("orders-queue"));
    }
}
