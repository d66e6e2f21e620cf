//! The canonical response handlers and middleware produce.
//!
//! A [`Response`] is a plain value: handlers return it, middleware may
//! rewrite it on the way out, and the adapter that produced the request
//! consumes it by move when serializing the provider reply.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde_json::Value;

/// Response payload, kept structured until serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    Json(Value),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(b) => b.is_empty(),
            Self::Json(_) => false,
        }
    }

    /// Returns the structured value, if the body is still JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Renders the body to bytes. JSON is rendered compactly.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Empty => Bytes::new(),
            Self::Bytes(b) => b.clone(),
            Self::Json(v) => Bytes::from(v.to_string()),
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

/// Canonical response.
///
/// Besides the usual status, headers and body, a response can name batch
/// records that failed. Batch adapters report only those identifiers back to
/// the provider so the rest of the batch is not retried.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
    failed_records: Vec<String>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Body::Empty,
            failed_records: Vec::new(),
        }
    }

    /// `200 OK` with an empty body.
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// `204 No Content`.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    /// A JSON response. The content type is set during serialization.
    pub fn json(status: StatusCode, value: Value) -> Self {
        let mut res = Self::new(status);
        res.body = Body::Json(value);
        res
    }

    /// A `text/plain` response.
    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        let mut res = Self::new(status);
        res.body = Body::from(text.into());
        res.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        res
    }

    /// A batch outcome naming the records that failed.
    pub fn batch_report<I, S>(failed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut res = Self::ok();
        res.failed_records = failed.into_iter().map(Into::into).collect();
        res
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header (builder style), replacing existing values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    /// Marks one batch record as failed. Duplicates are ignored.
    pub fn fail_record(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.failed_records.contains(&id) {
            self.failed_records.push(id);
        }
    }

    pub fn failed_records(&self) -> &[String] {
        &self.failed_records
    }

    pub fn has_failed_records(&self) -> bool {
        !self.failed_records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_body_renders_compactly() {
        let res = Response::json(StatusCode::CREATED, json!({"id": 1}));
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.body().to_bytes(), Bytes::from_static(b"{\"id\":1}"));
    }

    #[test]
    fn batch_report_deduplicates_failures() {
        let mut res = Response::batch_report(["m3"]);
        res.fail_record("m3");
        res.fail_record("m5");
        assert_eq!(res.failed_records(), ["m3", "m5"]);
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn text_sets_content_type() {
        let res = Response::text(StatusCode::OK, "hello");
        assert_eq!(res.content_type(), Some("text/plain; charset=utf-8"));
        assert!(!res.body().is_empty());
    }
}
