//! Helpers shared by the adapters.

use std::borrow::Cow;
use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use switchyard_core::{AdapterError, AdapterResult, QueryParams, RequestBuilder};

/// Deserializes a claimed payload into its model.
pub(crate) fn from_value<T: DeserializeOwned>(
    raw: &Value,
    field: &'static str,
) -> AdapterResult<T> {
    T::deserialize(raw).map_err(|e| AdapterError::invalid(field, e.to_string()))
}

/// Decodes an optional body, honoring the base64 flag.
pub(crate) fn decode_body(body: Option<&str>, base64: bool) -> AdapterResult<Vec<u8>> {
    match body {
        None => Ok(Vec::new()),
        Some(text) if base64 => STANDARD
            .decode(text)
            .map_err(|e| AdapterError::BodyDecode(e.to_string())),
        Some(text) => Ok(text.as_bytes().to_vec()),
    }
}

pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub(crate) fn parse_method(method: &str) -> AdapterResult<Method> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| AdapterError::invalid("httpMethod", format!("'{method}' is not a method")))
}

/// Parses a raw `a=1&b=2` query string, decoding as a form would.
pub(crate) fn parse_raw_query(raw: &str) -> QueryParams {
    url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Merges single and multi-valued parameter maps, preferring the multi map.
///
/// With `encoded` set, keys and values are percent-decoded first.
pub(crate) fn merge_query(
    single: Option<&HashMap<String, String>>,
    multi: Option<&HashMap<String, Vec<String>>>,
    encoded: bool,
) -> QueryParams {
    let decode = |s: &str| -> String {
        if encoded {
            decode_component(s).into_owned()
        } else {
            s.to_string()
        }
    };

    let mut pairs: Vec<(String, String)> = Vec::new();
    match (multi, single) {
        (Some(multi), _) if !multi.is_empty() => {
            for (k, values) in multi {
                pairs.extend(values.iter().map(|v| (decode(k), decode(v))));
            }
        }
        (_, Some(single)) => pairs.extend(single.iter().map(|(k, v)| (decode(k), decode(v)))),
        _ => {}
    }
    // Maps carry no order; sort keys so repeated invocations agree.
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs.into_iter().collect()
}

/// Percent-decodes a component where `+` stands for a space.
pub(crate) fn decode_component(s: &str) -> Cow<'_, str> {
    let spaced = if s.contains('+') {
        Cow::Owned(s.replace('+', " "))
    } else {
        Cow::Borrowed(s)
    };
    match urlencoding::decode(&spaced) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Owned(spaced.into_owned()),
    }
}

/// Applies a header map, then the multi-valued map over it.
pub(crate) fn apply_headers(
    mut builder: RequestBuilder,
    single: Option<&HashMap<String, String>>,
    multi: Option<&HashMap<String, Vec<String>>>,
) -> RequestBuilder {
    match multi {
        Some(multi) if !multi.is_empty() => {
            for (name, values) in multi {
                for value in values {
                    builder = builder.header(name, value);
                }
            }
        }
        _ => {
            for (name, value) in single.into_iter().flatten() {
                builder = builder.header(name, value);
            }
        }
    }
    builder
}

/// The resource name at the end of an ARN.
///
/// `arn:aws:sqs:eu-west-1:1234:orders` gives `orders`;
/// `arn:aws:kinesis:…:stream/clicks` gives `clicks`;
/// `arn:aws:dynamodb:…:table/Users/stream/2024…` gives `Users`.
pub(crate) fn arn_resource_name(arn: &str) -> &str {
    let resource = arn.splitn(6, ':').nth(5).unwrap_or(arn);
    let mut parts = resource.split('/');
    match (parts.next(), parts.next()) {
        (Some(_), Some(name)) if !name.is_empty() => name,
        (Some(first), _) => first,
        _ => resource,
    }
}

/// `eventSource` (or `EventSource`) of the first record in a `Records` batch.
pub(crate) fn first_record_source(raw: &Value) -> Option<&str> {
    let first = raw.get("Records")?.as_array()?.first()?;
    first
        .get("eventSource")
        .or_else(|| first.get("EventSource"))
        .and_then(Value::as_str)
}
