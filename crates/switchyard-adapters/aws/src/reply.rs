//! Provider reply shapes.

use http::header::SET_COOKIE;
use serde_json::{Map, Value, json};
use switchyard_core::integration::{body_text, headers_to_json};
use switchyard_core::{Body, Request, Response, TriggerKind};

use crate::support::encode_base64;

/// Text body plus the base64 flag; bytes that are not UTF-8 are encoded.
fn encoded_body(body: &Body) -> (String, bool) {
    match body_text(body) {
        Some(text) => (text, false),
        None => (encode_base64(&body.to_bytes()), true),
    }
}

/// Header values as arrays, one entry per value.
fn multi_value_headers(response: &Response) -> Map<String, Value> {
    let mut out = Map::new();
    for name in response.headers().keys() {
        let values = response
            .headers()
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(|v| Value::String(v.to_string()))
            .collect();
        out.insert(name.as_str().to_string(), Value::Array(values));
    }
    if let Some(Value::String(ct)) = headers_to_json(response).get("content-type") {
        out.entry("content-type")
            .or_insert_with(|| Value::Array(vec![Value::String(ct.clone())]));
    }
    out
}

/// HTTP API (payload 2.0) reply. `set-cookie` values move to `cookies`.
pub(crate) fn http_api(response: Response) -> Value {
    let mut headers = headers_to_json(&response);
    headers.remove(SET_COOKIE.as_str());
    let cookies: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    let (body, is_base64) = encoded_body(response.body());

    let mut reply = json!({
        "statusCode": response.status().as_u16(),
        "headers": headers,
        "body": body,
        "isBase64Encoded": is_base64,
    });
    if !cookies.is_empty() {
        reply["cookies"] = json!(cookies);
    }
    reply
}

/// REST API (payload 1.0) reply, with both header maps.
pub(crate) fn rest_api(response: Response) -> Value {
    let (body, is_base64) = encoded_body(response.body());
    json!({
        "statusCode": response.status().as_u16(),
        "headers": headers_to_json(&response),
        "multiValueHeaders": multi_value_headers(&response),
        "body": body,
        "isBase64Encoded": is_base64,
    })
}

/// Load balancer reply. Uses whichever header form the request used.
pub(crate) fn load_balancer(request: &Request, response: Response) -> Value {
    let status = response.status();
    let (body, is_base64) = encoded_body(response.body());
    let header_key = if request.raw().get("multiValueHeaders").is_some() {
        ("multiValueHeaders", Value::Object(multi_value_headers(&response)))
    } else {
        ("headers", Value::Object(headers_to_json(&response)))
    };

    let mut reply = json!({
        "statusCode": status.as_u16(),
        "statusDescription": format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ),
        "body": body,
        "isBase64Encoded": is_base64,
    });
    reply[header_key.0] = header_key.1;
    reply
}

/// Socket route reply: status and body only.
pub(crate) fn web_socket(response: Response) -> Value {
    json!({
        "statusCode": response.status().as_u16(),
        "body": body_text(response.body()).unwrap_or_default(),
    })
}

/// Reply for the record and bus kinds.
///
/// Queue batches report only the failed record ids; everything else
/// returns the body as JSON, or `null` when empty.
pub(crate) fn event(request: &Request, response: Response) -> Value {
    if request.trigger() == TriggerKind::QueueBatch {
        let failures: Vec<Value> = response
            .failed_records()
            .iter()
            .map(|id| json!({ "itemIdentifier": id }))
            .collect();
        return json!({ "batchItemFailures": failures });
    }

    match response.into_body() {
        Body::Empty => Value::Null,
        Body::Json(value) => value,
        Body::Bytes(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http::header::HeaderValue;

    #[test]
    fn cookies_leave_the_header_map() {
        let mut response = Response::text(StatusCode::OK, "hi");
        let headers = response.headers_mut();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        let reply = http_api(response);
        assert_eq!(reply["cookies"], json!(["a=1", "b=2"]));
        assert!(reply["headers"].get("set-cookie").is_none());
        assert_eq!(reply["isBase64Encoded"], false);
    }

    #[test]
    fn binary_bodies_are_base64() {
        let mut response = Response::ok();
        response.set_body(vec![0xff_u8, 0xfe]);
        let reply = rest_api(response);
        assert_eq!(reply["isBase64Encoded"], true);
        assert_eq!(reply["body"], "//4=");
    }

    #[test]
    fn queue_batch_names_only_failures() {
        let request = Request::builder(TriggerKind::QueueBatch).build();
        let reply = event(&request, Response::batch_report(["m2"]));
        assert_eq!(
            reply,
            json!({"batchItemFailures": [{"itemIdentifier": "m2"}]})
        );

        let clean = event(&request, Response::batch_report(Vec::<String>::new()));
        assert_eq!(clean, json!({"batchItemFailures": []}));
    }

    #[test]
    fn other_events_reply_with_body() {
        let request = Request::builder(TriggerKind::Scheduled).build();
        assert_eq!(event(&request, Response::no_content()), Value::Null);
        assert_eq!(
            event(&request, Response::json(StatusCode::OK, json!({"n": 1}))),
            json!({"n": 1})
        );
        assert_eq!(
            event(&request, Response::text(StatusCode::OK, "done")),
            json!("done")
        );
    }
}
