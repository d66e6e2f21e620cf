//! Body codecs.
//!
//! A [`Codec`] turns request bytes into a typed value and a typed value into
//! a response [`Body`]. The codec is a type parameter fixed when a route is
//! registered, so the dispatcher never sees it.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use switchyard_core::Body;
use tower::BoxError;

use crate::error::BindError;

/// Encoding used by a typed route.
pub trait Codec: Send + Sync + 'static {
    /// Media type of encoded bodies.
    const CONTENT_TYPE: &'static str;

    /// Decodes a request body.
    fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, BindError>;

    /// Encodes a handler result.
    fn encode<T: Serialize>(value: &T) -> Result<Body, BoxError>;
}

/// JSON via `serde_json`. The default codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    const CONTENT_TYPE: &'static str = "application/json";

    /// An empty (or all-whitespace) body decodes as JSON `null`, so inputs of
    /// type `()` or `Option<T>` accept bodyless requests.
    fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, BindError> {
        let result = if body.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_slice(body)
        };
        result.map_err(decode_error)
    }

    fn encode<T: Serialize>(value: &T) -> Result<Body, BoxError> {
        Ok(Body::Json(serde_json::to_value(value)?))
    }
}

/// Maps a `serde_json` error, recovering the field name when serde names one.
fn decode_error(err: serde_json::Error) -> BindError {
    let message = err.to_string();
    let field = ["missing field `", "unknown field `", "duplicate field `"]
        .iter()
        .find_map(|marker| {
            let start = message.find(marker)? + marker.len();
            let len = message[start..].find('`')?;
            Some(message[start..start + len].to_string())
        });
    BindError::decode(message, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Order {
        sku: String,
        quantity: u32,
    }

    #[test]
    fn missing_field_is_named() {
        let err = JsonCodec::decode::<Order>(br#"{"sku":"A-1"}"#).unwrap_err();
        match err {
            BindError::Decode { field, .. } => assert_eq!(field.as_deref(), Some("quantity")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let value: Option<Order> = JsonCodec::decode(b"  ").unwrap();
        assert_eq!(value, None);
        assert!(JsonCodec::decode::<Order>(b"").is_err());
    }

    #[test]
    fn encoded_output_decodes_to_the_same_value() {
        let order = Order {
            sku: "B-2".into(),
            quantity: 3,
        };
        let body = JsonCodec::encode(&order).unwrap();
        let back: Order = JsonCodec::decode(&body.to_bytes()).unwrap();
        assert_eq!(back, order);
    }
}
