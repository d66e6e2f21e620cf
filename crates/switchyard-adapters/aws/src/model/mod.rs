//! Serde models of the provider payloads.
//!
//! Only the fields the adapters read are modeled; everything else stays
//! reachable through [`Request::raw`](switchyard_core::Request::raw).

pub mod http;
pub mod records;

use serde::Deserialize;
use serde_json::Value;

pub use self::http::*;
pub use self::records::*;

/// A bus event, scheduled or custom.
#[derive(Debug, Clone, Deserialize)]
pub struct BusEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "detail-type")]
    pub detail_type: String,
    pub source: String,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub detail: Value,
}
