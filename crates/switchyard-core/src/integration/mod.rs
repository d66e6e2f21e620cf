//! Integration layer: adapters that translate provider payloads into the
//! canonical model and back.

pub mod adapter;

pub use adapter::{Adapter, AdapterRegistry, BoxedAdapter, body_text, call_reply, headers_to_json};
