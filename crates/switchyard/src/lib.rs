//! # Switchyard
//!
//! Event normalization and dual-routing dispatch for serverless handlers.
//!
//! ## Overview
//!
//! One function deployment often receives many kinds of events: HTTP calls,
//! queue batches, object notifications, schedules, bus events and socket
//! lifecycle events. Switchyard normalizes each raw payload into one
//! canonical [`Request`](core::Request), routes it, runs the route's
//! middleware and handler, and serializes the [`Response`](core::Response)
//! back into the shape the provider expects.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐    ┌─────────────────┐    ┌─────────────┐    ┌────────────────────────┐
//! │ Runtime  │───▶│ AdapterRegistry │───▶│ Dispatcher  │───▶│ PathRouter    (Call)   │──▶ middleware ──▶ handler
//! │ (host)   │    │ (first match)   │    │             │───▶│ TriggerRouter (others) │──▶ middleware ──▶ handler
//! └──────────┘    └─────────────────┘    └─────────────┘    └────────────────────────┘
//! ```
//!
//! - **Runtime**: configuration, logging, deadlines, the JSON-lines host loop
//! - **Adapters**: provider payload shapes in and out
//! - **Routers**: a segment trie for calls, source patterns for everything else
//! - **Middleware**: Tower layers composed once per route at startup
//! - **Handlers**: async functions with extractors, or typed bindings
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchyard::prelude::*;
//!
//! async fn get_order(params: PathParams) -> Result<Response, HttpError> {
//!     let id: u64 = params
//!         .parse("id")
//!         .map_err(|e| HttpError::bad_request(e.to_string()))?;
//!     Ok(Response::json(StatusCode::OK, serde_json::json!({ "id": id })))
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = Runtime::builder()
//!         .adapters(switchyard::aws::registry()?)
//!         .build(|app| {
//!             app.get("/orders/:id", get_order)?;
//!             Ok(())
//!         })?;
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `aws`: the AWS payload adapters (default)
//! - `macros`: `#[derive(Validate)]` (default)
//! - `toml-config` / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output

pub use switchyard_core as core;
pub use switchyard_framework as framework;
pub use switchyard_runtime as runtime;

#[cfg(feature = "aws")]
pub use switchyard_adapter_aws as aws;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use switchyard::prelude::*;
/// ```
pub mod prelude {
    // Host
    pub use switchyard_runtime::{Runtime, RuntimeBuilder, SwitchyardConfig};

    // Registration
    pub use switchyard_framework::{App, DispatchOptions, Group};

    // Canonical model
    pub use switchyard_core::{
        Adapter, AdapterRegistry, InvocationContext, Metadata, PathParams, Record, Request,
        Response, TriggerKind, Validate, ValidationErrors,
    };
    pub use switchyard_framework::http::StatusCode;

    // Extractors and typed binding
    pub use switchyard_framework::{
        Cancellation, Ctx, Deadline, FromContext, Headers, Json, PathParamsExt, Query, Records,
        Service, for_each_record, typed,
    };

    // Errors
    pub use switchyard_framework::{BoxError, ErrorReply, HttpError};

    // Middleware
    pub use switchyard_framework::{Middleware, Next, from_fn};

    #[cfg(feature = "macros")]
    pub use switchyard_macros::Validate;
}
