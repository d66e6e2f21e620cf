//! Typed handler binding.
//!
//! A business function with a declared input and output shape is bound to a
//! route through a [`Codec`] and the input's [`Validate`](switchyard_core::Validate)
//! implementation:
//!
//! ```rust,ignore
//! app.post("/orders", typed(create_order).status(StatusCode::CREATED))?;
//! app.trigger(TriggerKind::QueueBatch, "orders", for_each_record(process_order))?;
//! ```
//!
//! Binding failures short-circuit with a structured `400`/`422` reply and the
//! business function never runs. Business errors go to the error boundary.

pub mod batch;
pub mod binder;
pub mod codec;
pub mod json;

pub use batch::{ForEachRecord, RecordsMarker, for_each_record};
pub use binder::{Typed, TypedMarker, bind, typed};
pub use codec::{Codec, JsonCodec};
pub use json::Json;
