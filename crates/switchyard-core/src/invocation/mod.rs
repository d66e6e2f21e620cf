//! Invocation layer: the per-request context, its lifecycle and the
//! collaborators it exposes.

pub mod context;
pub mod lifecycle;
pub mod services;

pub use context::InvocationContext;
pub use lifecycle::{InvocationState, Lifecycle, TransitionError};
pub use services::{Metrics, NoopMetrics, ServiceArc, Services};
