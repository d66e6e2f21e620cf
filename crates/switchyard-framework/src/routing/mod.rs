//! Dual routing.
//!
//! Call-style requests are resolved by method and path through the
//! [`PathRouter`]; every other trigger kind is resolved by kind and routing
//! source through the [`TriggerRouter`]. Both tables are built during
//! startup and read-only afterwards.

pub mod path;
pub mod route;
pub mod trigger;

pub use path::{PathRouter, RouteMatch};
pub use route::Route;
pub use trigger::{SourcePattern, TriggerRouter};
