//! # Switchyard Runtime
//!
//! Hosting layer for a Switchyard [`Dispatcher`](switchyard_framework::Dispatcher).
//!
//! This crate provides:
//! - Layered configuration with figment ([`config`])
//! - `tracing-subscriber` setup driven by that configuration ([`logging`])
//! - The [`Runtime`] host: per-invocation deadline and cancellation, the
//!   unrouted-batch policy, and a JSON-lines loop over stdin/stdout
//!
//! ```rust,ignore
//! use switchyard_runtime::Runtime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = Runtime::builder()
//!         .adapters(switchyard_adapter_aws::registry()?)
//!         .build(|app| {
//!             app.get("/health", || async { "ok" })?;
//!             Ok(())
//!         })?;
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, DispatchConfig, HostConfig, LoggingConfig,
    SwitchyardConfig, UnroutedBatch,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RunStats, Runtime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for handlers and middleware.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
